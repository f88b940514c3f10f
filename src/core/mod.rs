pub mod compiler;
pub mod flatten;
pub mod ini_writer;
pub mod paths;
pub mod settings;
pub mod sweep;
