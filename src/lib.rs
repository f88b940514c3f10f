pub mod constants;
pub mod core;
pub mod models;
pub mod system;
