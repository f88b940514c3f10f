//! # INI Writer
//!
//! Serializes a flattened [`SettingsTree`] into the OSKAR INI file format:
//! one `[section]` header per top-level section, `key=value` lines within,
//! everything in insertion order so consecutive sweep runs diff cleanly.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::flatten::{self, FlatSection};
use crate::core::settings::SettingsTree;

#[derive(Error, Debug)]
pub enum IniWriteError {
    #[error("Could not write INI file to '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Flattens `tree` and writes it to `path`, replacing any existing file.
/// Sections with no surviving entries are omitted entirely.
pub fn write_ini(tree: &SettingsTree, path: &Path) -> Result<(), IniWriteError> {
    let contents = render(&flatten::flatten(tree));
    fs::write(path, contents).map_err(|source| IniWriteError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Renders flattened sections into the textual INI form.
pub fn render(sections: &[FlatSection]) -> String {
    let mut out = String::new();
    for section in sections {
        if section.entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{}]", section.name);
        for (key, value) in &section.entries {
            let _ = writeln!(out, "{key}={value}");
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree_from_yaml(yaml: &str) -> SettingsTree {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn writes_sections_and_flat_keys() {
        let tree = tree_from_yaml(
            r#"
            General:
              app: oskar_sim_interferometer
            sky:
              oskar_sky_model:
                file: ../../sky_models/model_a.osm
            "#,
        );
        let dir = tempdir().unwrap();
        let path = dir.path().join("interf.ini");
        write_ini(&tree, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "[General]\napp=oskar_sim_interferometer\n\n\
             [sky]\noskar_sky_model/file=../../sky_models/model_a.osm\n\n"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let tree = tree_from_yaml(
            r#"
            telescope: {}
            simulator:
              use_gpus: false
            "#,
        );
        let rendered = render(&flatten::flatten(&tree));
        assert!(!rendered.contains("[telescope]"));
        assert!(rendered.contains("[simulator]\nuse_gpus=false\n"));
    }

    #[test]
    fn unwritable_path_reports_the_path() {
        let tree = tree_from_yaml("General: {app: x}\n");
        let err = write_ini(&tree, Path::new("/nonexistent-dir/out.ini")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent-dir/out.ini"));
    }
}
