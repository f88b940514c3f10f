//! # Flattener
//!
//! Converts a [`SettingsTree`] into the flat, path-keyed entries the OSKAR
//! INI format wants: nested fields compose their key with `/`, booleans
//! become lowercase tokens, and `Absent` fields are dropped at any depth.
//! Pure transformation, no I/O.

use crate::core::settings::{SettingsTree, SettingsValue};

/// One top-level section of a flattened tree, entries in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// Flattens every top-level section of `tree`.
///
/// A top-level value that is not itself a nested tree cannot become an INI
/// section; it is reported with a warning and skipped, and the remaining
/// sections are still produced.
pub fn flatten(tree: &SettingsTree) -> Vec<FlatSection> {
    let mut sections = Vec::with_capacity(tree.len());
    for (name, value) in tree {
        match value {
            SettingsValue::Tree(subtree) => {
                let mut entries = Vec::new();
                flatten_into(subtree, "", &mut entries);
                sections.push(FlatSection {
                    name: name.clone(),
                    entries,
                });
            }
            SettingsValue::Absent => {}
            other => {
                log::warn!(
                    "Skipping section '{}': expected a nested mapping, found {:?}",
                    name,
                    other
                );
            }
        }
    }
    sections
}

/// Recursive worker. Key casing is passed through untouched; the consuming
/// parser is case-sensitive.
fn flatten_into(tree: &SettingsTree, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in tree {
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}/{key}")
        };
        match value {
            SettingsValue::Tree(subtree) => flatten_into(subtree, &flat_key, out),
            SettingsValue::Absent => {}
            scalar => {
                if let Some(repr) = scalar.scalar_repr() {
                    out.push((flat_key, repr));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_from_yaml(yaml: &str) -> SettingsTree {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn nested_keys_compose_with_slashes() {
        let tree = tree_from_yaml(
            r#"
            telescope:
              input_directory: tel
              aperture_array:
                array_pattern:
                  element:
                    x_gain: "1.0"
            "#,
        );
        let sections = flatten(&tree);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "telescope");
        assert_eq!(
            sections[0].entries,
            vec![
                ("input_directory".to_string(), "tel".to_string()),
                (
                    "aperture_array/array_pattern/element/x_gain".to_string(),
                    "1.0".to_string()
                ),
            ]
        );
    }

    #[test]
    fn booleans_render_as_lowercase_tokens() {
        let tree = tree_from_yaml(
            r#"
            simulator:
              use_gpus: true
              double_precision: false
            "#,
        );
        let entries = &flatten(&tree)[0].entries;
        assert_eq!(entries[0], ("use_gpus".to_string(), "true".to_string()));
        assert_eq!(
            entries[1],
            ("double_precision".to_string(), "false".to_string())
        );
    }

    #[test]
    fn absent_values_produce_no_keys_at_any_depth() {
        let tree = tree_from_yaml(
            r#"
            observation:
              length: null
              nested:
                deeper: null
              num_channels: 4
            "#,
        );
        let entries = &flatten(&tree)[0].entries;
        assert_eq!(
            entries,
            &[("num_channels".to_string(), "4".to_string())]
        );
    }

    #[test]
    fn key_casing_is_preserved() {
        let tree = tree_from_yaml(
            r#"
            General:
              App_Version: "2.8"
            "#,
        );
        let sections = flatten(&tree);
        assert_eq!(sections[0].name, "General");
        assert_eq!(sections[0].entries[0].0, "App_Version");
    }

    #[test]
    fn scalar_at_top_level_is_skipped_not_fatal() {
        let tree = tree_from_yaml(
            r#"
            broken: 42
            simulator:
              use_gpus: false
            "#,
        );
        let sections = flatten(&tree);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "simulator");
    }

    #[test]
    fn numbers_render_canonically() {
        let tree = tree_from_yaml(
            r#"
            observation:
              num_channels: 16
              fov_deg: 5.5
            "#,
        );
        let entries = &flatten(&tree)[0].entries;
        assert_eq!(entries[0].1, "16");
        assert_eq!(entries[1].1, "5.5");
    }
}
