//! # Settings Tree
//!
//! The nested, ordered mapping behind every generated simulator config.
//! Values are a closed recursive type: scalars, a nested tree, or `Absent`.
//! `Absent` models an unset field; it survives tree construction but is
//! dropped entirely at flatten time, since the INI format has no null.
//!
//! Trees are plain values: `Clone` is a deep copy, which is what keeps the
//! shared defaults document immune to per-run mutation.

use indexmap::IndexMap;
use serde::Deserialize;

/// A single value in a [`SettingsTree`].
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SettingsValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tree(SettingsTree),
    /// An unset field. YAML `null` deserializes to this; lookups of missing
    /// leaves resolve to it.
    Absent,
}

impl SettingsValue {
    /// The canonical INI string for a scalar, or `None` for `Absent` and
    /// nested trees. Booleans render as the lowercase tokens the OSKAR
    /// parser expects.
    pub fn scalar_repr(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::Tree(_) | Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<bool> for SettingsValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SettingsValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SettingsValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SettingsValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for SettingsValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<SettingsTree> for SettingsValue {
    fn from(v: SettingsTree) -> Self {
        Self::Tree(v)
    }
}

/// An unset optional maps to `Absent`, so it vanishes from the output.
impl<T: Into<SettingsValue>> From<Option<T>> for SettingsValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Absent, Into::into)
    }
}

/// A nested, insertion-ordered mapping of section/field names to values.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct SettingsTree(IndexMap<String, SettingsValue>);

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&SettingsValue> {
        self.0.get(key)
    }

    /// The nested tree under `key`, if that key holds one.
    pub fn get_tree(&self, key: &str) -> Option<&Self> {
        match self.0.get(key) {
            Some(SettingsValue::Tree(t)) => Some(t),
            _ => None,
        }
    }

    /// Walks a `/`-separated path of nested trees.
    pub fn subtree(&self, path: &str) -> Option<&Self> {
        path.split('/').try_fold(self, |tree, key| tree.get_tree(key))
    }

    /// A deep copy of the leaf at a `/`-separated path, or `Absent` if any
    /// component is missing or not a tree. This is the permissive-default
    /// lookup: the consuming executable supplies its own values for fields
    /// the defaults document leaves unset.
    pub fn leaf(&self, path: &str) -> SettingsValue {
        let (parents, key) = match path.rsplit_once('/') {
            Some((p, k)) => (Some(p), k),
            None => (None, path),
        };
        let tree = match parents {
            Some(p) => match self.subtree(p) {
                Some(t) => t,
                None => return SettingsValue::Absent,
            },
            None => self,
        };
        tree.get(key).cloned().unwrap_or(SettingsValue::Absent)
    }

    /// Inserts or replaces a value, keeping insertion order for new keys.
    pub fn set(&mut self, key: &str, value: impl Into<SettingsValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// The nested tree under `key`, created empty if missing. A scalar
    /// already stored under `key` is replaced by an empty tree.
    pub fn subtree_mut(&mut self, key: &str) -> &mut Self {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| SettingsValue::Tree(Self::new()));
        if !matches!(entry, SettingsValue::Tree(_)) {
            *entry = SettingsValue::Tree(Self::new());
        }
        match entry {
            SettingsValue::Tree(t) => t,
            _ => unreachable!("entry was just forced to a tree"),
        }
    }

    /// The nested tree at a `/`-separated path, creating levels as needed.
    pub fn subtree_mut_path(&mut self, path: &str) -> &mut Self {
        path.split('/').fold(self, |tree, key| tree.subtree_mut(key))
    }

    /// Copies every top-level entry of `module` into `self`, replacing
    /// existing keys. Module subtrees become top-level sections of the
    /// generated config (e.g. `beam_pattern`, `interferometer`, `sky`).
    pub fn merge_module(&mut self, module: &Self) {
        for (key, value) in module.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, SettingsValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a SettingsTree {
    type Item = (&'a String, &'a SettingsValue);
    type IntoIter = indexmap::map::Iter<'a, String, SettingsValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
