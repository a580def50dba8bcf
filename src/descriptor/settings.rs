//! The immutable settings value object.
//!
//! # Responsibilities
//! - Hold every assigned key in authoring order
//! - Reject duplicate and overlapping keys at construction time
//! - Provide flat lookup by dotted key, including members of assigned mappings
//!
//! # Design Decisions
//! - Built once through [`SettingsBuilder`]; no mutation after `build()`
//! - A mapping assigned as a whole cannot also be assigned member by member,
//!   so every key has exactly one source statement
//! - Equality is semantic: the nested key trees are compared, not the
//!   statements that produced them

use std::collections::BTreeMap;

use crate::descriptor::error::SettingsError;
use crate::descriptor::value::{KeyPath, Value};

/// One assigned key.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: KeyPath,
    pub value: Value,
    /// Source line, when parsed from text.
    pub line: Option<usize>,
}

/// A fully constructed descriptor.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    entries: Vec<Entry>,
    /// Dotted key → position in `entries`.
    index: BTreeMap<String, usize>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Entries in authoring order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a dotted key.
    ///
    /// Resolves directly assigned keys as well as members of assigned
    /// mappings (`gitlab_rails.security_context.runAsUser`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(&i) = self.index.get(key) {
            return Some(&self.entries[i].value);
        }
        let path: KeyPath = key.parse().ok()?;
        let segments = path.segments();
        (1..segments.len()).rev().find_map(|split| {
            let ancestor = segments[..split].join(".");
            let &i = self.index.get(&ancestor)?;
            self.entries[i].value.lookup(&segments[split..])
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_integer)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Source line of the statement that assigned `key` or one of its ancestors.
    pub fn line_of(&self, key: &str) -> Option<usize> {
        let path: KeyPath = key.parse().ok()?;
        let segments = path.segments();
        (1..=segments.len()).rev().find_map(|split| {
            let &i = self.index.get(&segments[..split].join("."))?;
            self.entries[i].line
        })
    }

    /// Merge every entry into one nested tree keyed by root namespace.
    pub fn tree(&self) -> BTreeMap<String, Value> {
        let mut root = BTreeMap::new();
        for entry in &self.entries {
            insert_at(&mut root, entry.key.segments(), entry.value.clone());
        }
        root
    }

    /// The nested tree as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.tree()).unwrap_or(serde_json::Value::Null)
    }
}

fn insert_at(node: &mut BTreeMap<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            node.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let child = node
                .entry(first.clone())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            // Overlapping keys are rejected by the builder, so every
            // intermediate node is a mapping created here.
            if let Value::Map(map) = child {
                insert_at(map, rest, value);
            }
        }
    }
}

impl PartialEq for Settings {
    fn eq(&self, other: &Self) -> bool {
        self.tree() == other.tree()
    }
}

/// Incremental constructor for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Assign `value` to `key`.
    pub fn insert(
        &mut self,
        key: KeyPath,
        value: impl Into<Value>,
        line: Option<usize>,
    ) -> Result<&mut Self, SettingsError> {
        let dotted = key.to_string();
        let entries = &self.settings.entries;
        let index = &self.settings.index;

        if let Some(&i) = index.get(&dotted) {
            return Err(SettingsError::Duplicate {
                key: dotted,
                first_line: entries[i].line,
            });
        }

        let segments = key.segments();
        for split in 1..segments.len() {
            let ancestor = segments[..split].join(".");
            if let Some(&i) = index.get(&ancestor) {
                return Err(SettingsError::Conflict {
                    key: dotted,
                    existing: ancestor,
                    existing_line: entries[i].line,
                });
            }
        }

        // Descendants sort directly after `key.` in the index.
        if let Some(&i) = index
            .range(format!("{}.", dotted)..)
            .map(|(_, i)| i)
            .take_while(|&&i| key.is_ancestor_of(&entries[i].key))
            .next()
        {
            return Err(SettingsError::Conflict {
                key: dotted,
                existing: entries[i].key.to_string(),
                existing_line: entries[i].line,
            });
        }

        self.settings
            .index
            .insert(dotted, self.settings.entries.len());
        self.settings.entries.push(Entry {
            key,
            value: value.into(),
            line,
        });
        Ok(self)
    }

    /// Convenience for tests and programmatic construction with dotted keys.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, SettingsError> {
        let path = key
            .parse::<KeyPath>()
            .map_err(|reason| SettingsError::InvalidKey {
                key: key.to_string(),
                reason,
            })?;
        self.insert(path, value, None)
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}
