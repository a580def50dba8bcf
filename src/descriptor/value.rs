//! Setting values and key paths.
//!
//! # Design Decisions
//! - Values are a closed tagged variant; anything else is rejected by the parser
//! - Mappings use `BTreeMap` so equality and output ordering are deterministic
//! - Key paths keep their segments; the dotted form is only a presentation

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A descriptor value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    String(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The variant of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Integer(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Map(_) => Kind::Map,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Follow `segments` through nested mappings.
    pub fn lookup(&self, segments: &[String]) -> Option<&Value> {
        let mut current = self;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?} => {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// The variant of a [`Value`], used by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    Integer,
    String,
    Map,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "boolean",
            Kind::Integer => "integer",
            Kind::String => "string",
            Kind::Map => "mapping",
        };
        f.write_str(name)
    }
}

/// A namespaced setting key, e.g. `redis.master.enable`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Build a key path from its segments.
    ///
    /// Segments must be non-empty and free of `.`; see [`KeyPath::check_segment`].
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &KeyPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Reason a segment cannot be part of a key, if any.
    pub fn check_segment(segment: &str) -> Option<&'static str> {
        if segment.is_empty() {
            Some("empty key segment")
        } else if segment.contains('.') {
            Some("key segment contains '.'")
        } else {
            None
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        for segment in &segments {
            if let Some(reason) = KeyPath::check_segment(segment) {
                return Err(format!("invalid key `{}`: {}", s, reason));
            }
        }
        Ok(Self(segments))
    }
}

impl Serialize for KeyPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_parse_and_display() {
        let key: KeyPath = "redis.master.enable".parse().unwrap();
        assert_eq!(key.len(), 3);
        assert_eq!(key.root(), "redis");
        assert_eq!(key.to_string(), "redis.master.enable");

        assert!("redis..enable".parse::<KeyPath>().is_err());
        assert!("".parse::<KeyPath>().is_err());
    }

    #[test]
    fn test_ancestor_is_strict() {
        let parent: KeyPath = "gitlab_rails.security_context".parse().unwrap();
        let child = parent.child("runAsUser");
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
        assert!(!parent.is_ancestor_of(&parent));
    }

    #[test]
    fn test_lookup_descends_maps() {
        let mut inner = BTreeMap::new();
        inner.insert("runAsUser".to_string(), Value::Integer(1000));
        let mut outer = BTreeMap::new();
        outer.insert("securityContext".to_string(), Value::Map(inner));
        let value = Value::Map(outer);

        let path = vec!["securityContext".to_string(), "runAsUser".to_string()];
        assert_eq!(value.lookup(&path), Some(&Value::Integer(1000)));
        assert_eq!(value.lookup(&["missing".to_string()]), None);
    }

    #[test]
    fn test_json_shape_is_untagged() {
        let json = serde_json::to_value(Value::Integer(5432)).unwrap();
        assert_eq!(json, serde_json::json!(5432));
        let back: Value = serde_json::from_value(serde_json::json!({"a": true})).unwrap();
        assert_eq!(back.kind(), Kind::Map);
    }
}
