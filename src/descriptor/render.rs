//! Canonical descriptor rendering.
//!
//! Writes [`Settings`] back as descriptor text that [`parse`](super::parse)
//! accepts and that loads to an equal value.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::descriptor::settings::Settings;
use crate::descriptor::value::{KeyPath, Value};

const INDENT: &str = "  ";
const REDACTED: &str = "[REDACTED]";

/// Render `settings` in authoring order.
pub fn render(settings: &Settings) -> String {
    render_with(settings, |_| false)
}

/// Render `settings`, replacing scalar values whose full key path makes
/// `redact` return true. Members of mapping values are checked by their own
/// path, so `gitlab_rails({ 'db_password' => .. })` is covered too.
pub fn render_with(settings: &Settings, redact: impl Fn(&KeyPath) -> bool) -> String {
    let mut out = String::new();
    let mut previous_root: Option<&str> = None;

    for entry in settings.entries() {
        let root = entry.key.root();
        if previous_root.is_some_and(|prev| prev != root) {
            out.push('\n');
        }
        previous_root = Some(root);

        let segments = entry.key.segments();
        if segments.len() == 1 {
            let _ = write!(out, "{} ", segments[0]);
        } else {
            out.push_str(&segments[0]);
            for segment in &segments[1..] {
                let _ = write!(out, "[{}]", quote(segment));
            }
            out.push_str(" = ");
        }
        write_value(&mut out, &entry.value, &entry.key, 0, &redact);
        out.push('\n');
    }
    out
}

fn write_value(
    out: &mut String,
    value: &Value,
    key: &KeyPath,
    depth: usize,
    redact: &dyn Fn(&KeyPath) -> bool,
) {
    match value {
        Value::Map(map) => write_map(out, map, key, depth, redact),
        _ if redact(key) => out.push_str(&quote(REDACTED)),
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::String(s) => out.push_str(&quote(s)),
    }
}

fn write_map(
    out: &mut String,
    map: &BTreeMap<String, Value>,
    key: &KeyPath,
    depth: usize,
    redact: &dyn Fn(&KeyPath) -> bool,
) {
    if map.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    let last = map.len() - 1;
    for (i, (name, value)) in map.iter().enumerate() {
        out.push_str(&INDENT.repeat(depth + 1));
        let _ = write!(out, "{} => ", quote(name));
        write_value(out, value, &key.child(name.as_str()), depth + 1, redact);
        if i != last {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
}

/// Single-quoted literal; only `\` and `'` need escaping.
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}
