//! Canonical serializer: converts a [`Value`] tree into flat Lua literal text.
//!
//! The output of [`encode`] is the body of a table constructor: one
//! `key=value,` entry per line, without the enclosing braces. Nested tables
//! are written inline on their entry's line, so the text is ready for the
//! [`layout`](crate::layout) pass, which relies on two guarantees given here:
//!
//! - every top-level entry occupies exactly one physical line;
//! - no raw line break appears inside a literal (`\n` and `\r` in strings are
//!   written as escapes).
//!
//! # Canonical form
//!
//! - **Key order**: integers ascending, then strings (byte order), then
//!   booleans (`false` first), then table keys ordered by their own
//!   canonical text.
//! - **Array form**: a nested table whose keys are exactly `1..=N` is written
//!   as its values only, `{v1,v2,v3,}`. Any gap, extra key, or non-integer
//!   key selects map form, `{[1]=v1,[2]=v2,[4]=v4,}`.
//! - **Keys**: identifier strings bare (`name=`), every other key bracketed
//!   (`[1]=`, `["two words"]=`, `[true]=`, `[{k=1,}]=`).
//! - **Scalars**: integers in base 10, floats with six fractional digits,
//!   strings double-quoted without quote escaping.

use std::collections::HashSet;

use crate::error::{LuaDataError, Result};
use crate::value::{Key, Mapping, Table, Value};
use crate::DEFAULT_MAX_DEPTH;

/// Line terminator used between top-level entries.
pub const EOL: &str = "\r\n";

/// Encode a root table with the default nesting limit.
///
/// Fails with [`LuaDataError::Serialization`] if `root` is not a table.
pub fn encode(root: &Value) -> Result<String> {
    Encoder::new().encode(root)
}

/// Serializer settings.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    max_depth: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn encode(&self, root: &Value) -> Result<String> {
        match root {
            Value::Table(table) => self.encode_table(table),
            other => Err(LuaDataError::Serialization(format!(
                "root value must be a table, found {}",
                other.type_name()
            ))),
        }
    }

    /// Encode the entries of `root` in map form, one per line.
    ///
    /// Fails with [`LuaDataError::Serialization`] if a table contains one of
    /// its enclosing tables; canonical text has no way to write the cycle.
    pub fn encode_table(&self, root: &Table) -> Result<String> {
        let mut writer = Writer {
            encoder: self,
            open: HashSet::new(),
        };
        writer.open.insert(root.id());
        let entries = root.entries();
        let mut out = String::new();
        for (key, value) in writer.sorted_entries(&entries, 1)? {
            writer.key(key, 1, &mut out)?;
            writer.value(value, 1, &mut out)?;
            out.push(',');
            out.push_str(EOL);
        }
        Ok(out)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(LuaDataError::Serialization(format!(
                "table nesting exceeds {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Sort position of a key: class first, then value within the class.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Integer(i64),
    String(&'a str),
    Bool(bool),
    Table(String),
}

/// State of one [`Encoder::encode_table`] call.
struct Writer<'e> {
    encoder: &'e Encoder,
    /// Ids of the tables currently being written.
    open: HashSet<usize>,
}

impl Writer<'_> {
    fn sorted_entries<'a>(
        &mut self,
        entries: &'a Mapping,
        depth: usize,
    ) -> Result<Vec<(&'a Key, &'a Value)>> {
        let mut keyed = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let sort_key = match key {
                Key::Integer(n) => SortKey::Integer(*n),
                Key::String(s) => SortKey::String(s),
                Key::Bool(b) => SortKey::Bool(*b),
                Key::Table(t) => {
                    let mut text = String::new();
                    self.nested(t, depth + 1, &mut text)?;
                    SortKey::Table(text)
                }
            };
            keyed.push((sort_key, key, value));
        }
        // Stable: table keys that render identically keep decode order.
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, k, v)| (k, v)).collect())
    }

    fn nested(&mut self, table: &Table, depth: usize, out: &mut String) -> Result<()> {
        self.encoder.check_depth(depth)?;
        let id = table.id();
        if !self.open.insert(id) {
            return Err(LuaDataError::Serialization(format!(
                "cyclic table reference at nesting level {}",
                depth
            )));
        }
        out.push('{');
        let entries = table.entries();
        let array = is_array(&entries);
        for (key, value) in self.sorted_entries(&entries, depth)? {
            if !array {
                self.key(key, depth, out)?;
            }
            self.value(value, depth, out)?;
            out.push(',');
        }
        out.push('}');
        self.open.remove(&id);
        Ok(())
    }

    /// Emit `key=` in the form that reads back as the same key.
    fn key(&mut self, key: &Key, depth: usize, out: &mut String) -> Result<()> {
        match key {
            Key::Integer(n) => {
                out.push('[');
                out.push_str(&n.to_string());
                out.push(']');
            }
            Key::String(s) if is_identifier(s) => out.push_str(s),
            Key::String(s) => {
                out.push('[');
                encode_string(s, out);
                out.push(']');
            }
            Key::Bool(b) => out.push_str(if *b { "[true]" } else { "[false]" }),
            Key::Table(t) => {
                out.push('[');
                self.nested(t, depth + 1, out)?;
                out.push(']');
            }
        }
        out.push('=');
        Ok(())
    }

    fn value(&mut self, value: &Value, depth: usize, out: &mut String) -> Result<()> {
        match value {
            Value::Integer(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::String(s) => encode_string(s, out),
            Value::Table(t) => self.nested(t, depth + 1, out)?,
        }
        Ok(())
    }
}

/// `true` if the keys are exactly `1..=len`.
fn is_array(entries: &Mapping) -> bool {
    let len = entries.len() as i64;
    entries
        .keys()
        .all(|k| matches!(k, Key::Integer(n) if (1..=len).contains(n)))
}

/// Double-quote `s`, escaping only line breaks.
///
/// Quotes and backslashes are written as they are. Line breaks are the
/// exception because the [`layout`](crate::layout) pass works line by line
/// and needs every entry on a single physical line.
fn encode_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

/// Six fractional digits.
///
/// Non-finite values are written as the expressions that produce them
/// (`0/0`, `1/0`, `-1/0`) rather than `NaN` or `inf`, which Lua would read
/// back as undefined globals.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "0/0".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "1/0" } else { "-1/0" };
        text.to_string()
    } else {
        format!("{:.6}", f)
    }
}

const RESERVED: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// A Lua name that is not a reserved word.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    valid && !RESERVED.contains(&s)
}
