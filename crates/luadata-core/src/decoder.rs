//! Lua table → [`Value`] tree.
//!
//! The decoder walks a table produced by the [`runtime`](crate::runtime) and
//! converts it into the closed [`Value`]/[`Key`] types. It is the only place
//! that looks at dynamically typed Lua values.
//!
//! # Conversion rules
//!
//! - Numbers with a zero fractional part that fit in an `i64` become
//!   [`Value::Integer`]; every other number becomes [`Value::Float`]. The
//!   same rule applies to keys, except that a non-integral numeric key has no
//!   [`Key`] variant and is dropped.
//! - Functions, userdata and threads are dropped from the mapping. This is
//!   lossy on purpose: data files only carry data.
//! - A Lua table reachable through several paths decodes once and is shared,
//!   so the resulting tree keeps the source's identity structure.
//! - A table that refers to one of its enclosing tables (`t.me = t`) decodes
//!   that reference as a [back reference](Table::is_back_reference) to the
//!   already decoded ancestor.

use std::collections::HashMap;

use mlua::{Table as LuaTable, Value as LuaValue};

use crate::error::{LuaDataError, Result};
use crate::runtime::type_name;
use crate::value::{Key, Mapping, Table, Value};
use crate::DEFAULT_MAX_DEPTH;

/// Decode a Lua root value, which must be a table.
pub fn decode(raw: &LuaValue) -> Result<Table> {
    Decoder::new().decode_named("root", raw)
}

/// Stateful decoder. One instance may decode several roots; tables shared
/// between them are decoded once.
#[derive(Debug)]
pub struct Decoder {
    max_depth: usize,
    /// Lua table address → fully decoded table.
    done: HashMap<usize, Table>,
    /// Lua table address → enclosing table still being decoded.
    open: HashMap<usize, Table>,
    path: Vec<String>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            done: HashMap::new(),
            open: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Maximum table nesting accepted before failing with
    /// [`LuaDataError::TooDeep`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decode `raw`, using `name` as the root of paths in error messages.
    pub fn decode_named(&mut self, name: &str, raw: &LuaValue) -> Result<Table> {
        let LuaValue::Table(table) = raw else {
            return Err(LuaDataError::NotATable {
                name: name.to_string(),
                found: type_name(raw),
            });
        };
        self.path.clear();
        self.path.push(name.to_string());
        let decoded = self.table(table);
        self.path.clear();
        self.open.clear();
        decoded
    }

    fn table(&mut self, raw: &LuaTable) -> Result<Table> {
        let id = raw.to_pointer() as usize;
        if let Some(done) = self.done.get(&id) {
            return Ok(done.clone());
        }
        if let Some(ancestor) = self.open.get(&id) {
            log::debug!("back reference at {}", self.path());
            return Ok(ancestor.back_reference());
        }
        if self.path.len() > self.max_depth {
            return Err(LuaDataError::TooDeep {
                path: self.path(),
                limit: self.max_depth,
            });
        }

        let table = Table::pending();
        self.open.insert(id, table.clone());
        let entries = self.entries(raw)?;
        table.fill(entries);
        self.open.remove(&id);
        self.done.insert(id, table.clone());
        Ok(table)
    }

    fn entries(&mut self, raw: &LuaTable) -> Result<Mapping> {
        let pairs = raw
            .pairs::<LuaValue, LuaValue>()
            .collect::<mlua::Result<Vec<_>>>()
            .map_err(|source| LuaDataError::Exec {
                chunk: self.path(),
                source,
            })?;

        let mut mapping = Mapping::with_capacity(pairs.len());
        for (raw_key, raw_value) in &pairs {
            self.path.push(segment(raw_key));
            let entry = self.entry(raw_key, raw_value);
            self.path.pop();
            match entry? {
                Some((key, value)) => {
                    mapping.insert(key, value);
                }
                None => log::debug!(
                    "omitting {}[{}] = {}",
                    self.path(),
                    type_name(raw_key),
                    type_name(raw_value)
                ),
            }
        }
        Ok(mapping)
    }

    fn entry(&mut self, key: &LuaValue, value: &LuaValue) -> Result<Option<(Key, Value)>> {
        let key = match key {
            LuaValue::Boolean(b) => Key::Bool(*b),
            LuaValue::Integer(n) => match i64::try_from(*n).ok() {
                Some(i) => Key::Integer(i),
                None => return Ok(None),
            },
            LuaValue::Number(n) => match as_integer(*n) {
                Some(i) => Key::Integer(i),
                None => return Ok(None),
            },
            LuaValue::String(s) => Key::String(s.to_string_lossy().into()),
            LuaValue::Table(t) => Key::Table(self.table(t)?),
            _ => return Ok(None),
        };
        let value = match value {
            LuaValue::Boolean(b) => Value::Bool(*b),
            LuaValue::Integer(n) => match i64::try_from(*n).ok() {
                Some(i) => Value::Integer(i),
                None => Value::Float(*n as f64),
            },
            LuaValue::Number(n) => match as_integer(*n) {
                Some(i) => Value::Integer(i),
                None => Value::Float(*n),
            },
            LuaValue::String(s) => Value::String(s.to_string_lossy().into()),
            LuaValue::Table(t) => Value::Table(self.table(t)?),
            _ => return Ok(None),
        };
        Ok(Some((key, value)))
    }

    fn path(&self) -> String {
        self.path.concat()
    }
}

/// `Some(i)` if `n` is integral and representable as an `i64`.
pub(crate) fn as_integer(n: f64) -> Option<i64> {
    // -2^63 and 2^63 are exact in f64; the upper bound is exclusive.
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && (LOWER..UPPER).contains(&n) {
        Some(n as i64)
    } else {
        None
    }
}

fn segment(key: &LuaValue) -> String {
    match key {
        LuaValue::String(s) => {
            let s = s.to_string_lossy();
            if is_plain_name(&s) {
                format!(".{}", s)
            } else {
                format!("[{:?}]", s)
            }
        }
        LuaValue::Integer(n) => format!("[{}]", n),
        LuaValue::Number(n) => format!("[{}]", n),
        LuaValue::Boolean(b) => format!("[{}]", b),
        other => format!("[{}]", type_name(other)),
    }
}

fn is_plain_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
