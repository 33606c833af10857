//! Deep structural equality of [`Value`] trees.
//!
//! Scalars compare by variant and value (no numeric tolerance, and an
//! `Integer` never equals a `Float`). Tables compare entry by entry:
//!
//! - a scalar key is looked up directly on the right-hand side;
//! - a table key has no direct counterpart, so the right-hand table keys that
//!   are still unmatched are searched in order, and the first one whose key
//!   *and* value compare equal is consumed. The search is greedy: it does not
//!   backtrack, so two structurally identical keys that pair differently with
//!   later entries can make equal tables compare unequal;
//! - any right-hand key left over at the end makes the tables unequal.
//!
//! # Cycle guard
//!
//! Every left-hand table is paired with the right-hand table it was first
//! compared against, before its contents are compared. Meeting the same left
//! table again succeeds only if it is paired with the identical right table.
//! Pairings recorded by a failed candidate in the table-key search are kept.
//! Table keys themselves are compared with a fresh guard.
//!
//! The guard is also what makes cyclic trees comparable: a left table met
//! again through a back reference equals only the right table it was paired
//! with.

use std::collections::HashMap;

use crate::error::{LuaDataError, Result};
use crate::value::{Key, Mapping, Table, Value};
use crate::DEFAULT_MAX_DEPTH;

/// Compare two values with the default recursion limit.
pub fn deep_equal(left: &Value, right: &Value) -> Result<bool> {
    Comparator::new().equal(left, right)
}

/// Reusable comparison settings. Each call to [`Comparator::equal`] starts
/// with an empty cycle guard.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    max_depth: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Table nesting beyond which comparison fails with
    /// [`LuaDataError::Comparison`] instead of recursing further.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn equal(&self, left: &Value, right: &Value) -> Result<bool> {
        Walk::new(self.max_depth, 0).values(left, right)
    }

    pub fn equal_tables(&self, left: &Table, right: &Table) -> Result<bool> {
        Walk::new(self.max_depth, 0).tables(left, right)
    }
}

/// Traversal state of one comparison.
struct Walk {
    max_depth: usize,
    depth: usize,
    /// Left table id → the right table it was paired with.
    partners: HashMap<usize, Table>,
}

impl Walk {
    fn new(max_depth: usize, depth: usize) -> Self {
        Self {
            max_depth,
            depth,
            partners: HashMap::new(),
        }
    }

    fn values(&mut self, left: &Value, right: &Value) -> Result<bool> {
        Ok(match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => return self.tables(a, b),
            _ => false,
        })
    }

    fn tables(&mut self, left: &Table, right: &Table) -> Result<bool> {
        if let Some(partner) = self.partners.get(&left.id()) {
            return Ok(Table::ptr_eq(partner, right));
        }
        self.partners.insert(left.id(), right.clone());

        if self.depth >= self.max_depth {
            return Err(LuaDataError::Comparison(format!(
                "table nesting exceeds {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = self.entries(left, right);
        self.depth -= 1;
        result
    }

    fn entries(&mut self, left: &Table, right: &Table) -> Result<bool> {
        let left = left.entries();
        let right = right.entries();
        let mut candidates: Vec<&Table> = right
            .keys()
            .filter_map(|k| match k {
                Key::Table(t) => Some(t),
                _ => None,
            })
            .collect();
        let mut matched = 0usize;

        for (key, value) in &left {
            if let Key::Table(left_key) = key {
                let Some(index) = self.match_table_key(left_key, value, &right, &candidates)? else {
                    return Ok(false);
                };
                candidates.remove(index);
            } else {
                let Some(other) = right.get(key) else {
                    return Ok(false);
                };
                if !self.values(value, other)? {
                    return Ok(false);
                }
            }
            matched += 1;
        }

        Ok(matched == right.len())
    }

    /// Index of the first candidate whose key and value both match.
    fn match_table_key(
        &mut self,
        left_key: &Table,
        left_value: &Value,
        right: &Mapping,
        candidates: &[&Table],
    ) -> Result<Option<usize>> {
        for (index, candidate) in candidates.iter().enumerate() {
            if !Walk::new(self.max_depth, self.depth).tables(left_key, candidate)? {
                continue;
            }
            let key = Key::Table((*candidate).clone());
            let Some(right_value) = right.get(&key) else {
                continue;
            };
            if self.values(left_value, right_value)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}
