//! Canonical value tree for decoded Lua data.
//!
//! A [`Value`] tree is built once by the [`decoder`](crate::decoder) and never
//! mutated afterwards. Tables are reference-counted so that a table referenced
//! from several places in the source stays a single shared [`Table`]; the
//! comparator relies on that identity for its cycle guard. Edges that close a
//! cycle are weak, so a self-referencing tree is still freed when dropped.

use indexmap::IndexMap;
use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Entries of a table, in decode order. Ordering carries no meaning: the
/// encoder imposes its own.
pub type Mapping = IndexMap<Key, Value>;

/// A decoded Lua value. Numbers are split into integers and floats once, at
/// decode time, by whether they have a fractional part.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Table(Table),
}

/// A table key. Scalar keys compare by value, table keys by identity (two
/// structurally equal tables are still distinct keys, as in Lua).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Integer(i64),
    String(String),
    Bool(bool),
    Table(Table),
}

/// Immutable, shared table. Equality and hashing use identity; use
/// [`deep_equal`](crate::compare::deep_equal) for structural comparison.
///
/// A table that contains one of its own ancestors (`t.me = t`) holds that
/// edge as a back reference, which does not keep the ancestor alive. Such a
/// handle reads as empty once every owning handle is gone.
#[derive(Clone)]
pub struct Table(Link);

#[derive(Clone)]
enum Link {
    Owned(Rc<OnceCell<Mapping>>),
    Back(Weak<OnceCell<Mapping>>),
}

/// Borrowed view of a table's entries, returned by [`Table::entries`].
pub struct Entries(Rc<OnceCell<Mapping>>);

impl Deref for Entries {
    type Target = Mapping;

    fn deref(&self) -> &Mapping {
        self.0.get_or_init(Mapping::new)
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = (&'a Key, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new(Mapping::new())
    }
}

impl Table {
    pub fn new(entries: Mapping) -> Self {
        Self(Link::Owned(Rc::new(OnceCell::from(entries))))
    }

    /// Build a table whose values are keyed `1..=n` in iteration order.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Key::Integer(i as i64 + 1), v))
            .collect()
    }

    /// A table whose entries are set later with [`Table::fill`], so that its
    /// own contents can refer back to it.
    pub(crate) fn pending() -> Self {
        Self(Link::Owned(Rc::new(OnceCell::new())))
    }

    /// Set the entries of a [`Table::pending`] table. No effect on a table
    /// that already has them.
    pub(crate) fn fill(&self, entries: Mapping) {
        if let Link::Owned(cell) = &self.0 {
            let _ = cell.set(entries);
        }
    }

    /// A non-owning handle to the same table.
    pub(crate) fn back_reference(&self) -> Table {
        match &self.0 {
            Link::Owned(cell) => Table(Link::Back(Rc::downgrade(cell))),
            Link::Back(weak) => Table(Link::Back(weak.clone())),
        }
    }

    pub fn entries(&self) -> Entries {
        match &self.0 {
            Link::Owned(cell) => Entries(cell.clone()),
            Link::Back(weak) => Entries(weak.upgrade().unwrap_or_default()),
        }
    }

    pub fn get(&self, key: &Key) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    /// Look up a string key.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.get(&Key::String(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// `true` if this handle is a back reference to an enclosing table.
    pub fn is_back_reference(&self) -> bool {
        matches!(self.0, Link::Back(_))
    }

    /// `true` if both handles point at the same table.
    pub fn ptr_eq(a: &Table, b: &Table) -> bool {
        a.id() == b.id()
    }

    pub(crate) fn id(&self) -> usize {
        match &self.0 {
            Link::Owned(cell) => Rc::as_ptr(cell) as usize,
            Link::Back(weak) => weak.as_ptr() as usize,
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        Table::ptr_eq(self, other)
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Link::Owned(_) => f.debug_map().entries(self.entries().iter()).finish(),
            Link::Back(_) => write!(f, "<back reference {:#x}>", self.id()),
        }
    }
}

impl FromIterator<(Key, Value)> for Table {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        Table::new(iter.into_iter().collect())
    }
}

impl Value {
    /// Build a table value from key/value pairs.
    pub fn table<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Table(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array-shaped table value (keys `1..=n`).
    pub fn array<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Table(Table::array(items.into_iter().map(Into::into)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
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

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Integer(i64::from(n))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<Table> for Key {
    fn from(t: Table) -> Self {
        Key::Table(t)
    }
}
