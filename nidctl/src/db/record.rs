//! Static field registry for persisted record types.
//!
//! Every table-backed type declares its columns once, as a `&'static` slice of
//! [`FieldDef`]s. The registry is what the generic repository consults for
//! dynamic filtering and ordering, and what the validation primitives use to
//! find unique columns and foreign-key relations. Lookups are slice scans over
//! a handful of entries, built at compile time.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::fmt;

/// Column metadata for one field of a [`Record`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Values of this column must be unique across the table
    pub unique: bool,
    /// Foreign-key target, if this column references another table
    pub references: Option<Reference>,
    /// Soft-delete marker: rows with a non-null value here are excluded from
    /// listing and filtering at the operation layer
    pub tombstone: bool,
}

/// A foreign-key target: `table.column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            unique: false,
            references: None,
            tombstone: false,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(Reference { table, column });
        self
    }

    pub const fn tombstone(mut self) -> Self {
        self.tombstone = true;
        self
    }
}

/// A persisted entity type with a primary key and a field registry.
///
/// Implementors are plain row structs deriving `sqlx::FromRow`; the registry
/// must list every column, including the primary key.
pub trait Record: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Primary-key type
    type Id: for<'q> sqlx::Encode<'q, Sqlite>
        + sqlx::Type<Sqlite>
        + fmt::Display
        + Clone
        + Send
        + Sync
        + 'static;

    /// Table name
    const TABLE: &'static str;

    /// Primary-key column name
    const PRIMARY_KEY: &'static str = "id";

    /// The column registry for this type
    fn fields() -> &'static [FieldDef];

    /// Look up a column by name; `None` for unknown names
    fn field(name: &str) -> Option<&'static FieldDef> {
        Self::fields().iter().find(|f| f.name == name)
    }

    /// The soft-delete column, if this type declares one
    fn tombstone() -> Option<&'static str> {
        Self::fields().iter().find(|f| f.tombstone).map(|f| f.name)
    }
}

/// A dynamically-typed column value, as carried by create/update payloads and
/// equality filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Bind this value as the next placeholder of the query being built.
    pub(crate) fn push_bind_to<'args>(&self, query: &mut QueryBuilder<'args, Sqlite>) {
        match self {
            Value::Null => query.push_bind(None::<String>),
            Value::Bool(v) => query.push_bind(*v),
            Value::Int(v) => query.push_bind(*v),
            Value::Float(v) => query.push_bind(*v),
            Value::Text(v) => query.push_bind(v.clone()),
            Value::Timestamp(v) => query.push_bind(*v),
        };
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// An ordered field-name → [`Value`] map. Insertion order is preserved so
/// generated SQL is deterministic; setting an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Chaining variant of [`set`](Self::set) for building literals.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Drop every null-valued entry. Applied to update payloads (a missing
    /// field means "leave unchanged") and to raw query-parameter filters.
    pub fn strip_nulls(&mut self) {
        self.entries.retain(|(_, v)| !v.is_null());
    }
}
