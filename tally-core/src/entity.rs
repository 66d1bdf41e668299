use crate::{AsValue, EngineError, MappingMode, Result, RowLabeled, Value};
use std::fmt::{self, Display};

/// Role of a column in the identity of the entity.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    #[default]
    None,
    Key,
    Key2,
}

/// Declaration of a single column.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: &'static str,
    /// Type prototype, always a null value.
    pub value: Value,
    pub nullable: bool,
    pub key: KeyPart,
    /// The database generates the value (auto increment key).
    pub generated: bool,
    /// Writes to this column only invalidate its own field cache entry.
    pub high_frequency: bool,
    /// Never served from the cache.
    pub uncached: bool,
    /// Overrides the SQL type chosen by the dialect.
    pub sql_type: Option<&'static str>,
}

impl ColumnDef {
    pub fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            value: value.as_null(),
            nullable: false,
            key: KeyPart::None,
            generated: false,
            high_frequency: false,
            uncached: false,
            sql_type: None,
        }
    }
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    pub fn key(mut self) -> Self {
        self.key = KeyPart::Key;
        self
    }
    pub fn key2(mut self) -> Self {
        self.key = KeyPart::Key2;
        self
    }
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
    pub fn high_frequency(mut self) -> Self {
        self.high_frequency = true;
        self
    }
    pub fn uncached(mut self) -> Self {
        self.uncached = true;
        self
    }
    pub fn sql_type(mut self, sql_type: &'static str) -> Self {
        self.sql_type = Some(sql_type);
        self
    }
    pub fn is_key(&self) -> bool {
        self.key != KeyPart::None
    }
}

/// Positions of the key columns inside [`EntityDescriptor::columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDescriptor {
    Single(usize),
    Composite(usize, usize),
}

/// Shape of an entity: table, columns and key. Computed once per type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub columns: Vec<ColumnDef>,
    pub key: KeyDescriptor,
}

impl EntityDescriptor {
    /// Validate the key shape: exactly one `Key` column and at most one `Key2` column.
    pub fn new(table: &'static str, columns: Vec<ColumnDef>) -> Result<Self> {
        let find = |part| columns.iter().position(|c| c.key == part);
        let count = |part| columns.iter().filter(|c| c.key == part).count();
        if count(KeyPart::Key) > 1 || count(KeyPart::Key2) > 1 {
            return Err(crate::Error::msg(format!(
                "Entity `{}` declares more than two key columns, only (Key, Key2) is supported",
                table
            )));
        }
        let key = match (find(KeyPart::Key), find(KeyPart::Key2)) {
            (Some(key), None) => KeyDescriptor::Single(key),
            (Some(key), Some(key2)) => KeyDescriptor::Composite(key, key2),
            _ => return Err(EngineError::MissingKey(table.to_string()).into()),
        };
        Ok(Self {
            table,
            columns,
            key,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnDef> {
        self.column(name).ok_or_else(|| {
            EngineError::UnknownColumn {
                table: self.table,
                column: name.to_string(),
            }
            .into()
        })
    }

    pub fn key_columns(&self) -> Vec<&ColumnDef> {
        match self.key {
            KeyDescriptor::Single(k) => vec![&self.columns[k]],
            KeyDescriptor::Composite(k, k2) => vec![&self.columns[k], &self.columns[k2]],
        }
    }

    pub fn key_names(&self) -> Vec<&'static str> {
        self.key_columns().iter().map(|c| c.name).collect()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn has_high_frequency(&self) -> bool {
        self.columns.iter().any(|c| c.high_frequency)
    }

    /// Pair the key columns with the values of `key`, in (Key, Key2) order.
    pub fn key_filter(&self, key: &EntityKey) -> Result<Vec<(&'static str, Value)>> {
        match (self.key, key) {
            (KeyDescriptor::Single(k), EntityKey::Single(v)) => {
                Ok(vec![(self.columns[k].name, v.clone())])
            }
            (KeyDescriptor::Composite(k, k2), EntityKey::Composite(v, v2)) => Ok(vec![
                (self.columns[k].name, v.clone()),
                (self.columns[k2].name, v2.clone()),
            ]),
            _ => Err(crate::Error::msg(format!(
                "Key `{}` does not match the key shape of `{}`",
                key, self.table
            ))),
        }
    }
}

/// Identity of a row, (Key) or (Key, Key2).
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKey {
    Single(Value),
    Composite(Value, Value),
}

impl EntityKey {
    pub fn single(key: impl AsValue) -> Self {
        EntityKey::Single(key.as_value())
    }
    pub fn composite(key: impl AsValue, key2: impl AsValue) -> Self {
        EntityKey::Composite(key.as_value(), key2.as_value())
    }
    pub fn is_unset(&self) -> bool {
        match self {
            EntityKey::Single(v) => v.is_null(),
            EntityKey::Composite(v, v2) => v.is_null() || v2.is_null(),
        }
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Single(v) => write!(f, "{}", v),
            EntityKey::Composite(v, v2) => write!(f, "{}:{}", v, v2),
        }
    }
}

impl<T: AsValue> From<T> for EntityKey {
    fn from(value: T) -> Self {
        EntityKey::Single(value.as_value())
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Single(value.into())
    }
}

/// A typed record mapped to a table.
///
/// Usually implemented through `#[derive(Entity)]`, which computes the descriptor once and
/// generates the row mapping. Implementing it by hand only requires the descriptor to be
/// memoized (a `LazyLock` static works).
pub trait Entity: Send + Sync + Sized + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    fn table() -> &'static str {
        Self::descriptor().table
    }

    /// Build the entity from a row. Columns missing from the row keep their default value.
    fn from_row_with(row: &RowLabeled, mode: MappingMode) -> Result<Self>;

    /// Lenient mapping: conversion failures are logged and the field keeps its default.
    fn from_row(row: &RowLabeled) -> Result<Self> {
        Self::from_row_with(row, MappingMode::Lenient)
    }

    /// Column values in storage form, converters applied.
    fn extract_fields(&self) -> Result<Vec<(&'static str, Value)>>;

    fn primary_key(&self) -> EntityKey;
}
