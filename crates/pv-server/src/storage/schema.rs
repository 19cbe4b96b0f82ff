//! Compile-time record schemas for the query builder.
//!
//! A [`Record`] describes its table columns as an ordered, static list of
//! [`Column`]s and knows how to build itself from decoded [`RowValues`].
//! Anything that can be written or matched implements [`Fields`], which yields
//! only the columns that are actually present. Absence is spelled out with
//! `Option` rather than inferred from zero values.

use super::builder::QueryError;

/// A single SQL value, as bound to a statement or decoded from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Blob,
}

/// One column of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            nullable: false,
        }
    }

    pub const fn blob(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Blob,
            nullable: false,
        }
    }

    /// Allow `NULL` in this column.
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A flat record read from a single table.
pub trait Record: Sized {
    /// Ordered column set selected for this record.
    const COLUMNS: &'static [Column];

    /// Build the record from one decoded row.
    fn from_row(row: RowValues) -> Result<Self, QueryError>;
}

/// Present `(column, value)` pairs of a value being written or matched.
pub trait Fields {
    fn fields(&self) -> Vec<(&'static str, Value)>;
}

/// Decoded values of one row, in schema order.
#[derive(Debug)]
pub struct RowValues {
    table: String,
    values: Vec<(&'static str, Value)>,
}

impl RowValues {
    pub(crate) fn new(table: &str, values: Vec<(&'static str, Value)>) -> Self {
        Self {
            table: table.to_string(),
            values,
        }
    }

    fn take(&mut self, column: &str) -> Result<Value, QueryError> {
        self.values
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| std::mem::replace(value, Value::Null))
            .ok_or_else(|| self.mismatch(column))
    }

    fn mismatch(&self, column: &str) -> QueryError {
        QueryError::SchemaMismatch {
            table: self.table.clone(),
            column: column.to_string(),
        }
    }

    pub fn integer(&mut self, column: &str) -> Result<i64, QueryError> {
        match self.take(column)? {
            Value::Integer(v) => Ok(v),
            _ => Err(self.mismatch(column)),
        }
    }

    pub fn text(&mut self, column: &str) -> Result<String, QueryError> {
        match self.take(column)? {
            Value::Text(v) => Ok(v),
            _ => Err(self.mismatch(column)),
        }
    }

    pub fn optional_text(&mut self, column: &str) -> Result<Option<String>, QueryError> {
        match self.take(column)? {
            Value::Text(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            _ => Err(self.mismatch(column)),
        }
    }

    pub fn blob(&mut self, column: &str) -> Result<Vec<u8>, QueryError> {
        match self.take(column)? {
            Value::Blob(v) => Ok(v),
            _ => Err(self.mismatch(column)),
        }
    }
}

/// Reject anything that is not a plain SQL identifier.
pub(crate) fn check_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidShape(format!("{name:?} is not a valid identifier")))
    }
}

/// Check that a schema is non-empty, uses valid identifiers and has no
/// duplicate columns.
pub(crate) fn check_schema(columns: &[Column]) -> Result<(), QueryError> {
    if columns.is_empty() {
        return Err(QueryError::InvalidShape("record has no columns".into()));
    }
    for (idx, column) in columns.iter().enumerate() {
        check_identifier(column.name)?;
        if columns[..idx]
            .iter()
            .any(|earlier| earlier.name.eq_ignore_ascii_case(column.name))
        {
            return Err(QueryError::InvalidShape(format!("duplicate column {:?}", column.name)));
        }
    }
    Ok(())
}
