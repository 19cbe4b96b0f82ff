//! Record and field types for the `users` and `elements` tables.

use serde::Serialize;

use super::builder::QueryError;
use super::schema::{Column, Fields, Record, RowValues, Value};
use crate::auth::Role;

/// Full user row, including the password hash and token generation.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub uid: i64,
    pub name: String,
    pub password: String,
    pub tid: i64,
    pub role: Role,
}

impl Record for UserRow {
    const COLUMNS: &'static [Column] = &[
        Column::integer("uid"),
        Column::text("name"),
        Column::text("password"),
        Column::integer("tid"),
        Column::text("role"),
    ];

    fn from_row(mut row: RowValues) -> Result<Self, QueryError> {
        let role = row.text("role")?;
        Ok(Self {
            uid: row.integer("uid")?,
            name: row.text("name")?,
            password: row.text("password")?,
            tid: row.integer("tid")?,
            role: Role::parse(&role).ok_or_else(|| QueryError::SchemaMismatch {
                table: super::USERS_TABLE.to_string(),
                column: "role".to_string(),
            })?,
        })
    }
}

/// Public view of a user, as listed to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub uid: i64,
    pub name: String,
}

impl Record for UserSummary {
    const COLUMNS: &'static [Column] = &[Column::integer("uid"), Column::text("name")];

    fn from_row(mut row: RowValues) -> Result<Self, QueryError> {
        Ok(Self {
            uid: row.integer("uid")?,
            name: row.text("name")?,
        })
    }
}

/// Insert shape for a new user. `tid` is left to the column default.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub role: Role,
}

impl Fields for NewUser {
    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(self.name.as_str())),
            ("password", Value::from(self.password.as_str())),
            ("role", Value::from(self.role.as_str())),
        ]
    }
}

/// Match on a user id. The default key matches nothing and is refused by
/// update and delete.
#[derive(Debug, Clone, Default)]
pub struct UserKey {
    pub uid: Option<i64>,
}

impl UserKey {
    pub const fn by_uid(uid: i64) -> Self {
        Self { uid: Some(uid) }
    }
}

impl Fields for UserKey {
    fn fields(&self) -> Vec<(&'static str, Value)> {
        self.uid
            .map(|uid| ("uid", Value::Integer(uid)))
            .into_iter()
            .collect()
    }
}

/// One reserved element and its (optional) holder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRow {
    pub mid: String,
    pub name: Option<String>,
}

impl Record for ElementRow {
    const COLUMNS: &'static [Column] = &[Column::text("mid"), Column::text("name").nullable()];

    fn from_row(mut row: RowValues) -> Result<Self, QueryError> {
        Ok(Self {
            mid: row.text("mid")?,
            name: row.optional_text("name")?,
        })
    }
}

impl Fields for ElementRow {
    fn fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = vec![("mid", Value::from(self.mid.as_str()))];
        if let Some(name) = &self.name {
            fields.push(("name", Value::from(name.as_str())));
        }
        fields
    }
}

/// Match on an element id.
#[derive(Debug, Clone)]
pub struct ElementKey {
    pub mid: String,
}

impl ElementKey {
    pub fn new(mid: &str) -> Self {
        Self {
            mid: mid.to_string(),
        }
    }
}

impl Fields for ElementKey {
    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![("mid", Value::from(self.mid.as_str()))]
    }
}

/// New holder of a reserved element. `None` writes `NULL` (anonymous).
#[derive(Debug, Clone)]
pub struct HolderUpdate {
    pub name: Option<String>,
}

impl Fields for HolderUpdate {
    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![("name", Value::from(self.name.clone()))]
    }
}
