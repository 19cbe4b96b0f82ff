//! Generic select/insert/update/delete over single tables.
//!
//! SQL text is generated from a record's static schema and the present
//! fields of the values passed in; every value is bound as a parameter.

use sqlx::error::ErrorKind;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row, Sqlite};
use tracing::{debug, error, warn};

use super::db::Store;
use super::schema::{
    Column, ColumnKind, Fields, Record, RowValues, Value, check_identifier, check_schema,
};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, <Sqlite as sqlx::Database>::Arguments<'q>>;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid record shape: {0}")]
    InvalidShape(String),

    #[error("Column {column:?} does not match the record schema for table {table:?}")]
    SchemaMismatch { table: String, column: String },

    #[error("Refusing to {operation} in {table:?} without a match filter")]
    EmptyFilter {
        operation: &'static str,
        table: String,
    },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store error: {0}")]
    Store(#[source] sqlx::Error),
}

impl From<sqlx::Error> for QueryError {
    fn from(e: sqlx::Error) -> Self {
        let constraint = e
            .as_database_error()
            .is_some_and(|db| !matches!(db.kind(), ErrorKind::Other));
        if constraint {
            Self::Constraint(e.to_string())
        } else {
            Self::Store(e)
        }
    }
}

/// Equality filter for `select`, with an optional row limit.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    matches: Vec<(&'static str, Value)>,
    limit: Option<u32>,
}

impl Filter {
    /// Match every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match rows equal to every present field of `fields`.
    pub fn matching(fields: &impl Fields) -> Self {
        Self {
            matches: fields.fields(),
            limit: None,
        }
    }

    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.matches.push((column, value.into()));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn where_clause(matches: &[(&'static str, Value)]) -> Result<String, QueryError> {
    let mut parts = Vec::with_capacity(matches.len());
    for (column, _) in matches {
        check_identifier(column)?;
        parts.push(format!("{column} = ?"));
    }
    Ok(parts.join(" AND "))
}

/// Build `SELECT <schema columns> FROM table [WHERE ...] [LIMIT n]`.
pub(crate) fn select_sql(
    table: &str,
    columns: &[Column],
    filter: &Filter,
) -> Result<(String, Vec<Value>), QueryError> {
    check_identifier(table)?;
    check_schema(columns)?;

    for (name, _) in &filter.matches {
        if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(QueryError::SchemaMismatch {
                table: table.to_string(),
                column: (*name).to_string(),
            });
        }
    }

    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    let mut sql = format!("SELECT {} FROM {table}", names.join(", "));
    if !filter.matches.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(&filter.matches)?);
    }
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let args = filter.matches.iter().map(|(_, v)| v.clone()).collect();
    Ok((sql, args))
}

/// Build `INSERT INTO table (cols) VALUES (?, ...)` from the present fields.
pub(crate) fn insert_sql(
    table: &str,
    fields: Vec<(&'static str, Value)>,
) -> Result<(String, Vec<Value>), QueryError> {
    check_identifier(table)?;
    if fields.is_empty() {
        return Err(QueryError::InvalidShape(format!("nothing to insert into {table}")));
    }

    let mut columns = Vec::with_capacity(fields.len());
    let mut args = Vec::with_capacity(fields.len());
    for (column, value) in fields {
        check_identifier(column)?;
        columns.push(column);
        args.push(value);
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    Ok((sql, args))
}

/// Build `UPDATE table SET ... WHERE ...`; both parts must be non-empty.
pub(crate) fn update_sql(
    table: &str,
    set: Vec<(&'static str, Value)>,
    matching: Vec<(&'static str, Value)>,
) -> Result<(String, Vec<Value>), QueryError> {
    check_identifier(table)?;
    if set.is_empty() {
        return Err(QueryError::InvalidShape(format!("nothing to update in {table}")));
    }
    if matching.is_empty() {
        return Err(QueryError::EmptyFilter {
            operation: "update",
            table: table.to_string(),
        });
    }

    let mut assignments = Vec::with_capacity(set.len());
    for (column, _) in &set {
        check_identifier(column)?;
        assignments.push(format!("{column} = ?"));
    }
    let sql = format!(
        "UPDATE {table} SET {} WHERE {}",
        assignments.join(", "),
        where_clause(&matching)?
    );

    let args = set
        .into_iter()
        .chain(matching)
        .map(|(_, value)| value)
        .collect();
    Ok((sql, args))
}

/// Build `DELETE FROM table WHERE ...`; the match set must be non-empty.
pub(crate) fn delete_sql(
    table: &str,
    matching: Vec<(&'static str, Value)>,
) -> Result<(String, Vec<Value>), QueryError> {
    check_identifier(table)?;
    if matching.is_empty() {
        return Err(QueryError::EmptyFilter {
            operation: "delete",
            table: table.to_string(),
        });
    }
    let sql = format!("DELETE FROM {table} WHERE {}", where_clause(&matching)?);
    let args = matching.into_iter().map(|(_, value)| value).collect();
    Ok((sql, args))
}

fn bind_values(mut query: SqliteQuery<'_>, values: Vec<Value>) -> SqliteQuery<'_> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Blob(v) => query.bind(v),
        };
    }
    query
}

fn decode_column(
    row: &SqliteRow,
    idx: usize,
    column: &Column,
    table: &str,
) -> Result<Value, QueryError> {
    let mismatch = || QueryError::SchemaMismatch {
        table: table.to_string(),
        column: column.name.to_string(),
    };

    let value = match column.kind {
        ColumnKind::Integer => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(Value::Integer)),
        ColumnKind::Text => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::Text)),
        ColumnKind::Blob => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| v.map(Value::Blob)),
    }
    .map_err(|e| {
        warn!(table, column = column.name, error = %e, "Column decode failed");
        mismatch()
    })?;

    match value {
        Some(value) => Ok(value),
        None if column.nullable => Ok(Value::Null),
        None => Err(mismatch()),
    }
}

/// Map one result row onto `R`, matching column names case-insensitively.
///
/// Result columns unknown to the schema are logged and dropped; schema
/// columns missing from the row fail the mapping. Statements built by
/// [`select_sql`] only name schema columns, so extra columns come from
/// hand-written queries.
pub(crate) fn map_row<R: Record>(table: &str, row: &SqliteRow) -> Result<R, QueryError> {
    let mut slots: Vec<Option<Value>> = vec![None; R::COLUMNS.len()];

    for (idx, result_column) in row.columns().iter().enumerate() {
        let name = sqlx::Column::name(result_column);
        let Some(pos) = R::COLUMNS
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
        else {
            warn!(
                table,
                column = name,
                "Discarding result column not in record schema"
            );
            continue;
        };
        slots[pos] = Some(decode_column(row, idx, &R::COLUMNS[pos], table)?);
    }

    let mut values = Vec::with_capacity(slots.len());
    for (column, slot) in R::COLUMNS.iter().zip(slots) {
        let value = slot.ok_or_else(|| QueryError::SchemaMismatch {
            table: table.to_string(),
            column: column.name.to_string(),
        })?;
        values.push((column.name, value));
    }

    R::from_row(RowValues::new(table, values))
}

impl Store {
    /// Acquire a pooled connection and make sure it still answers.
    async fn live_connection(&self) -> Result<PoolConnection<Sqlite>, QueryError> {
        let mut conn = self.pool().acquire().await?;
        conn.ping().await?;
        Ok(conn)
    }

    /// Check that the store answers.
    pub async fn ping(&self) -> Result<(), QueryError> {
        self.live_connection().await.map(|_| ())
    }

    /// Select every row of `table` matching `filter`, mapped onto `R`.
    pub async fn select<R: Record>(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Vec<R>, QueryError> {
        let (sql, args) = select_sql(table, R::COLUMNS, filter)?;
        debug!(sql = %sql, "select");

        let mut conn = self.live_connection().await?;
        let rows = bind_values(sqlx::query(&sql), args)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                error!(table, error = %e, "Database access failed");
                QueryError::from(e)
            })?;

        rows.iter().map(|row| map_row::<R>(table, row)).collect()
    }

    /// Select the first row matching `filter`, if any.
    pub async fn select_first<R: Record>(
        &self,
        table: &str,
        filter: Filter,
    ) -> Result<Option<R>, QueryError> {
        let rows = self.select::<R>(table, &filter.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row made of every present field. Returns the new rowid.
    pub async fn insert(
        &self,
        table: &str,
        record: &(impl Fields + Sync),
    ) -> Result<i64, QueryError> {
        let (sql, args) = insert_sql(table, record.fields())?;
        debug!(sql = %sql, "insert");

        let result = bind_values(sqlx::query(&sql), args)
            .execute(self.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Update rows matching every present field of `matching`. Returns the
    /// number of affected rows.
    pub async fn update(
        &self,
        table: &str,
        set: &(impl Fields + Sync),
        matching: &(impl Fields + Sync),
    ) -> Result<u64, QueryError> {
        let (sql, args) = update_sql(table, set.fields(), matching.fields())?;
        debug!(sql = %sql, "update");

        let result = bind_values(sqlx::query(&sql), args)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete rows matching every present field of `matching`. Returns the
    /// number of affected rows.
    pub async fn delete(
        &self,
        table: &str,
        matching: &(impl Fields + Sync),
    ) -> Result<u64, QueryError> {
        let (sql, args) = delete_sql(table, matching.fields())?;
        debug!(sql = %sql, "delete");

        let result = bind_values(sqlx::query(&sql), args)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
