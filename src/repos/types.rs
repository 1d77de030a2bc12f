use failure::Error as FailureError;

use r2d2;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite;
use rusqlite::types::Type;
use rusqlite::Row;

use serde::de::DeserializeOwned;

/// Repos layer result
pub type RepoResult<T> = Result<T, FailureError>;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Decodes a JSON-encoded text column, e.g. tags or vote sets.
pub fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    ::serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
