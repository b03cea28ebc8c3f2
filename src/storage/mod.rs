//! Storage module for persisting extracted records
//!
//! This module handles:
//! - The storage capability the spider routes records to
//! - The record contract: a table name plus (column, value) pairs
//! - Table definitions created when a database is opened
//! - A generic SQLite implementation with serialized writes

mod schema;
mod sqlite;
mod traits;

pub use schema::{create_table_sql, insert_sql, validate_identifier, ColumnDef, TableDef};
pub use sqlite::SqlStorage;
pub use traits::{Record, SqlValue, Storage, StorageError, StorageResult};

use std::path::Path;

/// Opens a SQLite storage database and creates `tables`
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `tables` - Table definitions to create if missing
///
/// # Returns
///
/// * `Ok(SqlStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open the database or create a table
pub fn open_storage(path: &Path, tables: &[TableDef]) -> StorageResult<SqlStorage> {
    SqlStorage::open(path, tables)
}
