//! Storage traits and error types
//!
//! This module defines the storage capability used by the spider, the
//! record contract generic storages rely on, and the associated error types.

use thiserror::Error;

/// A single SQL value bound into an insert statement
pub type SqlValue = rusqlite::types::Value;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create table '{table}': {source}")]
    CreateTable {
        table: String,
        source: rusqlite::Error,
    },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid table definition: {0}")]
    InvalidTable(String),
}

impl StorageError {
    /// Returns true for errors caused by a programming mistake
    ///
    /// Malformed records and table definitions will fail the same way on every
    /// call; I/O and constraint errors from the database are recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CreateTable { .. } | Self::MalformedRecord(_) | Self::InvalidTable(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A parser-produced item that can be written as one table row
///
/// The record describes its own schema: the target table and the
/// (column name, value) pairs to insert. Fields that should not be stored
/// are simply not listed.
pub trait Record: Send + Sync {
    /// Name of the table this record belongs to
    fn table(&self) -> &str;

    /// Column names and values, in insertion order
    fn columns(&self) -> Vec<(&str, SqlValue)>;
}

/// Trait for storage sinks selected by URL pattern
///
/// Implementations are shared between all spider workers and must be safe to
/// call concurrently.
pub trait Storage: Send + Sync {
    /// Persists one record
    fn add_doc(&self, record: &dyn Record) -> StorageResult<()>;
}
