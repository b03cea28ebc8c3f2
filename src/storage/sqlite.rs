//! SQLite storage implementation
//!
//! This module provides a generic SQLite-backed [`Storage`]: any [`Record`]
//! is inserted as one row of the table it names. Records are checked against
//! the table definitions the storage was opened with, and writes are
//! serialized by a mutex around the single connection.

use crate::storage::schema::{create_table_sql, insert_sql, TableDef};
use crate::storage::traits::{Record, Storage, StorageError, StorageResult};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// SQLite storage backend
pub struct SqlStorage {
    conn: Mutex<Connection>,
    tables: Vec<TableDef>,
}

impl SqlStorage {
    /// Opens (or creates) the database at `path` and creates `tables`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `tables` - Tables to create if they do not exist yet
    ///
    /// # Returns
    ///
    /// * `Ok(SqlStorage)` - Successfully opened database with all tables
    /// * `Err(StorageError)` - Failed to open the database or create a table
    pub fn open(path: &Path, tables: &[TableDef]) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn, tables)
    }

    /// Creates an in-memory database with `tables`
    pub fn open_in_memory(tables: &[TableDef]) -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, tables)
    }

    fn with_connection(conn: Connection, tables: &[TableDef]) -> StorageResult<Self> {
        for def in tables {
            create_table(&conn, def)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            tables: tables.to_vec(),
        })
    }

    /// Rejects records whose table or columns were never declared
    fn check_shape(&self, table: &str, names: &[&str]) -> StorageResult<()> {
        let def = self
            .tables
            .iter()
            .find(|def| def.name.eq_ignore_ascii_case(table))
            .ok_or_else(|| StorageError::MalformedRecord(format!("unknown table '{}'", table)))?;

        match names.iter().find(|name| !def.has_column(name)) {
            Some(name) => Err(StorageError::MalformedRecord(format!(
                "unknown column '{}' for table '{}'",
                name, table
            ))),
            None => Ok(()),
        }
    }

    /// Runs `f` with exclusive access to the connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// Counts the rows of `table`
    pub fn count_rows(&self, table: &str) -> StorageResult<u64> {
        if !crate::storage::schema::validate_identifier(table) {
            return Err(StorageError::MalformedRecord(format!(
                "invalid table name '{}'",
                table
            )));
        }
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                    row.get(0)
                })?;
            Ok(count as u64)
        })
    }
}

impl Storage for SqlStorage {
    fn add_doc(&self, record: &dyn Record) -> StorageResult<()> {
        let table = record.table();
        let (names, values): (Vec<&str>, Vec<_>) = record.columns().into_iter().unzip();
        self.check_shape(table, &names)?;
        let sql = insert_sql(table, &names)?;

        tracing::trace!("Inserting into '{}': {} columns", table, names.len());
        self.with_conn(|conn| {
            conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(())
        })
    }
}

/// Creates one table from its definition
fn create_table(conn: &Connection, def: &TableDef) -> StorageResult<()> {
    let sql = create_table_sql(def)?;
    conn.execute_batch(&sql)
        .map_err(|source| StorageError::CreateTable {
            table: def.name.clone(),
            source,
        })?;
    tracing::debug!("Ensured table '{}' exists", def.name);
    Ok(())
}
