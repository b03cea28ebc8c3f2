//! Table definitions and SQL statement builders
//!
//! Statements are assembled from identifiers supplied by record types and
//! table definitions, so every identifier is validated and double-quoted.

use crate::storage::traits::{StorageError, StorageResult};

/// One column of a table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Type declaration and constraints, e.g. `INTEGER PRIMARY KEY`
    pub decl: String,
}

/// Definition of a table created when a storage is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,

    /// Optional composite primary key
    pub primary_keys: Vec<String>,
}

impl TableDef {
    /// Starts a definition for table `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
        }
    }

    /// Appends a column
    pub fn column(mut self, name: impl Into<String>, decl: impl Into<String>) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            decl: decl.into(),
        });
        self
    }

    /// Sets the composite primary key
    pub fn primary_key<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the table declares column `name`
    ///
    /// SQLite identifiers are case-insensitive, and so is this check.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(name))
    }
}

/// Checks that `name` is a plain SQL identifier
pub fn validate_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement for a definition
pub fn create_table_sql(def: &TableDef) -> StorageResult<String> {
    if !validate_identifier(&def.name) {
        return Err(StorageError::InvalidTable(format!(
            "invalid table name '{}'",
            def.name
        )));
    }
    if def.columns.is_empty() {
        return Err(StorageError::InvalidTable(format!(
            "table '{}' has no columns",
            def.name
        )));
    }

    let mut lines = Vec::with_capacity(def.columns.len() + 1);
    for column in &def.columns {
        if !validate_identifier(&column.name) {
            return Err(StorageError::InvalidTable(format!(
                "invalid column name '{}' in table '{}'",
                column.name, def.name
            )));
        }
        lines.push(format!("    {} {}", quote(&column.name), column.decl));
    }

    if !def.primary_keys.is_empty() {
        for key in &def.primary_keys {
            if !def.columns.iter().any(|c| &c.name == key) {
                return Err(StorageError::InvalidTable(format!(
                    "primary key '{}' is not a column of table '{}'",
                    key, def.name
                )));
            }
        }
        let keys: Vec<String> = def.primary_keys.iter().map(|k| quote(k)).collect();
        lines.push(format!("    PRIMARY KEY({})", keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote(&def.name),
        lines.join(",\n")
    ))
}

/// Builds a parameterized `INSERT` statement for `table` and `columns`
pub fn insert_sql(table: &str, columns: &[&str]) -> StorageResult<String> {
    if !validate_identifier(table) {
        return Err(StorageError::MalformedRecord(format!(
            "invalid table name '{}'",
            table
        )));
    }
    if columns.is_empty() {
        return Err(StorageError::MalformedRecord(format!(
            "record for table '{}' has no columns",
            table
        )));
    }
    if let Some(bad) = columns.iter().find(|c| !validate_identifier(c)) {
        return Err(StorageError::MalformedRecord(format!(
            "invalid column name '{}' for table '{}'",
            bad, table
        )));
    }

    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        names.join(", "),
        placeholders.join(", ")
    ))
}
