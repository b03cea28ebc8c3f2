//! Output module for exporting crawl results
//!
//! This module handles:
//! - Exporting a crawled table as one CSV file per group
//! - Computing monthly funding statistics over the exported rows

mod report;
pub mod stats;

pub use report::{generate_report, render_value, ReportOptions, ReportSummary, DEFAULT_COLUMNS};
pub use stats::{Bucket, MonthlyBuckets, MonthlyStats, Sample};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown group column '{0}'")]
    UnknownColumn(String),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
