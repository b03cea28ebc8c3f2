//! CSV export of a crawl database
//!
//! Rows of one table are split into one CSV file per group, and monthly
//! funding statistics over all rows are written next to them.

use crate::output::stats::{MonthlyStats, Sample};
use crate::output::{OutputError, OutputResult};
use crate::storage::validate_identifier;
use chrono::{DateTime, Datelike, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

/// Columns exported by default
pub const DEFAULT_COLUMNS: [&str; 9] = [
    "name",
    "goal",
    "pledged",
    "currency",
    "usd_rate",
    "launched_at",
    "deadline",
    "url",
    "slug",
];

/// Timestamp format used in exported cells
const TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// What to export and where
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// SQLite database to read
    pub db_name: PathBuf,
    pub table: String,
    pub columns: Vec<String>,

    /// Columns whose values, joined by `,`, name a row's group
    pub group_by: Vec<String>,

    /// Prefix of every output file, may include a directory
    pub output_base: String,
}

impl ReportOptions {
    pub fn new(db_name: impl Into<PathBuf>) -> Self {
        Self {
            db_name: db_name.into(),
            table: "projects".to_string(),
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            group_by: vec!["slug".to_string()],
            output_base: "kickstarter".to_string(),
        }
    }

    fn group_file(&self, group: &str) -> PathBuf {
        PathBuf::from(format!("{}-{}.csv", self.output_base, group.replace('/', "_")))
    }

    fn stats_file(&self) -> PathBuf {
        PathBuf::from(format!("{}-stats.csv", self.output_base))
    }
}

/// Result of a report run
#[derive(Debug, Clone, Default)]
pub struct ReportSummary {
    /// Rows exported
    pub rows: u64,

    /// Group names, sorted
    pub groups: Vec<String>,

    /// Files written, statistics last
    pub files: Vec<PathBuf>,
}

/// Positions of the columns the statistics read
#[derive(Debug, Default)]
struct StatColumns {
    goal: Option<usize>,
    pledged: Option<usize>,
    usd_rate: Option<usize>,
    launched_at: Option<usize>,
    deadline: Option<usize>,
}

impl StatColumns {
    fn locate(columns: &[String]) -> Self {
        let find = |name: &str| columns.iter().position(|c| c == name);
        Self {
            goal: find("goal"),
            pledged: find("pledged"),
            usd_rate: find("usd_rate"),
            launched_at: find("launched_at"),
            deadline: find("deadline"),
        }
    }

    fn sample(&self, values: &[ValueRef<'_>]) -> Sample {
        let number = |index: Option<usize>| index.and_then(|i| as_f64(values[i]));
        let month = |index: Option<usize>| {
            index
                .and_then(|i| as_time(values[i]))
                .map(|t| t.month0() as usize)
        };

        // Rows without a rate are taken to be in USD already.
        let rate = number(self.usd_rate).unwrap_or(1.0);
        Sample {
            goal: number(self.goal).unwrap_or(0.0) * rate,
            pledged: number(self.pledged).unwrap_or(0.0) * rate,
            start_month: month(self.launched_at),
            end_month: month(self.deadline),
        }
    }
}

fn as_f64(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.parse().ok(),
        _ => None,
    }
}

fn as_time(value: ValueRef<'_>) -> Option<DateTime<Utc>> {
    match value {
        ValueRef::Text(t) => DateTime::parse_from_rfc3339(std::str::from_utf8(t).ok()?)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// Renders one cell of an exported row
pub fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => {
            let text = String::from_utf8_lossy(t);
            match DateTime::parse_from_rfc3339(&text) {
                Ok(time) => time.with_timezone(&Utc).format(TIME_FORMAT).to_string(),
                Err(_) => text.into_owned(),
            }
        }
        ValueRef::Blob(b) => hex::encode(b),
    }
}

fn check_identifier(name: &str) -> OutputResult<()> {
    if validate_identifier(name) {
        Ok(())
    } else {
        Err(OutputError::InvalidIdentifier(name.to_string()))
    }
}

/// Exports `options.table` as per-group CSV files plus a statistics file
///
/// # Returns
///
/// * `Ok(ReportSummary)` - Every file was written
/// * `Err(OutputError)` - Invalid options, or a database or file error
pub fn generate_report(options: &ReportOptions) -> OutputResult<ReportSummary> {
    check_identifier(&options.table)?;
    if options.columns.is_empty() {
        return Err(OutputError::InvalidIdentifier(
            "no columns selected".to_string(),
        ));
    }
    for column in &options.columns {
        check_identifier(column)?;
    }
    let group_indices = options
        .group_by
        .iter()
        .map(|group| {
            options
                .columns
                .iter()
                .position(|c| c == group)
                .ok_or_else(|| OutputError::UnknownColumn(group.clone()))
        })
        .collect::<OutputResult<Vec<usize>>>()?;

    let conn = Connection::open_with_flags(&options.db_name, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let quoted: Vec<String> = options
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect();
    let sql = format!("SELECT {} FROM \"{}\"", quoted.join(", "), options.table);
    tracing::debug!("Querying: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let stat_columns = StatColumns::locate(&options.columns);
    let mut stats = MonthlyStats::new();
    let mut writers: HashMap<String, csv::Writer<File>> = HashMap::new();
    let mut summary = ReportSummary::default();

    while let Some(row) = rows.next()? {
        let values = (0..options.columns.len())
            .map(|i| row.get_ref(i))
            .collect::<rusqlite::Result<Vec<ValueRef<'_>>>>()?;
        let cells: Vec<String> = values.iter().map(|v| render_value(*v)).collect();

        let group = group_indices
            .iter()
            .map(|&i| cells[i].as_str())
            .collect::<Vec<_>>()
            .join(",");

        if !writers.contains_key(&group) {
            let path = options.group_file(&group);
            tracing::info!("Writing group '{}' to {}", group, path.display());
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(&options.columns)?;
            writers.insert(group.clone(), writer);
            summary.files.push(path);
        }
        if let Some(writer) = writers.get_mut(&group) {
            writer.write_record(&cells)?;
        }

        stats.add(&group, &stat_columns.sample(&values));
        summary.rows += 1;
    }

    for writer in writers.values_mut() {
        writer.flush()?;
    }

    let stats_path = options.stats_file();
    let mut writer = csv::Writer::from_path(&stats_path)?;
    writer.write_record(stats.header())?;
    for row in stats.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    summary.files.push(stats_path);

    summary.groups = stats.groups.keys().cloned().collect();
    tracing::info!(
        "Exported {} rows in {} groups from '{}'",
        summary.rows,
        summary.groups.len(),
        options.table
    );
    Ok(summary)
}
