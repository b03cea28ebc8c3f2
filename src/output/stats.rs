//! Monthly funding statistics
//!
//! Projects are bucketed twice: by the month they launched (`start`) and by
//! the month of their deadline (`end`). Amounts are converted to USD with the
//! row's rate before averaging.

use std::collections::BTreeMap;

/// Running totals of one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bucket {
    pub count: u64,
    pub goal: f64,
    pub pledged: f64,
}

impl Bucket {
    fn add(&mut self, goal: f64, pledged: f64) {
        self.count += 1;
        self.goal += goal;
        self.pledged += pledged;
    }

    /// count, average goal, average pledged, pledged/goal ratio
    ///
    /// Empty buckets divide by zero and render as `NaN`.
    pub fn cells(&self) -> [String; 4] {
        let count = self.count as f64;
        [
            self.count.to_string(),
            format!("{:.1}", self.goal / count),
            format!("{:.1}", self.pledged / count),
            format!("{:.1}", self.pledged / self.goal),
        ]
    }
}

/// Launch-month and deadline-month buckets for one set of projects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyBuckets {
    pub start: [Bucket; 12],
    pub end: [Bucket; 12],
}

/// One project as seen by the statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Goal in USD
    pub goal: f64,
    /// Pledged amount in USD
    pub pledged: f64,
    /// Zero-based launch month
    pub start_month: Option<usize>,
    /// Zero-based deadline month
    pub end_month: Option<usize>,
}

impl MonthlyBuckets {
    fn add(&mut self, sample: &Sample) {
        if let Some(month) = sample.start_month {
            self.start[month].add(sample.goal, sample.pledged);
        }
        if let Some(month) = sample.end_month {
            self.end[month].add(sample.goal, sample.pledged);
        }
    }

    fn cells(&self, month: usize) -> impl Iterator<Item = String> {
        let start = self.start[month].cells();
        let end = self.end[month].cells();
        start.into_iter().chain(end)
    }
}

/// Statistics over all projects and per group
#[derive(Debug, Default)]
pub struct MonthlyStats {
    pub overall: MonthlyBuckets,
    /// Sorted by group name
    pub groups: BTreeMap<String, MonthlyBuckets>,
}

impl MonthlyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one project to the overall and the group buckets
    pub fn add(&mut self, group: &str, sample: &Sample) {
        self.overall.add(sample);
        self.groups.entry(group.to_string()).or_default().add(sample);
    }

    /// Header row of the statistics CSV
    pub fn header(&self) -> Vec<String> {
        const STATS: [&str; 4] = ["count", "goal", "pledged", "ratio"];

        let mut header = vec!["month".to_string()];
        for side in ["start", "end"] {
            header.extend(STATS.iter().map(|stat| format!("{}-{}", stat, side)));
        }
        for group in self.groups.keys() {
            for side in ["start", "end"] {
                header.extend(STATS.iter().map(|stat| format!("{}-{}-{}", stat, side, group)));
            }
        }
        header
    }

    /// Data rows, one per calendar month `01` to `12`
    pub fn rows(&self) -> Vec<Vec<String>> {
        (0..12)
            .map(|month| {
                let mut row = vec![format!("{:02}", month + 1)];
                row.extend(self.overall.cells(month));
                for buckets in self.groups.values() {
                    row.extend(buckets.cells(month));
                }
                row
            })
            .collect()
    }
}
