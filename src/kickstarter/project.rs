//! The `projects` table and the row stored for each finished project

use crate::kickstarter::json::ProjectJson;
use crate::storage::{Record, SqlValue, TableDef};
use crate::SpiderError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Name of the table project rows are written to
pub const PROJECTS_TABLE: &str = "projects";

/// Definition of the `projects` table
pub fn projects_table() -> TableDef {
    TableDef::new(PROJECTS_TABLE)
        .column("id", "INTEGER PRIMARY KEY")
        .column("name", "TEXT NOT NULL")
        .column("desc", "TEXT")
        .column("goal", "REAL NOT NULL")
        .column("pledged", "REAL NOT NULL")
        .column("usd_rate", "REAL")
        .column("currency", "TEXT NOT NULL")
        .column("country", "TEXT NOT NULL")
        .column("backers_count", "INTEGER")
        .column("created_at", "TIMESTAMP NOT NULL")
        .column("launched_at", "TIMESTAMP NOT NULL")
        .column("deadline", "TIMESTAMP NOT NULL")
        .column("category", "TEXT")
        .column("slug", "TEXT")
        .column("url", "TEXT")
}

/// One row of the `projects` table
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub desc: Option<String>,
    pub goal: f64,
    pub pledged: f64,
    pub usd_rate: Option<f64>,
    pub currency: String,
    pub country: String,
    pub backers_count: i64,
    pub created_at: DateTime<Utc>,
    pub launched_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub category: Option<String>,
    pub slug: Option<String>,
    pub url: String,
}

fn timestamp(url: &str, field: &str, secs: i64) -> Result<DateTime<Utc>, SpiderError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| SpiderError::Parse {
            url: url.to_string(),
            message: format!("{} out of range: {}", field, secs),
        })
}

fn to_text(time: &DateTime<Utc>) -> SqlValue {
    SqlValue::Text(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl TryFrom<&ProjectJson> for ProjectRow {
    type Error = SpiderError;

    fn try_from(project: &ProjectJson) -> Result<Self, Self::Error> {
        let url = project.urls.web.project.clone();
        Ok(Self {
            id: project.id,
            name: project.name.clone(),
            desc: project.blurb.clone(),
            goal: project.goal,
            pledged: project.pledged,
            usd_rate: project.static_usd_rate,
            currency: project.currency.clone(),
            country: project.country.clone(),
            backers_count: project.backers_count,
            created_at: timestamp(&url, "created_at", project.created_at)?,
            launched_at: timestamp(&url, "launched_at", project.launched_at)?,
            deadline: timestamp(&url, "deadline", project.deadline)?,
            category: project.category.as_ref().map(|c| c.name.clone()),
            slug: project.category.as_ref().map(|c| c.slug.clone()),
            url,
        })
    }
}

impl Record for ProjectRow {
    fn table(&self) -> &str {
        PROJECTS_TABLE
    }

    fn columns(&self) -> Vec<(&str, SqlValue)> {
        vec![
            ("id", SqlValue::Integer(self.id)),
            ("name", SqlValue::Text(self.name.clone())),
            ("desc", self.desc.clone().into()),
            ("goal", SqlValue::Real(self.goal)),
            ("pledged", SqlValue::Real(self.pledged)),
            ("usd_rate", self.usd_rate.into()),
            ("currency", SqlValue::Text(self.currency.clone())),
            ("country", SqlValue::Text(self.country.clone())),
            ("backers_count", SqlValue::Integer(self.backers_count)),
            ("created_at", to_text(&self.created_at)),
            ("launched_at", to_text(&self.launched_at)),
            ("deadline", to_text(&self.deadline)),
            ("category", self.category.clone().into()),
            ("slug", self.slug.clone().into()),
            ("url", SqlValue::Text(self.url.clone())),
        ]
    }
}
