//! Payload types of the Kickstarter discover API
//!
//! Only the fields the scraper stores are relied upon; everything is
//! defaulted so a sparse project still decodes.

use serde::Deserialize;

/// One page of `GET /discover/categories/{slug}?format=json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectsPage {
    pub projects: Vec<ProjectJson>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectJson {
    pub id: i64,
    pub name: String,
    pub blurb: Option<String>,
    pub goal: f64,
    pub pledged: f64,
    pub state: String,
    pub country: String,
    pub currency: String,

    /// Unix seconds
    pub deadline: i64,
    pub created_at: i64,
    pub launched_at: i64,

    pub staff_pick: bool,
    pub backers_count: i64,
    pub static_usd_rate: Option<f64>,
    pub usd_pledged: Option<String>,
    pub creator: Option<CreatorJson>,
    pub location: Option<LocationJson>,
    pub category: Option<CategoryJson>,
    pub urls: UrlsJson,
}

impl ProjectJson {
    /// Live projects are still collecting pledges and are not stored
    pub fn is_live(&self) -> bool {
        self.state == "live"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreatorJson {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationJson {
    pub id: i64,
    pub name: String,
    pub displayable_name: String,
    pub country: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryJson {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UrlsJson {
    pub web: WebUrlsJson,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebUrlsJson {
    pub project: String,
    pub rewards: String,
}
