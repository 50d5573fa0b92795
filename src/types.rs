use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category → count breakdown for one field (gender, country, ...).
/// Key order is irrelevant for equality; BTreeMap keeps iteration stable.
pub type Distribution = BTreeMap<String, u64>;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }

    /// Whether this role may change the sheet source or use Connect.
    pub fn can_edit_sheet(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event's record as read from the sheet. Distribution cells stay raw
/// text until the aggregation step parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventRow {
    pub id: String,
    pub registrations: u64,
    pub submissions: u64,
    pub teams: u64,
    pub page_visits: u64,
    pub gender: String,
    pub daily_registrations: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub occupation: String,
}

/// Reduction over a selected subset of event rows: summed counters plus one
/// merged distribution per breakdown field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedStats {
    pub registrations: u64,
    pub submissions: u64,
    pub teams: u64,
    pub page_visits: u64,
    pub gender: Distribution,
    pub daily_registrations: Distribution,
    pub country: Distribution,
    pub state: Distribution,
    pub city: Distribution,
    pub occupation: Distribution,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub role: Role,
}

/// Query params for the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsQueryParams {
    pub source_id: Option<String>,
    /// Comma-separated event ids. Absent or empty means "all events".
    pub ids: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQueryParams {
    pub source_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub source_id: String,
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Pasted sheet URL or bare sheet id.
    pub sheet: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub source_id: String,
    pub row_count: usize,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
