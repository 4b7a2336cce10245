//! View parameters and the reload decision.
//!
//! A `ViewParameters` value is an immutable snapshot of what the operator is
//! looking at: which instance, which time window, and which filter. Every
//! navigation produces a new snapshot; the profile loader compares the new
//! one with the last one it loaded to decide whether a refetch is needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query id the backend uses for the aggregate row of a profile.
pub const TOTAL_QUERY_ID: &str = "TOTAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewParameters {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub timezone: String,
    /// Monitored instance id
    pub host: String,
    pub search: Option<String>,
    pub query_id: Option<String>,
    pub first_seen_only: Option<bool>,
}

/// What the details view should show for a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Summary,
    Query(String),
}

impl ViewParameters {
    pub fn new(host: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        ViewParameters {
            from,
            to,
            timezone: "utc".to_string(),
            host: host.into(),
            search: None,
            query_id: None,
            first_seen_only: None,
        }
    }

    /// Snapshot with a new search filter. Empty text removes the filter, and
    /// the query selection is always dropped.
    pub fn with_search(&self, text: Option<&str>) -> Self {
        let search = text
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        ViewParameters {
            search,
            query_id: None,
            ..self.clone()
        }
    }

    /// Snapshot selecting one profiled query; `None` selects the aggregate row.
    pub fn with_query(&self, query_id: Option<&str>) -> Self {
        ViewParameters {
            query_id: Some(query_id.unwrap_or(TOTAL_QUERY_ID).to_string()),
            ..self.clone()
        }
    }

    pub fn selection(&self) -> Selection {
        match self.query_id.as_deref() {
            None | Some(TOTAL_QUERY_ID) => Selection::Summary,
            Some(id) => Selection::Query(id.to_string()),
        }
    }
}

/// Decide whether a profile must be refetched for `current`.
///
/// Only the instance, the time window, the search text and the timezone
/// matter. Selecting a query or toggling first-seen filtering reuses the
/// loaded profile.
pub fn should_reload(previous: Option<&ViewParameters>, current: &ViewParameters) -> bool {
    let Some(prev) = previous else {
        return true;
    };

    prev.host != current.host
        || prev.from != current.from
        || prev.to != current.to
        || prev.search != current.search
        || prev.timezone != current.timezone
}
