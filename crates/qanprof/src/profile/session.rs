use crate::api::ProfileEntry;
use crate::params::ViewParameters;
use thiserror::Error;

/// Rows the backend returns per profile page
pub const PAGE_SIZE: u64 = 10;

/// Shown when a fetch fails without the backend saying why
pub const NO_DATA_MESSAGE: &str =
    "No data. Please check monitoring client and database configurations on selected instance.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Failure of a profile or details operation, as shown to the operator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend answered and reported an error of its own
    #[error("{0}")]
    Domain(String),

    /// Network or decode failure; the detail is only logged
    #[error("{}", NO_DATA_MESSAGE)]
    Transport(String),

    #[error("Profile is not loaded")]
    NotReady,

    #[error("All {0} matching queries are already loaded")]
    Exhausted(u64),
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Domain(message) => crate::Error::Backend(message),
            other => crate::Error::NoData(other.to_string()),
        }
    }
}

/// Paginated profile for one set of view parameters
#[derive(Debug, Clone, Default)]
pub struct ProfileSession {
    pub(super) offset: u64,
    pub(super) total: u64,
    pub(super) entries: Vec<ProfileEntry>,
    pub(super) last_error: Option<SessionError>,
    pub(super) state: LoadState,
    pub(super) params: Option<ViewParameters>,
}

impl ProfileSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn reset(&mut self, params: &ViewParameters) {
        self.offset = 0;
        self.total = 0;
        self.entries.clear();
        self.last_error = None;
        self.params = Some(params.clone());
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page_size(&self) -> u64 {
        PAGE_SIZE
    }

    /// Number of queries matching the filter, as reported by the first page
    pub fn total_matching(&self) -> u64 {
        self.total
    }

    /// All rows in rank order, aggregate row first
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    /// The aggregate "total" row, if one is loaded
    pub fn aggregate(&self) -> Option<&ProfileEntry> {
        self.entries.first()
    }

    /// Loaded rows excluding the aggregate row
    pub fn queries(&self) -> &[ProfileEntry] {
        self.entries.get(1..).unwrap_or_default()
    }

    pub fn loaded_count(&self) -> u64 {
        self.entries.len().saturating_sub(1) as u64
    }

    /// Matching queries not loaded yet
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.loaded_count())
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Parameters of the last `load`
    pub fn params(&self) -> Option<&ViewParameters> {
        self.params.as_ref()
    }
}
