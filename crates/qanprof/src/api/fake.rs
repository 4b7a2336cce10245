//! In-memory `QanApi` used by unit tests

use super::QanApi;
use super::types::{
    CommandReply, ProfileEntry, ProfilePage, ProfileRequest, QueryDetails, TableInfoMap, TableRef,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

fn refused() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

/// Canned responses; `None` means the transport fails.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub pages: RefCell<VecDeque<Option<ProfilePage>>>,
    pub profile_requests: RefCell<Vec<ProfileRequest>>,
    pub details: RefCell<Option<QueryDetails>>,
    pub details_requests: RefCell<Vec<Option<String>>>,
    pub explain: RefCell<Option<CommandReply>>,
    pub explain_calls: Cell<usize>,
    pub table_info: RefCell<Option<TableInfoMap>>,
    pub table_info_calls: Cell<usize>,
    pub updated_tables: RefCell<Vec<(String, Vec<TableRef>)>>,
    pub fail_updates: Cell<bool>,
}

impl FakeApi {
    pub fn with_pages(pages: Vec<Option<ProfilePage>>) -> Self {
        FakeApi {
            pages: RefCell::new(pages.into()),
            ..Default::default()
        }
    }
}

/// Build a page of `rows` entries: an aggregate row followed by ranked queries
/// starting at `first_rank`.
pub(crate) fn page(total: u64, rows: usize, first_rank: u32) -> ProfilePage {
    let queries = (0..rows)
        .map(|i| {
            if i == 0 {
                ProfileEntry::default()
            } else {
                entry(first_rank + i as u32 - 1)
            }
        })
        .collect();
    ProfilePage {
        total_queries: total,
        queries,
        error: String::new(),
    }
}

pub(crate) fn entry(rank: u32) -> ProfileEntry {
    ProfileEntry {
        abstract_text: format!("SELECT t{}", rank),
        fingerprint: format!("select * from t{} where id = ?", rank),
        id: format!("{:016X}", rank),
        rank,
        ..Default::default()
    }
}

impl QanApi for FakeApi {
    async fn fetch_profile(&self, request: &ProfileRequest) -> Result<ProfilePage> {
        self.profile_requests.borrow_mut().push(request.clone());
        self.pages
            .borrow_mut()
            .pop_front()
            .flatten()
            .ok_or_else(refused)
    }

    async fn fetch_query_details(
        &self,
        _instance_id: &str,
        query_id: Option<&str>,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<QueryDetails> {
        self.details_requests
            .borrow_mut()
            .push(query_id.map(str::to_string));
        self.details.borrow().clone().ok_or_else(refused)
    }

    async fn fetch_explain(
        &self,
        _agent_id: &str,
        _instance_id: &str,
        _database: &str,
        _query: &str,
    ) -> Result<CommandReply> {
        self.explain_calls.set(self.explain_calls.get() + 1);
        self.explain.borrow().clone().ok_or_else(refused)
    }

    async fn fetch_table_info(
        &self,
        _agent_id: &str,
        _instance_id: &str,
        _database: &str,
        _table: &str,
    ) -> Result<TableInfoMap> {
        self.table_info_calls.set(self.table_info_calls.get() + 1);
        self.table_info.borrow().clone().ok_or_else(refused)
    }

    async fn update_tables(&self, query_id: &str, tables: &[TableRef]) -> Result<()> {
        if self.fail_updates.get() {
            return Err(refused());
        }
        self.updated_tables
            .borrow_mut()
            .push((query_id.to_string(), tables.to_vec()));
        Ok(())
    }
}
