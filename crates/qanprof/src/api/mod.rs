//! Query analytics backend API
//!
//! `QanApi` is the seam between the core and the backend. `HttpApi` talks to
//! a real server; tests plug in their own implementation.

mod http;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpApi;
pub use types::{
    CommandReply, Example, ProfileEntry, ProfilePage, ProfileRequest, QueryDetails, QueryInfo,
    Stats, TableInfo, TableInfoMap, TableRef, TimePoint,
};

use crate::error::Result;
use chrono::{DateTime, Utc};

#[allow(async_fn_in_trait)]
pub trait QanApi {
    /// Fetch one page of the query profile
    async fn fetch_profile(&self, request: &ProfileRequest) -> Result<ProfilePage>;

    /// Fetch details of one query, or the server summary when `query_id` is `None`
    async fn fetch_query_details(
        &self,
        instance_id: &str,
        query_id: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<QueryDetails>;

    /// Ask the agent to EXPLAIN a query
    async fn fetch_explain(
        &self,
        agent_id: &str,
        instance_id: &str,
        database: &str,
        query: &str,
    ) -> Result<CommandReply>;

    /// Ask the agent for CREATE TABLE, indexes and status of a table
    async fn fetch_table_info(
        &self,
        agent_id: &str,
        instance_id: &str,
        database: &str,
        table: &str,
    ) -> Result<TableInfoMap>;

    /// Replace the table references stored for a query
    async fn update_tables(&self, query_id: &str, tables: &[TableRef]) -> Result<()>;
}
