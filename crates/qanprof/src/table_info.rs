//! Table metadata for the tables a query touches
//!
//! The agent runs `SHOW CREATE TABLE`, `SHOW INDEX FROM` and `SHOW TABLE
//! STATUS` in one command. Each statement can fail on its own, and its error
//! string starts with the statement text, which is how errors are attributed.

use crate::api::{QanApi, TableRef};
use serde::Serialize;
use serde_json::Value;

const STATUS_PREFIX: &str = "SHOW TABLE STATUS";
const INDEX_PREFIX: &str = "SHOW INDEX FROM";
const CREATE_PREFIX: &str = "SHOW CREATE TABLE";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableMetadata {
    pub create_statement: String,
    pub indexes: Value,
    pub status: Value,
}

/// Per-statement errors. Strings matching none of the statements are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableErrors {
    pub status: Option<String>,
    pub index: Option<String>,
    pub create: Option<String>,
}

impl TableErrors {
    pub fn partition<S: AsRef<str>>(errors: &[S]) -> Self {
        let mut slots = TableErrors::default();
        for err in errors {
            let err = err.as_ref();
            if err.starts_with(STATUS_PREFIX) {
                slots.status = Some(err.to_string());
            } else if err.starts_with(INDEX_PREFIX) {
                slots.index = Some(err.to_string());
            } else if err.starts_with(CREATE_PREFIX) {
                slots.create = Some(err.to_string());
            } else {
                log::debug!("Dropping unattributed table error: {}", err);
            }
        }
        slots
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.index.is_none() && self.create.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TableMetadataResult {
    Ok(TableMetadata),
    Errors(TableErrors),
    /// No metadata at all: the request failed or the table was not in the reply
    Unavailable { detail: String },
}

pub struct TableMetadataResolver<'a, A> {
    api: &'a A,
}

impl<'a, A: QanApi> TableMetadataResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        TableMetadataResolver { api }
    }

    pub async fn resolve(
        &self,
        agent_id: &str,
        instance_id: &str,
        database: &str,
        table: &str,
    ) -> TableMetadataResult {
        let key = TableRef::new(database, table).key();

        let mut info = match self
            .api
            .fetch_table_info(agent_id, instance_id, database, table)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Table info request for {} failed: {}", key, e);
                return TableMetadataResult::Unavailable {
                    detail: e.to_string(),
                };
            }
        };

        let Some(info) = info.remove(&key) else {
            return TableMetadataResult::Unavailable {
                detail: format!("No table info for {} in response", key),
            };
        };

        if !info.errors.is_empty() {
            return TableMetadataResult::Errors(TableErrors::partition(&info.errors));
        }

        TableMetadataResult::Ok(TableMetadata {
            create_statement: info.create,
            indexes: info.index,
            status: info.status,
        })
    }

    pub async fn resolve_ref(
        &self,
        agent_id: &str,
        instance_id: &str,
        table: &TableRef,
    ) -> TableMetadataResult {
        self.resolve(agent_id, instance_id, &table.database, &table.table)
            .await
    }
}
