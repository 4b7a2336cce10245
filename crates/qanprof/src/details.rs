//! Details of the selected query
//!
//! Resolves what the operator picked in a profile (the aggregate row or one
//! query) into a details payload, and derives the identity the explain and
//! table metadata lookups need: the query id, its database and the tables it
//! references. Table references can be edited by the operator; edits are
//! pushed to the backend without waiting for the outcome to matter.

use crate::api::{QanApi, QueryDetails, TableRef};
use crate::error::Result;
use crate::explain::ExampleQuery;
use crate::params::{Selection, ViewParameters};
use crate::profile::SessionError;

/// Which query the explain and table lookups are about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryIdentity {
    pub query_id: String,
    pub database: Option<String>,
    /// Unique, in the order the backend or the operator added them
    pub tables: Vec<TableRef>,
}

impl QueryIdentity {
    /// `None` for summary payloads, which describe no single query
    pub fn from_details(details: &QueryDetails) -> Option<Self> {
        let query = details.query.as_ref()?;

        let mut tables: Vec<TableRef> = Vec::with_capacity(query.tables.len());
        for table in &query.tables {
            if !tables.contains(table) {
                tables.push(table.clone());
            }
        }

        let database = details
            .example
            .as_ref()
            .map(|e| e.db.clone())
            .filter(|db| !db.is_empty())
            .or_else(|| tables.first().map(|t| t.database.clone()))
            .filter(|db| !db.is_empty());

        Some(QueryIdentity {
            query_id: query.id.clone(),
            database,
            tables,
        })
    }

    pub fn database_name(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    /// Table shown when the operator has not picked one: the first table's
    /// name in the query's database
    pub fn default_table(&self) -> Option<TableRef> {
        let first = self.tables.first()?;
        let database = self.database.as_deref().unwrap_or(&first.database);
        Some(TableRef::new(database, &first.table))
    }

    /// Returns false if the table was already referenced
    pub fn insert_table(&mut self, table: TableRef) -> bool {
        if self.tables.contains(&table) {
            return false;
        }
        self.tables.push(table);
        true
    }

    /// Returns false if the table was not referenced
    pub fn remove_table(&mut self, table: &TableRef) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| t != table);
        self.tables.len() != before
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Summary(QueryDetails),
    Query {
        details: QueryDetails,
        identity: QueryIdentity,
        example: Option<ExampleQuery>,
    },
}

pub struct DetailsLoader<'a, A> {
    api: &'a A,
}

impl<'a, A: QanApi> DetailsLoader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        DetailsLoader { api }
    }

    /// Load the server summary or the selected query's details
    pub async fn load(&self, params: &ViewParameters) -> std::result::Result<DetailView, SessionError> {
        let query_id = match params.selection() {
            Selection::Summary => None,
            Selection::Query(id) => Some(id),
        };

        let details = self
            .api
            .fetch_query_details(&params.host, query_id.as_deref(), params.from, params.to)
            .await
            .map_err(|e| {
                log::warn!(
                    "Details request for {} ({}) failed: {}",
                    params.host,
                    query_id.as_deref().unwrap_or("summary"),
                    e
                );
                SessionError::Transport(e.to_string())
            })?;

        if query_id.is_none() {
            return Ok(DetailView::Summary(details));
        }

        let Some(identity) = QueryIdentity::from_details(&details) else {
            return Err(SessionError::Domain(
                "Query details response has no query".to_string(),
            ));
        };
        let example = ExampleQuery::from_example(details.example.as_ref(), identity.database_name());

        Ok(DetailView::Query {
            details,
            identity,
            example,
        })
    }
}

/// Parse `input` as `` `db`.`table` ``, add it to `identity` and push the new
/// set to the backend. Returns the parsed table.
pub async fn add_table<A: QanApi>(
    api: &A,
    identity: &mut QueryIdentity,
    input: &str,
) -> Result<TableRef> {
    let table = TableRef::parse(input)?;
    if identity.insert_table(table.clone()) {
        push_tables(api, identity).await;
    }
    Ok(table)
}

/// Remove `table` from `identity` and push the new set to the backend
pub async fn remove_table<A: QanApi>(api: &A, identity: &mut QueryIdentity, table: &TableRef) -> bool {
    let removed = identity.remove_table(table);
    if removed {
        push_tables(api, identity).await;
    }
    removed
}

async fn push_tables<A: QanApi>(api: &A, identity: &QueryIdentity) {
    if let Err(e) = api.update_tables(&identity.query_id, &identity.tables).await {
        log::warn!(
            "Failed to store tables for query {}: {}",
            identity.query_id,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::api::{Example, QueryInfo};
    use chrono::{TimeZone, Utc};

    fn details(example_db: &str, tables: Vec<TableRef>) -> QueryDetails {
        QueryDetails {
            instance_id: "a7725644598849416ef6aa1272373452".to_string(),
            query: Some(QueryInfo {
                id: "E477191F9BF35C18".to_string(),
                fingerprint: "select c from sbtest3 where id = ?".to_string(),
                tables,
                ..Default::default()
            }),
            example: Some(Example {
                query: "select c from sbtest3 where id = 7".to_string(),
                size: 0,
                db: example_db.to_string(),
            }),
            ..Default::default()
        }
    }

    fn params(query_id: Option<&str>) -> ViewParameters {
        ViewParameters::new(
            "a7725644598849416ef6aa1272373452",
            Utc.timestamp_millis_opt(1537248810919).unwrap(),
            Utc.timestamp_millis_opt(1537292010920).unwrap(),
        )
        .with_query(query_id)
    }

    #[test]
    fn test_identity_prefers_example_database() {
        let d = details("sbtest", vec![TableRef::new("other", "sbtest3")]);
        let identity = QueryIdentity::from_details(&d).unwrap();
        assert_eq!(identity.database.as_deref(), Some("sbtest"));
        assert_eq!(identity.default_table(), Some(TableRef::new("sbtest", "sbtest3")));
    }

    #[test]
    fn test_identity_falls_back_to_first_table() {
        let d = details(
            "",
            vec![
                TableRef::new("sakila", "film"),
                TableRef::new("sakila", "actor"),
                TableRef::new("sakila", "film"),
            ],
        );
        let identity = QueryIdentity::from_details(&d).unwrap();
        assert_eq!(identity.database.as_deref(), Some("sakila"));
        assert_eq!(identity.tables.len(), 2);
        assert_eq!(identity.default_table(), Some(TableRef::new("sakila", "film")));

        let identity = QueryIdentity::from_details(&details("", vec![])).unwrap();
        assert_eq!(identity.database, None);
        assert_eq!(identity.database_name(), "");
        assert_eq!(identity.default_table(), None);
    }

    #[test]
    fn test_summary_has_no_identity() {
        assert_eq!(QueryIdentity::from_details(&QueryDetails::default()), None);
    }

    #[tokio::test]
    async fn test_load_summary_for_total() {
        let api = FakeApi::default();
        *api.details.borrow_mut() = Some(QueryDetails::default());

        let view = DetailsLoader::new(&api).load(&params(None)).await.unwrap();
        assert!(matches!(view, DetailView::Summary(_)));
        assert_eq!(api.details_requests.borrow()[0], None);
    }

    #[tokio::test]
    async fn test_load_query_details() {
        let api = FakeApi::default();
        *api.details.borrow_mut() = Some(details("sbtest", vec![]));

        let view = DetailsLoader::new(&api)
            .load(&params(Some("E477191F9BF35C18")))
            .await
            .unwrap();
        match view {
            DetailView::Query {
                identity, example, ..
            } => {
                assert_eq!(identity.query_id, "E477191F9BF35C18");
                let example = example.unwrap();
                assert_eq!(example.database, "sbtest");
                assert!(!example.is_truncated());
            }
            other => panic!("expected query details, got {other:?}"),
        }
        assert_eq!(
            api.details_requests.borrow()[0].as_deref(),
            Some("E477191F9BF35C18")
        );
    }

    #[tokio::test]
    async fn test_load_failure_is_transport_error() {
        let api = FakeApi::default();
        let err = DetailsLoader::new(&api)
            .load(&params(Some("E477191F9BF35C18")))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_tables() {
        let api = FakeApi::default();
        let mut identity = QueryIdentity::from_details(&details("sbtest", vec![])).unwrap();

        let added = add_table(&api, &mut identity, "`sbtest`.`sbtest3`").await.unwrap();
        assert_eq!(added, TableRef::new("sbtest", "sbtest3"));
        // Adding twice does not push again
        add_table(&api, &mut identity, "sbtest.sbtest3").await.unwrap();
        assert_eq!(identity.tables, vec![added.clone()]);
        assert_eq!(api.updated_tables.borrow().len(), 1);

        assert!(add_table(&api, &mut identity, "t").await.is_err());

        assert!(remove_table(&api, &mut identity, &added).await);
        assert!(!remove_table(&api, &mut identity, &added).await);
        let updates = api.updated_tables.borrow();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1], ("E477191F9BF35C18".to_string(), vec![]));
    }

    #[tokio::test]
    async fn test_failed_push_is_not_an_error() {
        let api = FakeApi::default();
        api.fail_updates.set(true);
        let mut identity = QueryIdentity::from_details(&details("sbtest", vec![])).unwrap();

        let added = add_table(&api, &mut identity, "`sbtest`.`sbtest3`").await;
        assert!(added.is_ok());
        assert_eq!(identity.tables.len(), 1);
    }
}
