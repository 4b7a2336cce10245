//! Wire types of the query analytics API.
//!
//! Field names follow the backend's JSON. Numeric fields the backend omits
//! default to zero and `null` lists default to empty, so a partially filled
//! payload is accepted while a structurally wrong one is rejected at decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::params::ViewParameters;

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Latency statistics of one profile entry, in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Stats {
    pub avg: f64,
    #[serde(rename = "Cnt")]
    pub count: u64,
    pub max: f64,
    #[serde(rename = "Med")]
    pub median: f64,
    pub min: f64,
    pub p5: f64,
    pub p95: f64,
    pub sum: f64,
}

/// One point of an entry's sparkline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimePoint {
    #[serde(rename = "Point")]
    pub index: u32,
    #[serde(rename = "NoData")]
    pub no_data: bool,
    #[serde(rename = "Query_count")]
    pub count: f64,
    #[serde(rename = "Query_load")]
    pub load: f64,
    #[serde(rename = "Query_time_avg")]
    pub avg_time: f64,
    #[serde(rename = "Start_ts")]
    pub window_start: DateTime<Utc>,
}

impl TimePoint {
    pub fn has_data(&self) -> bool {
        !self.no_data
    }
}

/// A ranked query fingerprint. Rank 0 is the aggregate row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ProfileEntry {
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    pub fingerprint: String,
    pub first_seen: DateTime<Utc>,
    pub id: String,
    pub load: f64,
    pub percentage: f64,
    #[serde(rename = "QPS")]
    pub qps: f64,
    pub rank: u32,
    #[serde(rename = "Log", deserialize_with = "null_as_default")]
    pub time_series: Vec<TimePoint>,
    pub stats: Stats,
}

impl ProfileEntry {
    pub fn is_aggregate(&self) -> bool {
        self.rank == 0 && self.id.is_empty()
    }
}

/// One page of a profile as returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePage {
    #[serde(rename = "TotalQueries")]
    pub total_queries: u64,
    #[serde(rename = "Query", deserialize_with = "null_as_default")]
    pub queries: Vec<ProfileEntry>,
    #[serde(rename = "Error", deserialize_with = "null_as_default")]
    pub error: String,
}

/// Filter for one profile page
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRequest {
    pub instance_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub offset: u64,
    pub search: Option<String>,
}

impl ProfileRequest {
    pub fn page(params: &ViewParameters, offset: u64) -> Self {
        ProfileRequest {
            instance_id: params.host.clone(),
            from: params.from,
            to: params.to,
            offset,
            search: params.search.clone(),
        }
    }
}

/// A `db`.`table` pair a query touches
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(rename = "Db")]
    pub database: String,
    #[serde(rename = "Table")]
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        TableRef {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Parse operator input such as `` `sakila`.`film` `` or `sakila.film`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        // Anything shorter cannot hold two quoted names and a dot
        if input.len() <= 6 {
            return Err(Error::InvalidArgument(format!(
                "Table reference '{}' is too short, expected `db`.`table`",
                input
            )));
        }

        let Some((db, table)) = input.split_once('.') else {
            return Err(Error::InvalidArgument(format!(
                "Table reference '{}' has no database part, expected `db`.`table`",
                input
            )));
        };

        let db = db.replace('`', "");
        let table = table.replace('`', "");
        if db.is_empty() || table.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Table reference '{}' has an empty name",
                input
            )));
        }

        Ok(TableRef::new(db, table))
    }

    /// Key the backend uses in table info responses
    pub fn key(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    pub fn quoted(&self) -> String {
        format!("`{}`.`{}`", self.database, self.table)
    }

    pub fn is_selected(&self, selection: &str) -> bool {
        self.quoted() == selection
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.quoted())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QueryInfo {
    pub id: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    pub fingerprint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tables: Vec<TableRef>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A real query captured for a fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Example {
    pub query: String,
    /// Size of the query before the agent truncated it, in bytes
    pub size: u64,
    pub db: String,
}

/// Details of one query, or the server summary when `query` is absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDetails {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "Query")]
    pub query: Option<QueryInfo>,
    #[serde(rename = "Example")]
    pub example: Option<Example>,
    #[serde(rename = "Metrics2")]
    pub metrics: serde_json::Value,
    #[serde(rename = "Sparks2")]
    pub sparks: serde_json::Value,
}

/// Reply to an agent command. `data` is base64 encoded JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandReply {
    #[serde(rename = "Data", deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(rename = "Error", deserialize_with = "null_as_default")]
    pub error: String,
}

/// Metadata of one table as collected by the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TableInfo {
    pub create: String,
    pub index: serde_json::Value,
    pub status: serde_json::Value,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

/// Table info keyed by `db.table`
pub type TableInfoMap = BTreeMap<String, TableInfo>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_page_decode() {
        let json = r#"{
            "TotalQueries": 23,
            "Query": [
                {"Abstract": "", "Fingerprint": "", "FirstSeen": "0001-01-01T00:00:00Z", "Id": "",
                 "Load": 0.35, "Log": [{"NoData": false, "Point": 0, "Query_count": 2395,
                 "Query_load": 6.18, "Query_time_avg": 2.0, "Start_ts": "2018-07-26T13:01:23Z"}],
                 "Percentage": 1, "QPS": 0.34, "Rank": 0,
                 "Stats": {"Avg": 1.01, "Cnt": 14985, "Max": 13.06, "Med": 1.06, "Min": 0.1,
                           "P5": 0, "P95": 2.81, "Sum": 15282.58}},
                {"Abstract": "INSERT sbtest3", "Fingerprint": "INSERT sbtest3",
                 "FirstSeen": "2018-07-26T12:23:00Z", "Id": "20d0ff1066870382aaeb206cad4689b5",
                 "Load": 0.04, "Log": null, "Percentage": 0.12, "QPS": 0.04, "Rank": 1}
            ]
        }"#;

        let page: ProfilePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_queries, 23);
        assert_eq!(page.queries.len(), 2);
        assert!(page.error.is_empty());

        let total = &page.queries[0];
        assert!(total.is_aggregate());
        assert_eq!(total.stats.count, 14985);
        assert_eq!(total.time_series.len(), 1);
        assert!(total.time_series[0].has_data());

        let insert = &page.queries[1];
        assert!(!insert.is_aggregate());
        assert!(insert.time_series.is_empty());
        assert_eq!(insert.stats, Stats::default());
    }

    #[test]
    fn test_profile_page_rejects_wrong_shape() {
        let json = r#"{"TotalQueries": "many", "Query": []}"#;
        assert!(serde_json::from_str::<ProfilePage>(json).is_err());
    }

    #[test]
    fn test_query_details_null_tables() {
        let json = r#"{
            "InstanceId": "a7725644598849416ef6aa1272373452",
            "Query": {"Id": "E477191F9BF35C18", "Fingerprint": "select * from t", "Tables": null,
                      "FirstSeen": "2018-07-26T12:23:00Z", "LastSeen": "2018-07-26T13:23:00Z"},
            "Example": {"Query": "select * from t where id = 1", "Size": 0, "Db": "sbtest"}
        }"#;

        let details: QueryDetails = serde_json::from_str(json).unwrap();
        let query = details.query.unwrap();
        assert!(query.tables.is_empty());
        assert_eq!(details.example.unwrap().db, "sbtest");
    }

    #[test]
    fn test_table_ref_parse() {
        let t = TableRef::parse("`sakila`.`film`").unwrap();
        assert_eq!(t, TableRef::new("sakila", "film"));
        assert_eq!(t.quoted(), "`sakila`.`film`");
        assert_eq!(t.key(), "sakila.film");
        assert!(t.is_selected("`sakila`.`film`"));

        assert_eq!(
            TableRef::parse("sbtest.sbtest3").unwrap(),
            TableRef::new("sbtest", "sbtest3")
        );
        assert!(TableRef::parse("a.b").is_err());
        assert!(TableRef::parse("nodotatall").is_err());
        assert!(TableRef::parse("``.`film`").is_err());
    }
}
