use super::QanApi;
use super::types::{CommandReply, ProfilePage, ProfileRequest, QueryDetails, TableInfoMap, TableRef};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Timestamp format the backend expects for `begin`/`end`
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Command sent to an agent through the API
#[derive(Serialize)]
struct AgentCommand<'a> {
    #[serde(rename = "AgentUUID")]
    agent_id: &'a str,
    #[serde(rename = "Service")]
    service: &'a str,
    #[serde(rename = "Cmd")]
    cmd: &'a str,
    #[serde(rename = "Data")]
    data: String,
}

#[derive(Serialize)]
struct ExplainData<'a> {
    #[serde(rename = "UUID")]
    instance_id: &'a str,
    #[serde(rename = "Db")]
    database: &'a str,
    #[serde(rename = "Query")]
    query: &'a str,
}

#[derive(Serialize)]
struct TableInfoData<'a> {
    #[serde(rename = "UUID")]
    instance_id: &'a str,
    #[serde(rename = "Create")]
    create: [&'a TableRef; 1],
    #[serde(rename = "Index")]
    index: [&'a TableRef; 1],
    #[serde(rename = "Status")]
    status: [&'a TableRef; 1],
}

/// HTTP client for the query analytics API
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn agent_command<T: Serialize>(
        &self,
        agent_id: &str,
        cmd: &str,
        data: &T,
    ) -> Result<CommandReply> {
        let command = AgentCommand {
            agent_id,
            service: "qan",
            cmd,
            data: STANDARD.encode(serde_json::to_vec(data)?),
        };

        log::debug!("Sending {} command to agent {}", cmd, agent_id);
        let reply = self
            .client
            .put(self.url(&format!("agents/{}/cmd", agent_id)))
            .json(&command)
            .send()
            .await?
            .error_for_status()?
            .json::<CommandReply>()
            .await?;
        Ok(reply)
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

impl QanApi for HttpApi {
    async fn fetch_profile(&self, request: &ProfileRequest) -> Result<ProfilePage> {
        let mut query = vec![
            ("begin", format_time(request.from)),
            ("end", format_time(request.to)),
            ("offset", request.offset.to_string()),
        ];
        if let Some(search) = &request.search {
            query.push(("search", STANDARD.encode(search)));
        }

        log::debug!(
            "Fetching profile of {} at offset {}",
            request.instance_id,
            request.offset
        );
        let page = self
            .client
            .get(self.url(&format!("qan/profile/{}", request.instance_id)))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<ProfilePage>()
            .await?;
        Ok(page)
    }

    async fn fetch_query_details(
        &self,
        instance_id: &str,
        query_id: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<QueryDetails> {
        let path = match query_id {
            Some(id) => format!("qan/report/{}/query/{}", instance_id, id),
            None => format!("qan/report/{}/server-summary", instance_id),
        };

        let details = self
            .client
            .get(self.url(&path))
            .query(&[
                ("begin", format_time(from)),
                ("end", format_time(to)),
                ("instance_uuid", instance_id.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<QueryDetails>()
            .await?;
        Ok(details)
    }

    async fn fetch_explain(
        &self,
        agent_id: &str,
        instance_id: &str,
        database: &str,
        query: &str,
    ) -> Result<CommandReply> {
        let data = ExplainData {
            instance_id,
            database,
            query,
        };
        self.agent_command(agent_id, "Explain", &data).await
    }

    async fn fetch_table_info(
        &self,
        agent_id: &str,
        instance_id: &str,
        database: &str,
        table: &str,
    ) -> Result<TableInfoMap> {
        let table = TableRef::new(database, table);
        let data = TableInfoData {
            instance_id,
            create: [&table],
            index: [&table],
            status: [&table],
        };

        let reply = self.agent_command(agent_id, "TableInfo", &data).await?;
        if !reply.error.is_empty() {
            return Err(Error::Backend(reply.error));
        }

        let decoded = STANDARD.decode(reply.data.as_bytes())?;
        Ok(serde_json::from_slice(&decoded)?)
    }

    async fn update_tables(&self, query_id: &str, tables: &[TableRef]) -> Result<()> {
        self.client
            .put(self.url(&format!("queries/{}/tables", query_id)))
            .json(tables)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
