//! EXPLAIN plans for example queries
//!
//! The agent answers an explain command with base64 encoded JSON holding a
//! classic (tabular) plan and a JSON plan. The JSON plan is sometimes a
//! string of JSON and sometimes an object, so it is decoded separately and a
//! failure there does not discard the classic plan.

use crate::api::{CommandReply, Example, QanApi};
use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNSUPPORTED_MESSAGE: &str = "This type of query is not supported for EXPLAIN";

/// An example query captured by the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleQuery {
    pub raw_text: String,
    /// Size before the agent truncated it, 0 when unknown
    pub original_size: u64,
    pub database: String,
}

impl ExampleQuery {
    pub fn new(raw_text: impl Into<String>, original_size: u64, database: impl Into<String>) -> Self {
        ExampleQuery {
            raw_text: raw_text.into(),
            original_size,
            database: database.into(),
        }
    }

    /// Build from a details payload; `None` when the example is missing or empty
    pub fn from_example(example: Option<&Example>, database: &str) -> Option<Self> {
        let example = example?;
        if example.query.is_empty() {
            return None;
        }
        Some(ExampleQuery::new(&example.query, example.size, database))
    }

    pub fn is_truncated(&self) -> bool {
        self.original_size > 0 && self.original_size > self.raw_text.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExplainResult {
    Ok {
        classic_plan: Option<Value>,
        json_plan: Value,
    },
    TruncatedInput {
        limit_bytes: u64,
        actual_bytes: u64,
    },
    Unsupported,
    /// The JSON plan did not decode; the classic plan did
    DecodeFailure {
        detail: String,
        classic_plan: Option<Value>,
    },
    BackendError {
        message: String,
    },
}

impl ExplainResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ExplainResult::Ok { .. })
    }

    pub fn classic_plan(&self) -> Option<&Value> {
        match self {
            ExplainResult::Ok { classic_plan, .. }
            | ExplainResult::DecodeFailure { classic_plan, .. } => classic_plan.as_ref(),
            _ => None,
        }
    }

    pub fn json_plan(&self) -> Option<&Value> {
        match self {
            ExplainResult::Ok { json_plan, .. } => Some(json_plan),
            _ => None,
        }
    }

    /// Operator-facing message for anything that is not a full success
    pub fn error_message(&self) -> Option<String> {
        match self {
            ExplainResult::Ok { .. } => None,
            ExplainResult::TruncatedInput {
                limit_bytes,
                actual_bytes,
            } => Some(format!(
                "Cannot explain truncated query. This query was {} bytes long and was truncated to maximum size of {} bytes.",
                actual_bytes, limit_bytes
            )),
            ExplainResult::Unsupported => Some(UNSUPPORTED_MESSAGE.to_string()),
            ExplainResult::DecodeFailure { detail, .. } => Some(detail.clone()),
            ExplainResult::BackendError { message } => Some(message.clone()),
        }
    }
}

/// Kind of database the example came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// MySQL style: classic plan plus JSON plan
    Relational,
    /// MongoDB style: JSON plan only
    Document,
}

#[derive(Deserialize)]
struct PlanEnvelope {
    #[serde(rename = "Classic", default)]
    classic: Value,
    #[serde(rename = "JSON", default)]
    json: Value,
}

fn decode_envelope(data: &str) -> Result<PlanEnvelope> {
    let bytes = STANDARD.decode(data.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn decode_json_plan(section: Value) -> std::result::Result<Value, String> {
    match section {
        Value::String(text) => serde_json::from_str(&text).map_err(|e| e.to_string()),
        Value::Null => Err("Response has no JSON plan".to_string()),
        other => Ok(other),
    }
}

pub struct ExplainFetcher<'a, A> {
    api: &'a A,
}

impl<'a, A: QanApi> ExplainFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        ExplainFetcher { api }
    }

    /// Explain a relational example query
    pub async fn explain(
        &self,
        agent_id: &str,
        instance_id: &str,
        example: &ExampleQuery,
    ) -> ExplainResult {
        self.run(agent_id, instance_id, example, Dialect::Relational)
            .await
    }

    /// Explain a document store example query
    pub async fn explain_document(
        &self,
        agent_id: &str,
        instance_id: &str,
        example: &ExampleQuery,
    ) -> ExplainResult {
        self.run(agent_id, instance_id, example, Dialect::Document)
            .await
    }

    pub async fn run(
        &self,
        agent_id: &str,
        instance_id: &str,
        example: &ExampleQuery,
        dialect: Dialect,
    ) -> ExplainResult {
        if example.is_truncated() {
            log::debug!(
                "Not explaining truncated example ({} of {} bytes)",
                example.raw_text.len(),
                example.original_size
            );
            return ExplainResult::TruncatedInput {
                limit_bytes: example.raw_text.len() as u64,
                actual_bytes: example.original_size,
            };
        }

        let reply = match self
            .api
            .fetch_explain(agent_id, instance_id, &example.database, &example.raw_text)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Explain request for {} failed: {}", instance_id, e);
                return ExplainResult::Unsupported;
            }
        };

        classify_reply(reply, dialect)
    }
}

fn classify_reply(reply: CommandReply, dialect: Dialect) -> ExplainResult {
    if !reply.error.is_empty() {
        return ExplainResult::BackendError {
            message: reply.error,
        };
    }

    let envelope = match decode_envelope(&reply.data) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::debug!("Explain payload did not decode: {}", e);
            return ExplainResult::Unsupported;
        }
    };

    let classic_plan = match (dialect, envelope.classic) {
        (Dialect::Document, _) | (_, Value::Null) => None,
        (Dialect::Relational, classic) => Some(classic),
    };

    match decode_json_plan(envelope.json) {
        Ok(json_plan) => ExplainResult::Ok {
            classic_plan,
            json_plan,
        },
        Err(detail) => ExplainResult::DecodeFailure {
            detail,
            classic_plan,
        },
    }
}
