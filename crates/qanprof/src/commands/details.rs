use crate::api::{QanApi, QueryDetails, TableRef};
use crate::details::{DetailView, DetailsLoader, QueryIdentity};
use crate::error::{Error, Result};
use crate::explain::{Dialect, ExampleQuery, ExplainFetcher, ExplainResult};
use crate::params::ViewParameters;
use crate::table_info::{TableMetadataResolver, TableMetadataResult};
use serde::Serialize;

pub struct DetailsOptions {
    pub agent: Option<String>,
    /// Operator's table choice, `db.table` or `` `db`.`table` ``
    pub table: Option<String>,
    pub dialect: Dialect,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
    pub query_id: String,
    pub database: Option<String>,
    pub tables: Vec<String>,
    pub example: Option<String>,
    pub metrics: serde_json::Value,
    pub explain: Option<ExplainResult>,
    pub table: Option<String>,
    pub table_metadata: Option<TableMetadataResult>,
}

pub async fn run<A: QanApi>(api: &A, params: &ViewParameters, opts: &DetailsOptions) -> Result<()> {
    let view = DetailsLoader::new(api).load(params).await?;

    match view {
        DetailView::Summary(details) => print_summary(&details, params, opts.json),
        DetailView::Query {
            details,
            identity,
            example,
        } => {
            let table = pick_table(&identity, opts.table.as_deref())?;
            let report = build_report(api, params, opts, &details, &identity, example, table).await;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
    }
}

/// The operator's table if given, else the query's first table
pub fn pick_table(identity: &QueryIdentity, choice: Option<&str>) -> Result<Option<TableRef>> {
    let Some(choice) = choice else {
        return Ok(identity.default_table());
    };
    let parsed = TableRef::parse(choice)?;
    if let Some(known) = identity.tables.iter().find(|t| t.is_selected(&parsed.quoted())) {
        return Ok(Some(known.clone()));
    }
    log::info!("{} is not among the query's tables", parsed);
    Ok(Some(parsed))
}

/// Explain and table metadata run concurrently; neither waits on the other
async fn build_report<A: QanApi>(
    api: &A,
    params: &ViewParameters,
    opts: &DetailsOptions,
    details: &QueryDetails,
    identity: &QueryIdentity,
    example: Option<ExampleQuery>,
    table: Option<TableRef>,
) -> QueryReport {
    let instance = if details.instance_id.is_empty() {
        params.host.as_str()
    } else {
        details.instance_id.as_str()
    };

    let (explain, table_metadata) = match opts.agent.as_deref() {
        Some(agent) => {
            let explain = async {
                match &example {
                    Some(example) => Some(
                        ExplainFetcher::new(api)
                            .run(agent, instance, example, opts.dialect)
                            .await,
                    ),
                    None => None,
                }
            };
            let metadata = async {
                match &table {
                    Some(table) => Some(
                        TableMetadataResolver::new(api)
                            .resolve_ref(agent, instance, table)
                            .await,
                    ),
                    None => None,
                }
            };
            tokio::join!(explain, metadata)
        }
        None => {
            log::info!("No agent given, skipping EXPLAIN and table metadata");
            (None, None)
        }
    };

    QueryReport {
        query_id: identity.query_id.clone(),
        database: identity.database.clone(),
        tables: identity.tables.iter().map(TableRef::quoted).collect(),
        example: example.map(|e| e.raw_text),
        metrics: details.metrics.clone(),
        explain,
        table: table.map(|t| t.quoted()),
        table_metadata,
    }
}

fn print_summary(details: &QueryDetails, params: &ViewParameters, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(details)?);
        return Ok(());
    }
    println!("# Server summary for {}", params.host);
    println!();
    if details.metrics.is_null() {
        return Err(Error::NoData(format!("No metrics for {}", params.host)));
    }
    println!("{}", serde_json::to_string_pretty(&details.metrics)?);
    Ok(())
}

fn print_report(report: &QueryReport) {
    println!("# Query {}", report.query_id);
    if let Some(db) = &report.database {
        println!("# Database: {}", db);
    }
    if !report.tables.is_empty() {
        println!("# Tables: {}", report.tables.join(", "));
    }
    println!();

    match &report.example {
        Some(example) => println!("{}", example),
        None => println!("(no example)"),
    }

    if let Some(explain) = &report.explain {
        println!();
        println!("## EXPLAIN");
        if let Some(classic) = explain.classic_plan() {
            println!("{}", pretty(classic));
        }
        if let Some(plan) = explain.json_plan() {
            println!("{}", pretty(plan));
        }
        if let Some(message) = explain.error_message() {
            println!("{}", message);
        }
    }

    if let (Some(table), Some(metadata)) = (&report.table, &report.table_metadata) {
        println!();
        println!("## {}", table);
        match metadata {
            TableMetadataResult::Ok(meta) => {
                println!("{}", meta.create_statement);
                println!();
                println!("{}", pretty(&meta.indexes));
                println!("{}", pretty(&meta.status));
            }
            TableMetadataResult::Errors(errors) => {
                for message in [&errors.create, &errors.index, &errors.status]
                    .into_iter()
                    .flatten()
                {
                    println!("{}", message);
                }
            }
            TableMetadataResult::Unavailable { detail } => println!("Unavailable: {}", detail),
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
