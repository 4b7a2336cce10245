use crate::api::{ProfileEntry, QanApi};
use crate::error::Result;
use crate::format::{format_count, format_percent, format_qps, format_time, latency_summary, truncate};
use crate::params::ViewParameters;
use crate::profile::{LoadState, ProfileLoader, ProfileSession};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct ProfileOptions {
    /// `None` loads every page
    pub max_pages: Option<usize>,
    pub json: bool,
    pub csv: bool,
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ProfileReport<'a> {
    params: &'a ViewParameters,
    total_queries: u64,
    loaded: u64,
    remaining: u64,
    entries: &'a [ProfileEntry],
}

pub async fn run<A: QanApi>(api: &A, params: &ViewParameters, opts: &ProfileOptions) -> Result<()> {
    let mut session = ProfileSession::new();
    let loader = ProfileLoader::new(api);

    if let Err(e) = loader.load_all(&mut session, params, opts.max_pages).await {
        // A failed follow-up page leaves what was loaded so far usable
        if session.state() != LoadState::Loaded {
            return Err(e.into());
        }
        eprintln!("Warning: {}", e);
    }

    if session.entries().is_empty() {
        eprintln!("No queries for {} in this range", params.host);
        return Ok(());
    }

    if let Some(output) = &opts.output {
        let path = snapshot_path(output, &params.host, Utc::now());
        let mut storage = Storage::create(&path, params)?;
        let saved = storage.save_session(&session)?;
        eprintln!("Saved {} entries to {}", saved, path.display());
    }

    if opts.json {
        print_json(&session, params)?;
    } else if opts.csv {
        print_csv(&session);
    } else {
        print_table(&session, params);
    }

    Ok(())
}

/// `output` itself, or a `qanprof.<host>.<timestamp>.db` file inside it when
/// it is a directory
pub fn snapshot_path(output: &Path, host: &str, now: DateTime<Utc>) -> PathBuf {
    if output.is_dir() {
        let name: String = host
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        output.join(format!("qanprof.{}.{}.db", name, now.format("%y%m%d%H%M%S")))
    } else {
        output.to_path_buf()
    }
}

fn print_table(session: &ProfileSession, params: &ViewParameters) {
    println!("# Instance {}", params.host);
    println!(
        "# {} - {} ({})",
        params.from.format("%Y-%m-%d %H:%M:%S"),
        params.to.format("%Y-%m-%d %H:%M:%S"),
        params.timezone
    );
    if let Some(search) = &params.search {
        println!("# Search: {}", search);
    }
    println!(
        "# Showing {} of {} queries",
        session.loaded_count(),
        session.total_matching()
    );
    if let Some(total) = session.aggregate() {
        println!(
            "# Total: {} queries, {} QPS, load {:.2} | {}",
            format_count(total.stats.count),
            format_qps(total.qps),
            total.load,
            latency_summary(&total.stats)
        );
    }
    println!();

    println!(
        "{:>4}  {:>8}  {:>8}  {:>8}  {:>10}  {:>9}  {:<16}  ABSTRACT",
        "RANK", "LOAD", "%", "QPS", "COUNT", "AVG", "ID"
    );
    println!("{}", "-".repeat(100));

    for entry in session.queries() {
        println!(
            "{:>4}  {:>8.2}  {:>8}  {:>8}  {:>10}  {:>9}  {:<16}  {}",
            entry.rank,
            entry.load,
            format_percent(entry.percentage),
            format_qps(entry.qps),
            format_count(entry.stats.count),
            format_time(entry.stats.avg),
            entry.id,
            truncate(&entry.abstract_text, 40)
        );
    }

    if session.remaining() > 0 {
        println!();
        println!(
            "# {} more; use --pages or --all to load them",
            session.remaining()
        );
    }
}

fn print_json(session: &ProfileSession, params: &ViewParameters) -> Result<()> {
    let report = ProfileReport {
        params,
        total_queries: session.total_matching(),
        loaded: session.loaded_count(),
        remaining: session.remaining(),
        entries: session.entries(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_csv(session: &ProfileSession) {
    println!("rank,id,load,percentage,qps,count,avg,p95,abstract,fingerprint");
    for entry in session.queries() {
        println!(
            "{},{},{:.6},{:.6},{:.6},{},{:.6},{:.6},{},{}",
            entry.rank,
            entry.id,
            entry.load,
            entry.percentage,
            entry.qps,
            entry.stats.count,
            entry.stats.avg,
            entry.stats.p95,
            csv_field(&entry.abstract_text),
            csv_field(&entry.fingerprint)
        );
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
