use anyhow::Context;
use clap::Parser;
use qanprof::api::HttpApi;
use qanprof::cli::{Cli, Command, RangeArgs};
use qanprof::commands::details::DetailsOptions;
use qanprof::commands::profile::ProfileOptions;
use qanprof::config::Config;
use qanprof::error::exit_code;
use qanprof::explain::Dialect;
use qanprof::params::ViewParameters;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(qan_err) = e.downcast_ref::<qanprof::Error>() {
                ExitCode::from(qan_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Query { file, sql } => {
            qanprof::commands::query::run(&file, &sql)?;
            return Ok(());
        }
        Command::List { dir } => {
            qanprof::commands::list::run(dir.as_deref())?;
            return Ok(());
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "qanprof", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let api_url = config.api_url(cli.api_url.as_deref());
    let api = HttpApi::new(&api_url, config.timeout()?)?;
    log::debug!("Using API at {}", api.base_url());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match cli.command {
        Command::Profile {
            host,
            range,
            search,
            pages,
            all,
            json,
            csv,
            output,
        } => {
            let params = view_params(&config, host.as_deref(), &range)?.with_search(search.as_deref());
            let opts = ProfileOptions {
                max_pages: if all { None } else { Some(pages.max(1)) },
                json,
                csv,
                output,
            };
            runtime.block_on(qanprof::commands::profile::run(&api, &params, &opts))?;
        }
        Command::Details {
            host,
            agent,
            query,
            table,
            document,
            range,
            json,
        } => {
            let params = view_params(&config, host.as_deref(), &range)?.with_query(query.as_deref());
            let opts = DetailsOptions {
                agent: config.agent(agent.as_deref()),
                table,
                dialect: if document {
                    Dialect::Document
                } else {
                    Dialect::Relational
                },
                json,
            };
            runtime.block_on(qanprof::commands::details::run(&api, &params, &opts))?;
        }
        Command::Tables {
            action,
            host,
            query,
            table,
            range,
        } => {
            let params = view_params(&config, host.as_deref(), &range)?.with_query(Some(query.as_str()));
            runtime.block_on(qanprof::commands::tables::run(&api, &params, action, &table))?;
        }
        Command::Query { .. } | Command::List { .. } | Command::Completions { .. } => {
            unreachable!("handled before the runtime starts")
        }
    }

    Ok(())
}

fn view_params(
    config: &Config,
    host: Option<&str>,
    range: &RangeArgs,
) -> anyhow::Result<ViewParameters> {
    let host = config.host(host)?;
    let (from, to) = range
        .resolve(config.default_range()?, chrono::Utc::now())
        .map_err(qanprof::Error::InvalidArgument)?;
    Ok(ViewParameters::new(host, from, to))
}
