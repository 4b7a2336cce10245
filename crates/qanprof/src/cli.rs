use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "qanprof")]
#[command(about = "Query analytics profiles from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ~/.config/qanprof/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the query analytics API
    #[arg(long, global = true, env = "QANPROF_API_URL")]
    pub api_url: Option<String>,

    /// More logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Profile the last N duration (e.g. 1h, 12h, 2d)
    #[arg(long, value_parser = parse_duration, conflicts_with_all = ["from", "to"])]
    pub last: Option<Duration>,

    /// Start of the range (RFC 3339)
    #[arg(long, value_parser = parse_time, requires = "to")]
    pub from: Option<DateTime<Utc>>,

    /// End of the range (RFC 3339)
    #[arg(long, value_parser = parse_time, requires = "from")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the ranked query profile of an instance
    Profile {
        /// Instance UUID
        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        range: RangeArgs,

        /// Only queries whose fingerprint matches
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Number of pages to load (10 queries each)
        #[arg(long, short = 'n', default_value = "1", conflicts_with = "all")]
        pages: usize,

        /// Load every matching query
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,

        /// Also save the profile to a snapshot database
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show details, EXPLAIN and table metadata of a query
    Details {
        /// Instance UUID
        #[arg(long)]
        host: Option<String>,

        /// Agent UUID that runs EXPLAIN and table commands
        #[arg(long, env = "QANPROF_AGENT")]
        agent: Option<String>,

        /// Query ID (default: server summary)
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Table to describe (default: first table of the query)
        #[arg(long, short = 't')]
        table: Option<String>,

        /// Use the document (MongoDB) explain
        #[arg(long)]
        document: bool,

        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit the tables referenced by a query
    Tables {
        #[arg(value_enum)]
        action: TableAction,

        /// Instance UUID
        #[arg(long)]
        host: Option<String>,

        /// Query ID
        #[arg(long, short = 'q')]
        query: String,

        /// Table as `db`.`table`
        #[arg(long, short = 't')]
        table: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Execute raw SQL query on a snapshot database
    Query {
        /// Snapshot database file
        file: PathBuf,

        /// SQL query to execute
        sql: String,
    },

    /// List saved snapshot databases
    List {
        /// Directory to search (defaults to current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableAction {
    Add,
    Remove,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 30m, 12h, 2d, 1h30m, 90",
        s
    ))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid time '{}': {}. Example: 2018-09-18T05:33:30Z", s, e))
}

impl RangeArgs {
    /// Resolve to `(from, to)`, ending at `now` unless both ends are given
    pub fn resolve(
        &self,
        default: Duration,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let (from, to) = match (self.from, self.to) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                let span = self.last.unwrap_or(default);
                let span = chrono::Duration::from_std(span)
                    .map_err(|_| format!("Duration {:?} is too large", span))?;
                (now - span, now)
            }
        };

        if from >= to {
            return Err(format!(
                "Range start {} is not before its end {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            ));
        }
        Ok((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43200));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_range_defaults_to_lookback() {
        let now = Utc.with_ymd_and_hms(2018, 9, 18, 17, 33, 30).unwrap();
        let (from, to) = RangeArgs::default()
            .resolve(Duration::from_secs(12 * 3600), now)
            .unwrap();
        assert_eq!(to, now);
        assert_eq!(from, Utc.with_ymd_and_hms(2018, 9, 18, 5, 33, 30).unwrap());
    }

    #[test]
    fn test_range_explicit_bounds() {
        let now = Utc::now();
        let args = RangeArgs {
            from: Some(parse_time("2018-09-18T05:33:30Z").unwrap()),
            to: Some(parse_time("2018-09-18T17:33:30+00:00").unwrap()),
            ..Default::default()
        };
        let (from, to) = args.resolve(Duration::from_secs(60), now).unwrap();
        assert_eq!((to - from).num_hours(), 12);

        let reversed = RangeArgs {
            from: args.to,
            to: args.from,
            ..Default::default()
        };
        assert!(reversed.resolve(Duration::from_secs(60), now).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "qanprof", "profile", "--host", "db1", "--last", "1h", "--search", "sbtest", "--all",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Profile { all: true, .. }));

        assert!(
            Cli::try_parse_from(["qanprof", "profile", "--last", "1h", "--from", "2018-09-18T05:33:30Z"])
                .is_err()
        );
    }
}
