//! Configuration file
//!
//! Settings are layered: built-in defaults, then the TOML file, then command
//! line flags and their environment fallbacks.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1/qan-api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RANGE: Duration = Duration::from_secs(12 * 3600);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub agent: Option<String>,
    /// humantime duration, e.g. "30s"
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Default instance when `--host` is not given
    pub host: Option<String>,
    /// Default lookback window, e.g. "12h"
    pub last: Option<String>,
}

/// `~/.config/qanprof/config.toml` or the platform equivalent
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qanprof").join("config.toml"))
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise the default path
    /// if it exists, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.timeout()?;
        self.default_range()?;
        Ok(())
    }

    /// Flag value, else file value, else the built-in default
    pub fn api_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.api.url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn agent(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.api.agent.clone())
    }

    pub fn host(&self, flag: Option<&str>) -> Result<String> {
        flag.map(str::to_string)
            .or_else(|| self.profile.host.clone())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "No instance given; pass --host or set profile.host in the config file"
                        .to_string(),
                )
            })
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_setting("api.timeout", self.api.timeout.as_deref(), DEFAULT_TIMEOUT)
    }

    pub fn default_range(&self) -> Result<Duration> {
        parse_setting("profile.last", self.profile.last.as_deref(), DEFAULT_RANGE)
    }
}

fn parse_setting(name: &str, value: Option<&str>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(s) => humantime::parse_duration(s)
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url(None), DEFAULT_API_URL);
        assert_eq!(config.agent(None), None);
        assert_eq!(config.timeout().unwrap(), DEFAULT_TIMEOUT);
        assert_eq!(config.default_range().unwrap(), DEFAULT_RANGE);
        assert!(config.host(None).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::parse(
            r#"
            [api]
            url = "https://pmm.example.com/qan-api"
            agent = "file-agent"
            timeout = "5s"

            [profile]
            host = "db1"
            last = "1h"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url(None), "https://pmm.example.com/qan-api");
        assert_eq!(config.api_url(Some("http://localhost:9001")), "http://localhost:9001");
        assert_eq!(config.agent(Some("flag-agent")).as_deref(), Some("flag-agent"));
        assert_eq!(config.host(None).unwrap(), "db1");
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(config.default_range().unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::parse("[api]\ntimeout = \"soon\"\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::parse("[api]\nurl = 3\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::parse("[unknown]\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nagent = \"a1\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.agent(None).as_deref(), Some("a1"));

        let missing = file.path().with_extension("missing");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
