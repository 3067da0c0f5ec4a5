//! Configuration resolution for Scout.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. JSON config file (`--config` / `SCOUT_CONFIG`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SEARCH_URL: &str = "https://torre.ai/api/entities/_searchStream";
pub const DEFAULT_PROFILE_BASE_URL: &str = "https://torre.ai/api/genome/bios";

/// Complete Scout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Inbound HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Origins allowed to call the API cross-origin. `"*"` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Upstream search and profile service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Endpoint answering a POST with a chunked NDJSON stream.
    pub search_url: String,
    /// Profiles live at `{profile_base_url}/{identifier}`.
    pub profile_base_url: String,
    /// Bounds the whole search call, stream included.
    pub search_timeout_secs: u64,
    pub profile_timeout_secs: u64,
    /// Shortest accepted query after trimming.
    pub min_query_chars: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            search_timeout_secs: 30,
            profile_timeout_secs: 10,
            min_query_chars: 2,
        }
    }
}

impl UpstreamConfig {
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub const fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }
}

impl Config {
    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        let upstream = &self.upstream;
        for (name, url) in [
            ("search_url", &upstream.search_url),
            ("profile_base_url", &upstream.profile_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "upstream.{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if upstream.search_timeout_secs == 0 || upstream.profile_timeout_secs == 0 {
            return Err(Error::Config("upstream timeouts must be non-zero".into()));
        }
        if upstream.min_query_chars == 0 {
            return Err(Error::Config("upstream.min_query_chars must be at least 1".into()));
        }
        if self.server.allowed_origins.is_empty() {
            return Err(Error::Config("server.allowed_origins must not be empty".into()));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `SCOUT_*` overrides. `PORT` only applies when
/// `SCOUT_LISTEN_ADDR` is unset.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("SCOUT_LISTEN_ADDR") {
        config.server.listen_addr = parse_var("SCOUT_LISTEN_ADDR", &val)?;
    } else if let Some(val) = lookup("PORT") {
        config.server.listen_addr.set_port(parse_var("PORT", &val)?);
    }
    if let Some(val) = lookup("SCOUT_ALLOWED_ORIGINS") {
        config.server.allowed_origins = val
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(val) = lookup("SCOUT_SEARCH_URL") {
        config.upstream.search_url = val;
    }
    if let Some(val) = lookup("SCOUT_PROFILE_URL") {
        config.upstream.profile_base_url = val;
    }
    if let Some(val) = lookup("SCOUT_SEARCH_TIMEOUT_SECS") {
        config.upstream.search_timeout_secs = parse_var("SCOUT_SEARCH_TIMEOUT_SECS", &val)?;
    }
    if let Some(val) = lookup("SCOUT_PROFILE_TIMEOUT_SECS") {
        config.upstream.profile_timeout_secs = parse_var("SCOUT_PROFILE_TIMEOUT_SECS", &val)?;
    }
    if let Some(val) = lookup("SCOUT_MIN_QUERY_CHARS") {
        config.upstream.min_query_chars = parse_var("SCOUT_MIN_QUERY_CHARS", &val)?;
    }
    Ok(())
}

fn parse_var<T>(name: &str, val: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {name} '{val}': {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_torre() {
        let config = Config::default();
        assert_eq!(config.upstream.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.upstream.search_timeout(), Duration::from_secs(30));
        assert_eq!(config.upstream.profile_timeout(), Duration::from_secs(10));
        assert_eq!(config.server.listen_addr.port(), 8000);
        assert!(config.server.allows_any_origin());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"upstream": {{"search_timeout_secs": 5}}, "server": {{"allowed_origins": ["https://app.example"]}}}}"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.upstream.search_timeout_secs, 5);
        assert_eq!(config.upstream.profile_base_url, DEFAULT_PROFILE_BASE_URL);
        assert_eq!(config.server.allowed_origins, vec!["https://app.example"]);
        assert!(!config.server.allows_any_origin());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "9100"),
                ("SCOUT_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
                ("SCOUT_SEARCH_URL", "http://127.0.0.1:1/search"),
                ("SCOUT_SEARCH_TIMEOUT_SECS", "3"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.listen_addr.port(), 9100);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.upstream.search_url, "http://127.0.0.1:1/search");
        assert_eq!(config.upstream.search_timeout_secs, 3);
    }

    #[test]
    fn min_query_chars_from_env() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("SCOUT_MIN_QUERY_CHARS", " 4 ")])).unwrap();
        assert_eq!(config.upstream.min_query_chars, 4);

        let err = apply_env_overrides(&mut config, env(&[("SCOUT_MIN_QUERY_CHARS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn listen_addr_wins_over_port() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[("SCOUT_LISTEN_ADDR", "127.0.0.1:7000"), ("PORT", "9100")]),
        )
        .unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.upstream.search_url = "torre.ai/search".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.profile_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.allowed_origins.clear();
        assert!(config.validate().is_err());
    }
}
