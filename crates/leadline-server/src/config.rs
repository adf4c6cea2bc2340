//! `config.toml` sections and their `LEADLINE_*` environment overrides.

use leadline_db::DbRuntimeSettings;
use leadline_leads::LeadApiConfig;
use leadline_voice::RealtimeConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Everything the server and the admin CLI read at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Realtime speech engine.
    pub engine: RealtimeConfig,
    /// Downstream lead API.
    pub lead_api: LeadApiConfig,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5050,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; parent directories are created on open.
    pub path: String,
    pub busy_timeout_ms: u64,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let runtime = DbRuntimeSettings::default();
        Self {
            path: "leadline.db".to_string(),
            busy_timeout_ms: runtime.busy_timeout_ms,
            pool_max_size: runtime.pool_max_size,
        }
    }
}

impl DatabaseConfig {
    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `leadline_server=debug,info`.
    pub level: String,
    /// One JSON object per line instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Call bridge timing and wording.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Assistant speech containing this phrase (case-insensitive) ends the
    /// call. Every closing message ends with "Have a great day!", so change
    /// both together.
    pub closing_phrase: String,

    /// Wait before hanging up so the final audio can play out.
    pub drain_ms: u64,

    /// Upper bound on closing either socket.
    pub close_timeout_ms: u64,

    /// Upper bound on one audit turn write.
    pub turn_log_timeout_ms: u64,

    /// How long teardown waits on a lead submission still in flight. The
    /// submission keeps running past this; only the wait is cut short.
    pub submit_wait_ms: u64,

    /// Replaces the built-in assistant instructions when set.
    pub instructions: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            closing_phrase: "have a great day".to_string(),
            drain_ms: 3_000,
            close_timeout_ms: 2_000,
            turn_log_timeout_ms: 2_000,
            submit_wait_ms: 15_000,
            instructions: None,
        }
    }
}

impl BridgeConfig {
    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn turn_log_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_log_timeout_ms)
    }

    pub fn submit_wait(&self) -> Duration {
        Duration::from_millis(self.submit_wait_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Reads `path` (a missing file means all defaults), then applies the
/// process environment.
///
/// Recognised variables: `LEADLINE_HOST`, `LEADLINE_PORT`, `LEADLINE_DB_PATH`,
/// `LEADLINE_LOG_LEVEL`, `LEADLINE_LOG_JSON`, `LEADLINE_ENGINE_API_KEY`,
/// `LEADLINE_ENGINE_URL`, `LEADLINE_ENGINE_MODEL`,
/// `LEADLINE_LEAD_API_BASE_URL`, `LEADLINE_LEAD_API_USERNAME`,
/// `LEADLINE_LEAD_API_PASSWORD`, `LEADLINE_CLOSING_PHRASE`.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        None => Config::default(),
        Some(path) => match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path, "no config file, starting from defaults");
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::FileRead {
                    path: path.to_string(),
                    source,
                })
            }
            Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?,
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parses `raw` into `slot`, keeping the old value when it does not parse.
fn override_parsed<T: FromStr>(key: &str, slot: &mut T, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
    }
}

/// Applies `LEADLINE_*` overrides read through `lookup`.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    override_parsed("LEADLINE_HOST", &mut config.server.host, lookup("LEADLINE_HOST"));
    override_parsed("LEADLINE_PORT", &mut config.server.port, lookup("LEADLINE_PORT"));
    if let Some(flag) = lookup("LEADLINE_LOG_JSON") {
        config.logging.json = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
    }

    let strings: [(&str, &mut String); 9] = [
        ("LEADLINE_DB_PATH", &mut config.database.path),
        ("LEADLINE_LOG_LEVEL", &mut config.logging.level),
        ("LEADLINE_ENGINE_API_KEY", &mut config.engine.api_key),
        ("LEADLINE_ENGINE_URL", &mut config.engine.url),
        ("LEADLINE_ENGINE_MODEL", &mut config.engine.model),
        ("LEADLINE_LEAD_API_BASE_URL", &mut config.lead_api.base_url),
        ("LEADLINE_LEAD_API_USERNAME", &mut config.lead_api.username),
        ("LEADLINE_LEAD_API_PASSWORD", &mut config.lead_api.password),
        ("LEADLINE_CLOSING_PHRASE", &mut config.bridge.closing_phrase),
    ];
    for (key, slot) in strings {
        if let Some(value) = lookup(key) {
            *slot = value;
        }
    }
}

/// Picks the config file: the first CLI argument, else `LEADLINE_CONFIG_PATH`.
///
/// The second value names the source for the startup log line.
pub fn resolve_config_path(arg: Option<String>) -> (Option<String>, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();
    if let Some(path) = arg.filter(non_blank) {
        (Some(path), "cli-arg")
    } else if let Some(path) = std::env::var("LEADLINE_CONFIG_PATH").ok().filter(non_blank) {
        (Some(path), "env-var")
    } else {
        (None, "default")
    }
}
