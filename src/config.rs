use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// gRPC server configuration
    pub server: ServerConfig,

    /// Searcher configuration
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration: baked-in defaults, then an optional config file
    /// (explicit path or `SEARCHGATE_CONFIG`), then `SEARCHGATE_` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let config_path = path
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| std::env::var("SEARCHGATE_CONFIG").ok())
            .unwrap_or_else(|| "config/searchgate.toml".to_string());

        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SEARCHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// gRPC server port
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// Client connect timeout (seconds); reconnect attempts use the same bound
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory holding the externally written index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Fields queried when a query string names none
    #[serde(default = "default_fields")]
    pub default_fields: Vec<String>,

    /// Cadence of the snapshot refresh task (seconds)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    9100
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index")
}

fn default_fields() -> Vec<String> {
    vec!["title".to_string(), "body".to_string()]
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
