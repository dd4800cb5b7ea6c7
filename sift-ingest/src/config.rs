//! Service configuration
//!
//! Each setting resolves CLI → `SIFT_*` environment → TOML → compiled default.

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sift_common::config::{
    default_config_path, load_toml_config, resolve_or, resolve_setting, write_toml_config,
    CompiledDefaults, LoggingConfig, TomlConfig,
};
use sift_common::{Error, Result};

pub const MODULE_NAME: &str = "sift-ingest";

/// Command-line arguments for sift-ingest
#[derive(Parser, Debug, Default)]
#[command(name = "sift-ingest")]
#[command(about = "Image ingestion and object-search service")]
#[command(version)]
pub struct Args {
    /// TOML config file (default: <config dir>/sift/sift-ingest.toml)
    #[arg(short, long, env = "SIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Base URL of the remote analysis service
    #[arg(long)]
    pub analysis_url: Option<String>,

    /// Per-request timeout for the analysis service, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Largest archive entry accepted, in bytes
    #[arg(long)]
    pub max_entry_bytes: Option<u64>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write the resolved settings to the config file and exit
    #[arg(long)]
    pub write_config: bool,
}

impl Args {
    /// Config file named on the command line, else the default path
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| default_config_path(MODULE_NAME))
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub bind_address: SocketAddr,
    pub analysis_base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
    pub max_entry_bytes: u64,
    pub event_capacity: usize,
    pub log_level: String,
}

impl IngestConfig {
    /// Load the TOML file named by `args` (or the default path) and resolve
    pub fn load(args: &Args) -> Result<Self> {
        let toml = match args.config_path() {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };
        Self::resolve(args, &toml)
    }

    pub fn resolve(args: &Args, toml: &TomlConfig) -> Result<Self> {
        let (bind, _) = resolve_or(
            args.bind.clone(),
            "SIFT_BIND_ADDRESS",
            toml.bind_address.clone(),
            CompiledDefaults::BIND_ADDRESS.to_string(),
        );
        let bind_address: SocketAddr = bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {:?}: {}", bind, e)))?;

        let (analysis_base_url, _) = resolve_or(
            args.analysis_url.clone(),
            "SIFT_ANALYSIS_URL",
            toml.analysis_base_url.clone(),
            CompiledDefaults::ANALYSIS_BASE_URL.to_string(),
        );
        if !analysis_base_url.starts_with("http://") && !analysis_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Analysis URL must be http(s): {}",
                analysis_base_url
            )));
        }

        let (timeout_secs, _) = resolve_or(
            args.timeout_secs,
            "SIFT_REQUEST_TIMEOUT_SECS",
            toml.request_timeout_secs,
            CompiledDefaults::REQUEST_TIMEOUT_SECS,
        );
        if timeout_secs == 0 {
            return Err(Error::Config("Request timeout must be at least 1 second".to_string()));
        }

        let (max_entry_bytes, _) = resolve_or(
            args.max_entry_bytes,
            "SIFT_MAX_ENTRY_BYTES",
            toml.max_entry_bytes,
            CompiledDefaults::MAX_ENTRY_BYTES,
        );

        let (event_capacity, _) = resolve_or(
            None,
            "SIFT_EVENT_CAPACITY",
            toml.event_capacity,
            CompiledDefaults::EVENT_CAPACITY,
        );
        if event_capacity == 0 {
            return Err(Error::Config("Event capacity must be positive".to_string()));
        }

        let (log_level, _) = resolve_or(
            args.log_level.clone(),
            "SIFT_LOG_LEVEL",
            Some(toml.logging.level.clone()),
            CompiledDefaults::LOG_LEVEL.to_string(),
        );

        let auth_token = resolve_setting(None, "SIFT_AUTH_TOKEN", toml.auth_token.clone())
            .map(|(token, _)| token);

        Ok(Self {
            bind_address,
            analysis_base_url,
            auth_token,
            request_timeout: Duration::from_secs(timeout_secs),
            max_entry_bytes,
            event_capacity,
            log_level,
        })
    }

    /// File form of the resolved settings
    pub fn to_toml(&self) -> TomlConfig {
        TomlConfig {
            bind_address: Some(self.bind_address.to_string()),
            analysis_base_url: Some(self.analysis_base_url.clone()),
            auth_token: self.auth_token.clone(),
            request_timeout_secs: Some(self.request_timeout.as_secs()),
            max_entry_bytes: Some(self.max_entry_bytes),
            event_capacity: Some(self.event_capacity),
            logging: LoggingConfig {
                level: self.log_level.clone(),
            },
        }
    }

    /// Write the resolved settings to `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        write_toml_config(&self.to_toml(), path)
    }
}
