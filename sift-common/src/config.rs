//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Compiled defaults used when no other source provides a value
pub struct CompiledDefaults;

impl CompiledDefaults {
    pub const BIND_ADDRESS: &'static str = "127.0.0.1:5730";
    pub const ANALYSIS_BASE_URL: &'static str = "http://localhost:5000";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
    pub const EVENT_CAPACITY: usize = 100;
    pub const LOG_LEVEL: &'static str = "info";
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    CompiledDefaults::LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk TOML configuration
///
/// Every field is optional so partial files stay valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_base_url: Option<String>,
    /// Bearer token handed to the analysis service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entry_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_capacity: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    TomlFile,
    Default,
}

/// Default TOML path for a module: `<config dir>/sift/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sift").join(format!("{}.toml", module_name)))
}

/// Load TOML configuration from `path`
///
/// Returns defaults (with a warning) when the file does not exist.
/// A file that exists but cannot be parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found: {}. Using defaults.",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve one setting through CLI → ENV → TOML
///
/// Environment values that fail to parse are ignored with a warning rather
/// than aborting startup. Returns `None` when no source provides a value;
/// callers then apply the compiled default.
pub fn resolve_setting<T>(
    cli_value: Option<T>,
    env_var_name: &str,
    toml_value: Option<T>,
) -> Option<(T, ConfigSource)>
where
    T: FromStr,
{
    if let Some(value) = cli_value {
        return Some((value, ConfigSource::CommandLine));
    }

    if let Ok(raw) = std::env::var(env_var_name) {
        let raw = raw.trim();
        if !raw.is_empty() {
            match raw.parse::<T>() {
                Ok(value) => return Some((value, ConfigSource::Environment)),
                Err(_) => warn!("Ignoring unparseable {}={:?}", env_var_name, raw),
            }
        }
    }

    toml_value.map(|value| (value, ConfigSource::TomlFile))
}

/// Resolve one setting, falling back to `default`
pub fn resolve_or<T>(
    cli_value: Option<T>,
    env_var_name: &str,
    toml_value: Option<T>,
    default: T,
) -> (T, ConfigSource)
where
    T: FromStr,
{
    resolve_setting(cli_value, env_var_name, toml_value)
        .unwrap_or((default, ConfigSource::Default))
}
