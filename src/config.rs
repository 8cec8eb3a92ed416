//! Application-level configuration loading: oracle credentials from the
//! environment, tuning knobs from an optional JSON file.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::oracle::ModelRoster;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TURTLE_SOUP_CONFIG_PATH";
/// Environment variable holding the oracle credential. Required.
const API_KEY_ENV: &str = "ORACLE_API_KEY";
/// Environment variable overriding the oracle endpoint.
const BASE_URL_ENV: &str = "ORACLE_BASE_URL";
/// Environment variable overriding the on-disk store directory.
const DATA_DIR_ENV: &str = "TURTLE_SOUP_DATA_DIR";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_QUOTA_BYTES: usize = 4 * 1024 * 1024;

/// Fatal configuration problems, reported at startup before anything runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The oracle credential is absent or blank. The game cannot run
    /// without its judge, so this refuses startup.
    #[error("missing oracle credential: set {API_KEY_ENV}")]
    MissingApiKey,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Oracle client settings.
    pub oracle: OracleConfig,
    /// Persistence settings.
    pub store: StoreConfig,
}

/// Settings for the oracle HTTP client.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Credential sent as a bearer token. Resolved once at startup.
    pub api_key: String,
    /// Endpoint base, up to and including the API version segment.
    pub base_url: String,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
    /// Model candidates per difficulty.
    pub roster: ModelRoster,
}

/// Settings for the persistence layer.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the file-backed store. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
    /// Byte budget across all stored keys.
    pub quota_bytes: usize,
}

impl AppConfig {
    /// Load the configuration: credential and endpoint from the
    /// environment, tuning knobs from the optional JSON file. A missing or
    /// unparseable file falls back to defaults; a missing credential is
    /// fatal.
    pub fn load() -> Result<Self, ConfigError> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = env::var(BASE_URL_ENV)
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let data_dir = env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty());

        let raw = load_raw_config();

        Ok(Self {
            oracle: OracleConfig {
                api_key,
                base_url,
                request_timeout: raw
                    .request_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
                roster: raw.models.unwrap_or_default(),
            },
            store: StoreConfig {
                data_dir,
                quota_bytes: raw.quota_bytes.unwrap_or(DEFAULT_QUOTA_BYTES),
            },
        })
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    /// Oracle transport timeout in seconds.
    request_timeout_secs: Option<u64>,
    /// Store byte budget.
    quota_bytes: Option<usize>,
    /// Model candidates per difficulty.
    models: Option<ModelRoster>,
}

fn load_raw_config() -> RawConfig {
    let path = resolve_config_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                raw
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                RawConfig::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "config file not found; using built-in defaults"
            );
            RawConfig::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read config; falling back to defaults"
            );
            RawConfig::default()
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
