//! Client configuration: defaults, an optional `almoner.toml`, then
//! `ALMONER_*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Site root; collections live under `<base_url>/api/`.
    pub base_url: String,
    /// Per-request timeout; expiry surfaces as a network error.
    pub request_timeout_secs: u64,
    /// Bearer token for admin requests.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Fall back to canned data when the API is unreachable.
    #[serde(default)]
    pub offline_fallback: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_token: None,
            offline_fallback: false,
        }
    }
}

impl ClientConfig {
    /// Load from `almoner.toml` in the working directory (if present) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("almoner")
    }

    /// Load using `file_stem` (without extension) as the optional config file.
    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("offline_fallback", false)?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(Environment::with_prefix("ALMONER").try_parsing(true))
            .build()?;

        let loaded: ClientConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Message(format!("invalid base_url '{}': {e}", self.base_url)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
