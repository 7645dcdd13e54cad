//! Exchange configuration
//!
//! One [`ExchangeConfig`] per venue, usually loaded from a JSON file holding
//! several of them. Every adapter can produce its own defaults through
//! `default_config()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::credentials::{Credentials, CredentialsValidator};
use crate::errors::{ExchangeError, Result};
use crate::pairs::PairsManager;
use crate::protocol::Features;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub authenticated_support: bool,
    pub authenticated_websocket_api_support: bool,
    pub credentials: Credentials,
    pub credentials_validator: CredentialsValidator,
    /// URL overrides keyed by `UrlKind` name
    pub urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsocketSettings {
    /// Fixed wait between reconnect attempts
    pub reconnect_delay_ms: u64,
    pub response_check_timeout_ms: u64,
    pub orderbook_buffer_limit: usize,
}

impl Default for WebsocketSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            response_check_timeout_ms: 30_000,
            orderbook_buffer_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub name: String,
    pub enabled: bool,
    pub verbose: bool,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    pub api: ApiConfig,
    pub currency_pairs: PairsManager,
    pub features: Features,
    pub websocket: WebsocketSettings,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            verbose: false,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            http_user_agent: String::new(),
            api: ApiConfig::default(),
            currency_pairs: PairsManager::default(),
            features: Features::default(),
            websocket: WebsocketSettings::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, key: &str, secret: &str) -> Self {
        self.api.credentials = Credentials::new(key, secret);
        self.api.authenticated_support = true;
        self
    }

    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.api.credentials.client_id = client_id.to_string();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_url(mut self, kind: &str, url: &str) -> Self {
        self.api.urls.insert(kind.to_string(), url.to_string());
        self
    }

    /// Fill credentials from `<NAME>_API_KEY` style variables. Names are
    /// upper-cased with spaces and dots replaced (`Coinbase Pro` → `COINBASE_PRO`).
    pub fn with_env_credentials(mut self) -> Result<Self> {
        let prefix: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        self.api.credentials = Credentials::from_env(&prefix)?;
        self.api.authenticated_support = true;
        info!("🔑 Loaded {} credentials from environment", self.name);
        Ok(self)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.http_timeout_ms)
    }
}

/// Multi-exchange configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExchangeError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_json(&raw)?;
        info!("📋 Loaded {} exchange configs from {}", config.exchanges.len(), path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ExchangeError::ConfigurationError(format!("invalid config: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|e| {
            ExchangeError::ConfigurationError(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Case-insensitive lookup by exchange name
    pub fn get_exchange_config(&self, name: &str) -> Result<&ExchangeConfig> {
        self.exchanges
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ExchangeError::ConfigurationError(format!("no config for {name}")))
    }

    pub fn enabled_exchanges(&self) -> impl Iterator<Item = &ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled)
    }
}
