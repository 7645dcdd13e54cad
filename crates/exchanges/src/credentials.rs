//! API credentials and their per-venue validation rules

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::errors::{ExchangeError, Result};

/// Placeholder values shipped in example configs; treated as unset
pub const DEFAULT_API_KEY: &str = "Key";
pub const DEFAULT_API_SECRET: &str = "Secret";
pub const DEFAULT_API_CLIENT_ID: &str = "ClientID";

/// API credentials for one exchange account
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    /// Coinbase Pro passphrase
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub one_time_password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_account: String,
}

// Secrets stay out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &mask(&self.key))
            .field("secret", &mask(&self.secret))
            .field("client_id", &mask(&self.client_id))
            .finish()
    }
}

fn mask(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

impl Credentials {
    pub fn new(key: &str, secret: &str) -> Self {
        Self {
            key: key.to_string(),
            secret: secret.to_string(),
            ..Default::default()
        }
    }

    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self
    }

    /// Load `<PREFIX>_API_KEY`, `<PREFIX>_API_SECRET` and the optional
    /// `<PREFIX>_CLIENT_ID` from the environment (after reading `.env`)
    pub fn from_env(prefix: &str) -> Result<Self> {
        dotenv::dotenv().ok();
        let prefix = prefix.to_ascii_uppercase();
        let read = |suffix: &str| std::env::var(format!("{prefix}_{suffix}"));

        let key = read("API_KEY")
            .map_err(|_| ExchangeError::missing_credential(&prefix, &format!("{prefix}_API_KEY")))?;
        let secret = read("API_SECRET").map_err(|_| {
            ExchangeError::missing_credential(&prefix, &format!("{prefix}_API_SECRET"))
        })?;

        Ok(Self {
            key,
            secret,
            client_id: read("CLIENT_ID").unwrap_or_default(),
            one_time_password: read("OTP").unwrap_or_default(),
            sub_account: read("SUB_ACCOUNT").unwrap_or_default(),
        })
    }

    /// Secret decoded from base64, for venues that publish base64 secrets
    pub fn decoded_secret(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.secret.trim())?)
    }
}

/// Which credential fields a venue needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsValidator {
    #[serde(default)]
    pub requires_key: bool,
    #[serde(default)]
    pub requires_secret: bool,
    #[serde(default)]
    pub requires_client_id: bool,
    #[serde(default)]
    pub requires_base64_decode_secret: bool,
}

impl CredentialsValidator {
    pub fn key_and_secret() -> Self {
        Self {
            requires_key: true,
            requires_secret: true,
            ..Default::default()
        }
    }

    pub fn validate(&self, exchange: &str, creds: &Credentials) -> Result<()> {
        let unset = |value: &str, placeholder: &str| value.is_empty() || value == placeholder;

        if self.requires_key && unset(&creds.key, DEFAULT_API_KEY) {
            return Err(ExchangeError::missing_credential(exchange, "key"));
        }
        if self.requires_secret && unset(&creds.secret, DEFAULT_API_SECRET) {
            return Err(ExchangeError::missing_credential(exchange, "secret"));
        }
        if self.requires_client_id && unset(&creds.client_id, DEFAULT_API_CLIENT_ID) {
            return Err(ExchangeError::missing_credential(exchange, "client id"));
        }
        if self.requires_base64_decode_secret {
            creds.decoded_secret()?;
        }
        Ok(())
    }
}
