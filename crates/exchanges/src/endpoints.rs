//! Endpoint URL management
//!
//! Each adapter registers default URLs per [`UrlKind`]; config can override
//! any kind that has a default. Overrides are validated before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::errors::{ExchangeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UrlKind {
    RestSpot,
    RestSpotSupplementary,
    RestSandbox,
    RestFutures,
    RestSwap,
    WebsocketSpot,
    WebsocketSpotSupplementary,
}

impl UrlKind {
    pub const ALL: [UrlKind; 7] = [
        UrlKind::RestSpot,
        UrlKind::RestSpotSupplementary,
        UrlKind::RestSandbox,
        UrlKind::RestFutures,
        UrlKind::RestSwap,
        UrlKind::WebsocketSpot,
        UrlKind::WebsocketSpotSupplementary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrlKind::RestSpot => "RestSpot",
            UrlKind::RestSpotSupplementary => "RestSpotSupplementary",
            UrlKind::RestSandbox => "RestSandbox",
            UrlKind::RestFutures => "RestFutures",
            UrlKind::RestSwap => "RestSwap",
            UrlKind::WebsocketSpot => "WebsocketSpot",
            UrlKind::WebsocketSpotSupplementary => "WebsocketSpotSupplementary",
        }
    }

    pub fn is_websocket(&self) -> bool {
        matches!(self, UrlKind::WebsocketSpot | UrlKind::WebsocketSpotSupplementary)
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlKind {
    type Err = ExchangeError;

    /// Accepts `RestSpot` as well as the `RestSpotURL` config spelling
    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_suffix("URL").unwrap_or(s);
        UrlKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ExchangeError::EndpointError(format!("unknown URL kind {s}")))
    }
}

fn validate(kind: UrlKind, value: &str) -> Result<()> {
    let url = Url::parse(value)?;
    let allowed: &[&str] = if kind.is_websocket() {
        &["ws", "wss"]
    } else {
        &["http", "https"]
    };
    if !allowed.contains(&url.scheme()) {
        return Err(ExchangeError::InvalidUrl(format!(
            "{value} has scheme {} but {kind} needs one of {allowed:?}",
            url.scheme()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    exchange: String,
    defaults: BTreeMap<UrlKind, String>,
    running: BTreeMap<UrlKind, String>,
}

impl Endpoints {
    pub fn new(exchange: &str) -> Self {
        Self {
            exchange: exchange.to_string(),
            ..Default::default()
        }
    }

    /// Register default URLs. Every URL is validated first.
    pub fn set_defaults(&mut self, defaults: &[(UrlKind, &str)]) -> Result<()> {
        for (kind, url) in defaults {
            validate(*kind, url)?;
        }
        for (kind, url) in defaults {
            self.defaults.insert(*kind, url.trim_end_matches('/').to_string());
        }
        Ok(())
    }

    /// Override the URL in use for `kind`
    pub fn set_running(&mut self, kind: UrlKind, url: &str) -> Result<()> {
        if !self.defaults.contains_key(&kind) {
            return Err(ExchangeError::EndpointError(format!(
                "{} has no default {kind} URL to override",
                self.exchange
            )));
        }
        validate(kind, url)?;
        let url = url.trim_end_matches('/').to_string();
        if self.defaults.get(&kind) == Some(&url) {
            self.running.remove(&kind);
        } else {
            tracing::info!("🔧 {} {} URL set to {}", self.exchange, kind, url);
            self.running.insert(kind, url);
        }
        Ok(())
    }

    pub fn get(&self, kind: UrlKind) -> Result<String> {
        self.running
            .get(&kind)
            .or_else(|| self.defaults.get(&kind))
            .cloned()
            .ok_or_else(|| {
                ExchangeError::EndpointError(format!("{} has no {kind} URL", self.exchange))
            })
    }

    /// Every configured URL keyed by kind name, overrides applied
    pub fn url_map(&self) -> BTreeMap<String, String> {
        self.defaults
            .keys()
            .filter_map(|k| self.get(*k).ok().map(|url| (k.to_string(), url)))
            .collect()
    }
}
