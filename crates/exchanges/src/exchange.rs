//! Shared adapter state
//!
//! Every adapter embeds a [`Base`]: identity, credentials, endpoints, pair
//! formats, feature flags, the rate-limited requester and the market store.
//! The [`BotExchange`](crate::traits::BotExchange) default methods delegate
//! here.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tradebridge_core::unix_secs;

use crate::asset::Asset;
use crate::config::{ApiConfig, ExchangeConfig, WebsocketSettings};
use crate::credentials::{Credentials, CredentialsValidator};
use crate::currency::{Pair, PairFormat, PairList};
use crate::endpoints::{Endpoints, UrlKind};
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpTransport, MonoioHttpsClient};
use crate::pairs::PairsManager;
use crate::protocol::Features;
use crate::request::{EndpointLimit, RateLimit, Requester};
use crate::store::MarketStore;
use crate::types::Subscription;
use crate::withdraw::WithdrawPermissions;

/// Authentication state of an adapter
#[derive(Debug, Clone, Default)]
pub struct Api {
    pub authenticated_support: bool,
    pub authenticated_websocket_support: bool,
    pub credentials: Credentials,
    pub validator: CredentialsValidator,
    pub endpoints: Endpoints,
}

pub struct Base {
    pub name: String,
    pub enabled: bool,
    pub verbose: bool,
    pub loaded_by_config: bool,
    /// Let authenticated calls through without credential checks
    pub skip_auth_check: bool,
    pub api: Api,
    pub pairs: PairsManager,
    pub features: Features,
    pub requester: Requester,
    /// Shared with stream reader tasks
    pub store: Arc<MarketStore>,
    pub websocket: WebsocketSettings,
    http_timeout: Duration,
    custom_transport: bool,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Base {
    /// Disabled base with the production HTTPS transport and no settings
    pub fn new(name: &str) -> Self {
        let http_timeout = Duration::from_millis(crate::config::DEFAULT_HTTP_TIMEOUT_MS);
        let transport = MonoioHttpsClient::new().with_timeout(Some(http_timeout));
        Self {
            name: name.to_string(),
            enabled: false,
            verbose: false,
            loaded_by_config: false,
            skip_auth_check: false,
            api: Api {
                endpoints: Endpoints::new(name),
                ..Default::default()
            },
            pairs: PairsManager::default(),
            features: Features::default(),
            requester: Requester::new(name, Arc::new(transport)),
            store: Arc::new(MarketStore::new()),
            websocket: WebsocketSettings::default(),
            http_timeout,
            custom_transport: false,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Apply a loaded config on top of the adapter defaults
    pub fn setup(&mut self, config: &ExchangeConfig) -> Result<()> {
        if !config.name.eq_ignore_ascii_case(&self.name) {
            return Err(ExchangeError::ConfigurationError(format!(
                "config for {} applied to {}",
                config.name, self.name
            )));
        }
        self.loaded_by_config = true;

        if !config.enabled {
            self.enabled = false;
            info!("⏸️ {} disabled by config", self.name);
            return Ok(());
        }
        self.enabled = true;
        self.verbose = config.verbose;
        self.requester.set_verbose(config.verbose);

        self.apply_api_config(&config.api)?;
        self.apply_pair_config(&config.currency_pairs)?;

        self.features.enabled = config.features.enabled;
        if !self.features.supports.websocket {
            self.features.enabled.websocket_api = false;
        }

        if config.http_timeout_ms > 0 {
            self.set_http_timeout(config.http_timeout());
        }
        if !config.http_user_agent.is_empty() {
            self.set_http_client_user_agent(&config.http_user_agent);
        }
        self.websocket = config.websocket;

        info!(
            "✅ {} configured (auth: {}, verbose: {})",
            self.name, self.api.authenticated_support, self.verbose
        );
        Ok(())
    }

    fn apply_api_config(&mut self, api: &ApiConfig) -> Result<()> {
        self.api.authenticated_support = api.authenticated_support;
        self.api.authenticated_websocket_support = api.authenticated_websocket_api_support;

        let creds = &api.credentials;
        if !creds.key.is_empty() || !creds.secret.is_empty() {
            self.api.credentials = creds.clone();
        }

        if self.api.authenticated_support && !self.skip_auth_check {
            if let Err(e) = self.validate_credentials() {
                warn!(
                    "⚠️ {} authenticated support disabled: {}",
                    self.name, e
                );
                self.api.authenticated_support = false;
                self.api.authenticated_websocket_support = false;
            }
        }

        for (name, url) in &api.urls {
            if url.is_empty() {
                continue;
            }
            let kind = UrlKind::from_str(name)?;
            self.api.endpoints.set_running(kind, url)?;
        }
        Ok(())
    }

    /// Copy enabled/available lists for assets this adapter supports.
    /// Wire formats stay the adapter's own.
    fn apply_pair_config(&mut self, configured: &PairsManager) -> Result<()> {
        for (asset, stored) in &configured.pairs {
            if !self.pairs.supports(*asset) {
                warn!("⚠️ {} ignoring pairs for unsupported asset {}", self.name, asset);
                continue;
            }
            if !stored.available.is_empty() {
                self.pairs.store_pairs(*asset, stored.available.clone(), false)?;
            }
            let available = self.pairs.get(*asset, false)?;
            let enabled: Vec<Pair> = stored
                .enabled
                .iter()
                .filter(|p| {
                    let known = available.is_empty() || available.contains_pair(p, false);
                    if !known {
                        warn!("⚠️ {} dropping unavailable enabled pair {}", self.name, p);
                    }
                    known
                })
                .cloned()
                .collect();
            if !available.is_empty() {
                self.pairs.store_pairs(*asset, enabled, true)?;
            }
            self.pairs.set_asset_enabled(*asset, stored.asset_enabled)?;
        }
        if configured.last_updated > 0 {
            self.pairs.last_updated = configured.last_updated;
        }
        Ok(())
    }

    /// Store credentials. Venues publishing base64 secrets must decode.
    pub fn set_credentials(&mut self, key: &str, secret: &str, client_id: &str, otp: &str) -> Result<()> {
        let credentials = Credentials {
            key: key.to_string(),
            secret: secret.to_string(),
            client_id: client_id.to_string(),
            one_time_password: otp.to_string(),
            sub_account: self.api.credentials.sub_account.clone(),
        };
        if self.api.validator.requires_base64_decode_secret && !secret.is_empty() {
            credentials.decoded_secret()?;
        }
        self.api.credentials = credentials;
        Ok(())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.api.credentials
    }

    pub fn validate_credentials(&self) -> Result<()> {
        self.api.validator.validate(&self.name, &self.api.credentials)
    }

    pub fn allow_authenticated_request(&self) -> bool {
        self.skip_auth_check
            || (self.api.authenticated_support && self.validate_credentials().is_ok())
    }

    /// Gate for every private endpoint
    pub fn check_authenticated(&self) -> Result<()> {
        if self.allow_authenticated_request() {
            Ok(())
        } else {
            Err(ExchangeError::AuthenticationSupportNotEnabled(self.name.clone()))
        }
    }

    pub fn authenticated_api_support(&self, websocket: bool) -> bool {
        if websocket {
            self.api.authenticated_websocket_support
        } else {
            self.api.authenticated_support
        }
    }

    pub fn asset_types(&self) -> Vec<Asset> {
        self.pairs.assets()
    }

    pub fn supports_asset(&self, asset: Asset) -> bool {
        self.pairs.supports(asset)
    }

    pub fn pair_format(&self, asset: Asset, request: bool) -> Result<PairFormat> {
        self.pairs.format(asset, request)
    }

    /// Pair spelled the way the venue expects on the wire
    pub fn format_exchange_currency(&self, pair: &Pair, asset: Asset) -> Result<String> {
        if pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        Ok(pair.format(&self.pair_format(asset, true)?))
    }

    pub fn enabled_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        self.pairs.get(asset, true)
    }

    pub fn available_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        self.pairs.get(asset, false)
    }

    /// Pairs a batch ticker refresh covers: the enabled pairs, or every
    /// available pair when none are enabled
    pub fn ticker_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        let enabled = self.enabled_pairs(asset)?;
        if !enabled.is_empty() {
            return Ok(enabled);
        }
        self.available_pairs(asset)
    }

    pub fn set_pairs(&mut self, pairs: Vec<Pair>, asset: Asset, enabled: bool) -> Result<()> {
        self.pairs.store_pairs(asset, pairs, enabled)
    }

    /// Replace a pair list, logging what changed. Unchanged lists are left
    /// alone unless `force`. Shrinking the available list also drops
    /// enabled pairs that disappeared.
    pub fn update_pairs(&mut self, incoming: Vec<Pair>, asset: Asset, enabled: bool, force: bool) -> Result<()> {
        let current = self.pairs.get(asset, enabled)?;
        let diff = current.find_differences(&incoming);
        let kind = if enabled { "enabled" } else { "available" };

        if diff.is_empty() && !force {
            return Ok(());
        }
        if force {
            info!("🔄 {} forced {} {} pair update ({} pairs)", self.name, asset, kind, incoming.len());
        }
        if !diff.added.is_empty() {
            info!("➕ {} {} {} pairs added: {}", self.name, asset, kind, join(&diff.added));
        }
        if !diff.removed.is_empty() {
            info!("➖ {} {} {} pairs removed: {}", self.name, asset, kind, join(&diff.removed));
        }

        if enabled {
            self.pairs.store_pairs(asset, incoming, true)?;
        } else {
            let still_enabled: Vec<Pair> = self
                .pairs
                .get(asset, true)?
                .into_iter()
                .filter(|p| {
                    let kept = incoming.contains_pair(p, false);
                    if !kept {
                        warn!("⚠️ {} disabling delisted pair {} {}", self.name, asset, p);
                    }
                    kept
                })
                .collect();
            self.pairs.store_pairs(asset, incoming, false)?;
            self.pairs.store_pairs(asset, still_enabled, true)?;
        }
        self.pairs.last_updated = unix_secs();
        Ok(())
    }

    pub fn last_pairs_update_time(&self) -> u64 {
        self.pairs.last_updated
    }

    pub fn supports_auto_pair_updates(&self) -> bool {
        self.features.enabled.auto_pair_updates
    }

    pub fn supports_rest_ticker_batch_updates(&self) -> bool {
        self.features.supports.rest_capabilities.ticker_batching
    }

    pub fn supports_rest(&self) -> bool {
        self.features.supports.rest
    }

    pub fn supports_websocket(&self) -> bool {
        self.features.supports.websocket
    }

    pub fn is_websocket_enabled(&self) -> bool {
        self.features.supports.websocket && self.features.enabled.websocket_api
    }

    pub fn withdraw_permissions(&self) -> WithdrawPermissions {
        self.features.supports.withdraw_permissions
    }

    pub fn supports_withdraw_permissions(&self, permissions: WithdrawPermissions) -> bool {
        self.withdraw_permissions().contains(permissions)
    }

    pub fn format_withdraw_permissions(&self) -> String {
        self.withdraw_permissions().format()
    }

    pub fn api_url(&self, kind: UrlKind) -> Result<String> {
        self.api.endpoints.get(kind)
    }

    pub fn set_api_url(&mut self, kind: UrlKind, url: &str) -> Result<()> {
        self.api.endpoints.set_running(kind, url)
    }

    /// Current settings as a config that `setup` would reproduce
    pub fn default_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            name: self.name.clone(),
            enabled: true,
            verbose: self.verbose,
            http_timeout_ms: self.http_timeout.as_millis() as u64,
            http_user_agent: self.requester.user_agent().to_string(),
            api: ApiConfig {
                authenticated_support: self.api.authenticated_support,
                authenticated_websocket_api_support: self.api.authenticated_websocket_support,
                credentials: self.api.credentials.clone(),
                credentials_validator: self.api.validator,
                urls: self.api.endpoints.url_map(),
            },
            currency_pairs: self.pairs.clone(),
            features: self.features,
            websocket: self.websocket,
        }
    }

    pub fn set_http_client_user_agent(&mut self, user_agent: &str) {
        self.requester.set_user_agent(user_agent);
    }

    pub fn http_client_user_agent(&self) -> &str {
        self.requester.user_agent()
    }

    /// Rebuilds the HTTPS client; injected transports keep their own timeout
    pub fn set_http_timeout(&mut self, timeout: Duration) {
        self.http_timeout = timeout;
        if !self.custom_transport {
            let transport = MonoioHttpsClient::new().with_timeout(Some(timeout));
            self.requester.set_transport(Arc::new(transport));
        }
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Swap the HTTP transport, e.g. for a mock in tests
    pub fn set_transport(&mut self, transport: Arc<dyn HttpTransport>) {
        self.custom_transport = true;
        self.requester.set_transport(transport);
    }

    pub fn set_rate_limits(&mut self, limits: &[(EndpointLimit, RateLimit)]) {
        for (endpoint, limit) in limits {
            self.requester.set_limit(*endpoint, *limit);
        }
    }

    pub fn disable_rate_limiter(&self) {
        self.requester.disable_rate_limiter();
    }

    pub fn enable_rate_limiter(&self) {
        self.requester.enable_rate_limiter();
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn add_subscriptions(&self, subscriptions: &[Subscription]) {
        if let Ok(mut current) = self.subscriptions.lock() {
            for sub in subscriptions {
                if !current.contains(sub) {
                    current.push(sub.clone());
                }
            }
        }
    }

    pub fn remove_subscriptions(&self, subscriptions: &[Subscription]) {
        if let Ok(mut current) = self.subscriptions.lock() {
            current.retain(|s| !subscriptions.contains(s));
        }
    }
}

fn join(pairs: &[Pair]) -> String {
    pairs.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::DEFAULT_API_KEY;
    use crate::currency::PairFormat;

    fn base() -> Base {
        let mut base = Base::new("Test");
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.pairs = PairsManager::new(PairFormat::new(true, "_"), PairFormat::new(true, "-"));
        base.pairs.register(Asset::Spot, None, None);
        base.api
            .endpoints
            .set_defaults(&[
                (UrlKind::RestSpot, "https://api.test.com"),
                (UrlKind::WebsocketSpot, "wss://ws.test.com"),
            ])
            .unwrap();
        base.pairs
            .store_pairs(
                Asset::Spot,
                vec![Pair::new("BTC", "USD"), Pair::new("ETH", "USD"), Pair::new("LTC", "USD")],
                false,
            )
            .unwrap();
        base.pairs
            .store_pairs(Asset::Spot, vec![Pair::new("BTC", "USD"), Pair::new("LTC", "USD")], true)
            .unwrap();
        base
    }

    #[test]
    fn test_ticker_pairs_fall_back_to_available() {
        let mut base = base();
        assert_eq!(base.ticker_pairs(Asset::Spot).unwrap().len(), 2);

        base.set_pairs(Vec::new(), Asset::Spot, true).unwrap();
        assert_eq!(base.ticker_pairs(Asset::Spot).unwrap(), base.available_pairs(Asset::Spot).unwrap());
        assert!(base.ticker_pairs(Asset::Futures).is_err());
    }

    #[test]
    fn test_auth_gating() {
        let mut base = base();
        assert!(matches!(
            base.check_authenticated(),
            Err(ExchangeError::AuthenticationSupportNotEnabled(_))
        ));

        base.api.authenticated_support = true;
        base.set_credentials(DEFAULT_API_KEY, "secret", "", "").unwrap();
        assert!(!base.allow_authenticated_request());

        base.set_credentials("key", "secret", "", "").unwrap();
        assert!(base.check_authenticated().is_ok());

        base.api.authenticated_support = false;
        base.skip_auth_check = true;
        assert!(base.allow_authenticated_request());
    }

    #[test]
    fn test_base64_secret_required() {
        let mut base = base();
        base.api.validator.requires_base64_decode_secret = true;
        assert!(base.set_credentials("key", "not base64!!", "", "").is_err());
        assert!(base.set_credentials("key", "c2VjcmV0", "", "").is_ok());
    }

    #[test]
    fn test_format_exchange_currency() {
        let base = base();
        assert_eq!(
            base.format_exchange_currency(&Pair::new("btc", "usd"), Asset::Spot).unwrap(),
            "BTC_USD"
        );
        assert!(base.format_exchange_currency(&Pair::default(), Asset::Spot).is_err());
        assert!(base.format_exchange_currency(&Pair::new("BTC", "USD"), Asset::Futures).is_err());
    }

    #[test]
    fn test_update_pairs_drops_delisted_enabled() {
        let mut base = base();
        base.update_pairs(vec![Pair::new("BTC", "USD"), Pair::new("XRP", "USD")], Asset::Spot, false, false)
            .unwrap();

        let available = base.available_pairs(Asset::Spot).unwrap();
        assert_eq!(available.len(), 2);
        let enabled = base.enabled_pairs(Asset::Spot).unwrap();
        assert_eq!(enabled, vec![Pair::new("BTC", "USD")]);
        assert!(base.last_pairs_update_time() > 0);
    }

    #[test]
    fn test_setup() {
        let mut base = base();
        let config = ExchangeConfig::new("test")
            .with_credentials("key", "secret")
            .with_verbose(true)
            .with_url("RestSpotURL", "https://sandbox.test.com/");
        base.setup(&config).unwrap();

        assert!(base.is_verbose());
        assert!(base.allow_authenticated_request());
        assert_eq!(base.api_url(UrlKind::RestSpot).unwrap(), "https://sandbox.test.com");

        let wrong = ExchangeConfig::new("Other");
        assert!(base.setup(&wrong).is_err());

        let disabled = ExchangeConfig {
            enabled: false,
            ..ExchangeConfig::new("Test")
        };
        base.setup(&disabled).unwrap();
        assert!(!base.is_enabled());
    }

    #[test]
    fn test_setup_drops_auth_on_placeholder_keys() {
        let mut base = base();
        let config = ExchangeConfig::new("Test").with_credentials(DEFAULT_API_KEY, "Secret");
        base.setup(&config).unwrap();
        assert!(!base.authenticated_api_support(false));
    }

    #[test]
    fn test_default_config_round_trip() {
        let mut base = base();
        base.set_http_client_user_agent("bot/1.0");
        let config = base.default_config();
        assert_eq!(config.http_user_agent, "bot/1.0");
        assert_eq!(config.api.urls.get("RestSpot").map(String::as_str), Some("https://api.test.com"));

        let mut fresh = base_without_pairs();
        fresh.setup(&config).unwrap();
        assert_eq!(fresh.enabled_pairs(Asset::Spot).unwrap().len(), 2);
        assert_eq!(fresh.http_client_user_agent(), "bot/1.0");
    }

    fn base_without_pairs() -> Base {
        let mut base = Base::new("Test");
        base.pairs = PairsManager::new(PairFormat::new(true, "_"), PairFormat::new(true, "-"));
        base.pairs.register(Asset::Spot, None, None);
        base.api
            .endpoints
            .set_defaults(&[(UrlKind::RestSpot, "https://api.test.com"), (UrlKind::WebsocketSpot, "wss://ws.test.com")])
            .unwrap();
        base
    }

    #[test]
    fn test_subscriptions() {
        let base = base();
        let sub = Subscription {
            channel: "book".to_string(),
            pair: Some(Pair::new("BTC", "USD")),
            asset: Asset::Spot,
        };
        base.add_subscriptions(&[sub.clone(), sub.clone()]);
        assert_eq!(base.subscriptions().len(), 1);
        base.remove_subscriptions(&[sub]);
        assert!(base.subscriptions().is_empty());
    }
}
