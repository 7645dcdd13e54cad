//! The contract every exchange adapter implements
//!
//! Bookkeeping methods have defaults that delegate to the adapter's
//! [`Base`]. Venue operations a venue does not offer keep the default
//! `FunctionNotSupported` body.

use async_trait::async_trait;
use tracing::debug;
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::config::ExchangeConfig;
use crate::currency::Pair;
use crate::errors::{ExchangeError, Result};
use crate::exchange::Base;
use crate::fee::FeeBuilder;
use crate::order::{
    Cancel, CancelAllResponse, Detail, GetOrdersRequest, Modify, ModifyResponse, Submit,
    SubmitResponse,
};
use crate::orderbook::Orderbook;
use crate::types::{FundHistory, Holdings, Subscription, Ticker, TradeData};
use crate::withdraw::{WithdrawPermissions, WithdrawRequest, WithdrawResponse};

/// Futures are `!Send`; adapters run on one monoio thread
#[async_trait(?Send)]
pub trait BotExchange {
    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.base_mut().set_enabled(enabled)
    }

    fn setup(&mut self, config: &ExchangeConfig) -> Result<()> {
        self.base_mut().setup(config)
    }

    fn asset_types(&self) -> Vec<Asset> {
        self.base().asset_types()
    }

    fn supports_asset(&self, asset: Asset) -> bool {
        self.base().supports_asset(asset)
    }

    fn enabled_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        self.base().enabled_pairs(asset)
    }

    fn available_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        self.base().available_pairs(asset)
    }

    fn set_pairs(&mut self, pairs: Vec<Pair>, asset: Asset, enabled: bool) -> Result<()> {
        self.base_mut().set_pairs(pairs, asset, enabled)
    }

    fn authenticated_api_support(&self, websocket: bool) -> bool {
        self.base().authenticated_api_support(websocket)
    }

    fn supports_auto_pair_updates(&self) -> bool {
        self.base().supports_auto_pair_updates()
    }

    fn supports_rest_ticker_batch_updates(&self) -> bool {
        self.base().supports_rest_ticker_batch_updates()
    }

    fn last_pairs_update_time(&self) -> u64 {
        self.base().last_pairs_update_time()
    }

    fn withdraw_permissions(&self) -> WithdrawPermissions {
        self.base().withdraw_permissions()
    }

    fn supports_withdraw_permissions(&self, permissions: WithdrawPermissions) -> bool {
        self.base().supports_withdraw_permissions(permissions)
    }

    fn format_withdraw_permissions(&self) -> String {
        self.base().format_withdraw_permissions()
    }

    fn set_http_client_user_agent(&mut self, user_agent: &str) {
        self.base_mut().set_http_client_user_agent(user_agent)
    }

    fn http_client_user_agent(&self) -> String {
        self.base().http_client_user_agent().to_string()
    }

    fn supports_rest(&self) -> bool {
        self.base().supports_rest()
    }

    fn supports_websocket(&self) -> bool {
        self.base().supports_websocket()
    }

    fn default_config(&self) -> ExchangeConfig {
        self.base().default_config()
    }

    fn disable_rate_limiter(&self) {
        self.base().disable_rate_limiter()
    }

    fn enable_rate_limiter(&self) {
        self.base().enable_rate_limiter()
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        self.base().subscriptions()
    }

    /// Pairs the venue currently lists for `asset`
    async fn fetch_tradable_pairs(&self, asset: Asset) -> Result<Vec<Pair>>;

    /// Refresh the available pairs of every supported asset
    async fn update_tradable_pairs(&mut self, force: bool) -> Result<()> {
        for asset in self.asset_types() {
            let pairs = self.fetch_tradable_pairs(asset).await?;
            debug!("📋 {} listed {} {} pairs", self.name(), pairs.len(), asset);
            self.base_mut().update_pairs(pairs, asset, false, force)?;
        }
        Ok(())
    }

    /// Query the venue and store the result
    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker>;

    /// Stored ticker, else [`update_ticker`](Self::update_ticker)
    async fn fetch_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        match self.base().store.get_ticker(pair, asset) {
            Ok(ticker) => Ok(ticker),
            Err(_) => self.update_ticker(pair, asset).await,
        }
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook>;

    async fn fetch_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        match self.base().store.get_orderbook(pair, asset) {
            Ok(book) => Ok(book),
            Err(_) => self.update_orderbook(pair, asset).await,
        }
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings>;

    async fn fetch_account_info(&self, asset: Asset) -> Result<Holdings> {
        match self.base().store.get_holdings(asset) {
            Ok(holdings) => Ok(holdings),
            Err(_) => self.update_account_info(asset).await,
        }
    }

    async fn recent_trades(&self, _pair: &Pair, _asset: Asset) -> Result<Vec<TradeData>> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn historic_trades(
        &self,
        _pair: &Pair,
        _asset: Asset,
        _start: Timestamp,
        _end: Timestamp,
    ) -> Result<Vec<TradeData>> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed>;

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse>;

    async fn modify_order(&self, _action: &Modify) -> Result<ModifyResponse> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()>;

    async fn cancel_all_orders(&self, _cancel: &Cancel) -> Result<CancelAllResponse> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn order_info(&self, order_id: &str, pair: &Pair, asset: Asset) -> Result<Detail>;

    async fn deposit_address(&self, _currency: &str, _account_id: &str, _chain: &str) -> Result<String> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>>;

    async fn order_history(&self, _request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse>;

    /// Bank withdrawals are never routed through adapters
    async fn withdraw_fiat(&self, _request: &WithdrawRequest) -> Result<WithdrawResponse> {
        Err(ExchangeError::FunctionNotSupported)
    }

    async fn withdraw_fiat_international_bank(&self, _request: &WithdrawRequest) -> Result<WithdrawResponse> {
        Err(ExchangeError::FunctionNotSupported)
    }
}
