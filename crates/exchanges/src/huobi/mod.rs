//! Huobi spot adapter
//!
//! Symbols are lowercase with no delimiter (`btcusdt`). Trading endpoints
//! need the spot account id, which is looked up once and cached.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::credentials::CredentialsValidator;
use crate::currency::{Pair, PairFormat};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::exchange::Base;
use crate::fee::{FeeBuilder, FeeType, TradeFeeSchedule, lookup_withdrawal_fee};
use crate::order::{
    Cancel, CancelAllResponse, Detail, GetOrdersRequest, OrderType, Side, Status, Submit,
    SubmitResponse,
};
use crate::orderbook::{Level, Orderbook};
use crate::pairs::PairsManager;
use crate::protocol::{Features, ProtocolFeatures};
use crate::request::{EndpointLimit, RateLimit};
use crate::traits::BotExchange;
use crate::types::{Balance, FundHistory, Holdings, SubAccount, Ticker, TradeData};
use crate::withdraw::{WithdrawPermissions, WithdrawRequest, WithdrawResponse};

use self::rest::HUOBI_API_URL;
use self::types::{MarketTicker, Order, Symbol};

pub const NAME: &str = "Huobi";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.002", "0.002");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BCH", "0.0001"),
    ("BTC", "0.0005"),
    ("EOS", "0.1"),
    ("ETH", "0.005"),
    ("HT", "0.5"),
    ("LTC", "0.001"),
    ("USDT", "20"),
    ("XRP", "0.1"),
];

const HISTORY_STATES: &str = "filled,partial-canceled,canceled";

pub struct Huobi {
    pub base: Base,
    account_id: Mutex<Option<i64>>,
    symbols: Mutex<BTreeMap<String, Pair>>,
}

pub fn order_status(state: &str) -> Status {
    match state {
        "created" => Status::New,
        "submitted" | "pre-submitted" => Status::Active,
        "partial-filled" => Status::PartiallyFilled,
        "filled" => Status::Filled,
        "partial-canceled" => Status::PartiallyCancelled,
        "canceled" => Status::Cancelled,
        "canceling" => Status::PendingCancel,
        "rejected" => Status::Rejected,
        _ => Status::Unknown,
    }
}

/// `buy-limit-maker` to `(Buy, PostOnly)`
pub fn parse_order_type(value: &str) -> (Side, OrderType) {
    let (side, kind) = value.split_once('-').unwrap_or((value, ""));
    let order_type = match kind {
        "limit" => OrderType::Limit,
        "market" => OrderType::Market,
        "limit-maker" => OrderType::PostOnly,
        "ioc" => OrderType::ImmediateOrCancel,
        "limit-fok" => OrderType::FillOrKill,
        "stop-limit" => OrderType::StopLimit,
        _ => OrderType::Unknown,
    };
    (Side::parse(side), order_type)
}

/// Venue `type` field for a submission
pub fn format_order_type(order: &Submit) -> Result<String> {
    let side = if order.side.is_long() { "buy" } else { "sell" };
    let kind = match order.order_type {
        OrderType::Market => "market",
        OrderType::Limit if order.post_only => "limit-maker",
        OrderType::Limit if order.immediate_or_cancel => "ioc",
        OrderType::Limit => "limit",
        OrderType::PostOnly => "limit-maker",
        OrderType::ImmediateOrCancel => "ioc",
        OrderType::FillOrKill => "limit-fok",
        other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
    };
    Ok(format!("{side}-{kind}"))
}

impl Huobi {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, HUOBI_API_URL),
            (UrlKind::WebsocketSpot, "wss://api.huobi.pro/ws"),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(false, ""), PairFormat::new(true, "-"));
        base.pairs.register(Asset::Spot, None, None);

        base.features = Features::rest(
            ProtocolFeatures {
                ticker_fetching: true,
                ticker_batching: true,
                orderbook_fetching: true,
                trade_fetching: true,
                account_info: true,
                submit_order: true,
                cancel_order: true,
                cancel_orders: true,
                get_order: true,
                get_orders: true,
                crypto_deposit: true,
                crypto_withdrawal: true,
                deposit_history: true,
                withdrawal_history: true,
                trade_fee: true,
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP | WithdrawPermissions::NO_FIAT_WITHDRAWALS,
        );

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::new(10, Duration::from_secs(1))),
            (PRIVATE, RateLimit::new(20, Duration::from_secs(2))),
        ]);

        Ok(Self {
            base,
            account_id: Mutex::new(None),
            symbols: Mutex::new(BTreeMap::new()),
        })
    }

    fn symbol(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    fn remember_symbols(&self, symbols: &[Symbol]) {
        if let Ok(mut cache) = self.symbols.lock() {
            for s in symbols {
                cache.insert(s.symbol.clone(), Pair::new(&s.base_currency, &s.quote_currency));
            }
        }
    }

    /// Pair for a venue symbol, via the cached symbol list when present
    fn pair_from_symbol(&self, symbol: &str) -> Result<Pair> {
        if let Some(pair) = self.symbols.lock().ok().and_then(|c| c.get(symbol).cloned()) {
            return Ok(pair);
        }
        for asset_pairs in [self.base.available_pairs(Asset::Spot)?, self.base.enabled_pairs(Asset::Spot)?] {
            if let Some(pair) = asset_pairs.into_iter().find(|p| {
                format!("{}{}", p.base, p.quote).eq_ignore_ascii_case(symbol)
            }) {
                return Ok(pair);
            }
        }
        Err(ExchangeError::InvalidPair(symbol.to_string()))
    }

    /// Spot account id, fetched on first use
    pub async fn spot_account_id(&self) -> Result<i64> {
        if let Some(id) = self.account_id.lock().ok().and_then(|g| *g) {
            return Ok(id);
        }
        let accounts = self.get_accounts().await?;
        let account = accounts
            .iter()
            .find(|a| a.account_type == "spot")
            .ok_or_else(|| ExchangeError::EndpointError(format!("{NAME} has no spot account")))?;
        debug!("📋 {} spot account id {}", NAME, account.id);
        if let Ok(mut cache) = self.account_id.lock() {
            *cache = Some(account.id);
        }
        Ok(account.id)
    }

    /// Refresh the batch ticker pairs with one request
    pub async fn update_tickers(&self, asset: Asset) -> Result<()> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(());
        }
        let tickers = self.get_tickers().await?;
        for pair in pairs {
            let symbol = self.symbol(&pair, asset)?;
            if let Some(t) = tickers.iter().find(|t| t.symbol == symbol) {
                self.base.store.process_ticker(Self::batch_ticker(&pair, asset, t), asset)?;
            }
        }
        Ok(())
    }

    fn batch_ticker(pair: &Pair, asset: Asset, t: &MarketTicker) -> Ticker {
        Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: t.close,
            high: t.high,
            low: t.low,
            bid: t.bid,
            ask: t.ask,
            volume: t.amount,
            quote_volume: t.vol,
            open: t.open,
            close: t.close,
            last_updated: Timestamp::now(),
            ..Default::default()
        }
    }

    fn detail(&self, order: &Order, asset: Asset) -> Result<Detail> {
        let pair = self.pair_from_symbol(&order.symbol)?;
        let mut detail = Detail::new(NAME, &order.id.to_string(), pair, asset);
        let (side, order_type) = parse_order_type(&order.order_type);
        detail.client_order_id = order.client_order_id.clone();
        detail.side = side;
        detail.order_type = order_type;
        detail.status = order_status(&order.state);
        detail.price = order.price;
        detail.amount = order.amount;
        detail.executed_amount = order.filled_amount;
        detail.fee = order.filled_fees;
        if order.filled_amount.is_positive() {
            detail.average_executed_price = order.filled_cash_amount.checked_div(order.filled_amount)?;
        }
        detail.date = Timestamp::from_millis(order.created_at);
        detail.last_updated = Timestamp::from_millis(order.finished_at.max(order.created_at));
        detail.infer_remaining();
        Ok(detail)
    }
}

#[async_trait(?Send)]
impl BotExchange for Huobi {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    async fn fetch_tradable_pairs(&self, asset: Asset) -> Result<Vec<Pair>> {
        if asset != Asset::Spot {
            return Err(ExchangeError::AssetNotSupported(asset.to_string()));
        }
        let symbols = self.get_symbols().await?;
        self.remember_symbols(&symbols);
        Ok(symbols
            .iter()
            .filter(|s| s.state.is_empty() || s.state == "online")
            .map(|s| Pair::new(&s.base_currency, &s.quote_currency))
            .collect())
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let tick = self.get_ticker(&self.symbol(pair, asset)?).await?;
        let first = |levels: &[serde_json::Value]| -> Result<Fixed> {
            match levels.first() {
                Some(price) => Ok(Fixed::from_json(price)?),
                None => Ok(Fixed::ZERO),
            }
        };
        let ticker = Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: tick.close,
            high: tick.high,
            low: tick.low,
            bid: first(&tick.bid)?,
            ask: first(&tick.ask)?,
            volume: tick.amount,
            quote_volume: tick.vol,
            open: tick.open,
            close: tick.close,
            last_updated: Timestamp::now(),
            ..Default::default()
        };
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let depth = self.get_depth(&self.symbol(pair, asset)?).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = depth.bids.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.asks = depth.asks.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.update_id = depth.version;
        book.last_updated = if depth.ts > 0 { Timestamp::from_millis(depth.ts) } else { Timestamp::now() };
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let account_id = self.spot_account_id().await?;
        let balance = self.get_account_balance(account_id).await?;

        let mut per_currency: BTreeMap<String, (Fixed, Fixed)> = BTreeMap::new();
        for row in &balance.list {
            let entry = per_currency.entry(row.currency.to_ascii_uppercase()).or_default();
            match row.balance_type.as_str() {
                "trade" => entry.0 = entry.0 + row.balance,
                "frozen" => entry.1 = entry.1 + row.balance,
                _ => {}
            }
        }
        let currencies = per_currency
            .into_iter()
            .filter(|(_, (free, hold))| !free.is_zero() || !hold.is_zero())
            .map(|(currency, (free, hold))| Balance::from_free_and_hold(&currency, free, hold))
            .collect();
        let holdings = Holdings {
            exchange: NAME.to_string(),
            accounts: vec![SubAccount {
                id: account_id.to_string(),
                asset: Some(asset),
                currencies,
            }],
        };
        self.base.store.process_holdings(holdings.clone(), asset)?;
        Ok(holdings)
    }

    async fn recent_trades(&self, pair: &Pair, asset: Asset) -> Result<Vec<TradeData>> {
        let batches = self.get_trade_history(&self.symbol(pair, asset)?, 100).await?;
        Ok(batches
            .into_iter()
            .flat_map(|b| b.data)
            .map(|t| TradeData {
                tid: t.trade_id.to_string(),
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: Side::parse(&t.direction),
                price: t.price,
                amount: t.amount,
                timestamp: Timestamp::from_millis(t.ts),
            })
            .collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let symbol = self.symbol(&builder.pair, Asset::Spot)?;
                let rates = self.get_fee_rates(&symbol).await?;
                match rates.iter().find(|r| r.symbol == symbol) {
                    Some(rate) => {
                        let value = if builder.is_maker {
                            rate.actual_maker_rate.unwrap_or(rate.maker_fee_rate)
                        } else {
                            rate.actual_taker_rate.unwrap_or(rate.taker_fee_rate)
                        };
                        Ok(builder.notional() * value)
                    }
                    None => Ok(TRADE_FEES.estimate(builder)),
                }
            }
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let mut transfers = self.get_transfers("deposit").await?;
        transfers.extend(self.get_transfers("withdraw").await?);
        let mut history: Vec<FundHistory> = transfers
            .into_iter()
            .map(|t| FundHistory {
                id: t.id.to_string(),
                status: t.state,
                timestamp: Timestamp::from_millis(t.created_at),
                currency: t.currency.to_ascii_uppercase(),
                amount: t.amount,
                fee: t.fee,
                transfer_type: t.transfer_type,
                crypto_to_address: t.address,
                crypto_tx_id: t.tx_hash,
            })
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let account_id = self.spot_account_id().await?;
        let mut body = json!({
            "account-id": account_id.to_string(),
            "symbol": self.symbol(&order.pair, order.asset)?,
            "type": format_order_type(order)?,
            "amount": order.amount.to_string_exact(),
            "source": "spot-api",
        });
        if order.order_type != OrderType::Market {
            body["price"] = json!(order.price.to_string_exact());
        }
        if !order.client_order_id.is_empty() {
            body["client-order-id"] = json!(order.client_order_id);
        }
        let order_id = self.place_order(body).await?;
        log_order!(NAME, "placed", order_id, order.pair, order.side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: false,
            order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        cancel.validate()?;
        if cancel.order_id.is_empty() {
            let state = self.cancel_order_by_client_id(&cancel.client_order_id).await?;
            debug!("🧹 {} client order {} cancel state {}", NAME, cancel.client_order_id, state);
            return Ok(());
        }
        let cancelled = self.cancel_existing_order(&cancel.order_id).await?;
        if cancelled != cancel.order_id {
            return Err(ExchangeError::InvalidResponse(format!(
                "{NAME} cancel returned {cancelled} for {}",
                cancel.order_id
            )));
        }
        Ok(())
    }

    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let account_id = self.spot_account_id().await?;
        let symbol = if cancel.pair.is_empty() {
            String::new()
        } else {
            self.symbol(&cancel.pair, cancel.asset)?
        };
        let result = self.cancel_open_orders(account_id, &symbol).await?;
        let mut response = CancelAllResponse::default();
        response.count = usize::try_from(result.success_count).unwrap_or_default();
        if result.failed_count > 0 {
            response
                .status
                .insert("failed".to_string(), result.failed_count.to_string());
        }
        info!("🧹 {} cancelled {} orders ({} failed)", NAME, result.success_count, result.failed_count);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.get_order(order_id).await?;
        self.detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, chain: &str) -> Result<String> {
        let currency = currency.to_ascii_lowercase();
        let addresses = self.get_deposit_addresses(&currency).await?;
        addresses
            .into_iter()
            .find(|a| chain.is_empty() || a.chain.eq_ignore_ascii_case(chain))
            .map(|a| a.address)
            .ok_or_else(|| ExchangeError::EndpointError(format!("{NAME} has no {currency} address")))
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let account_id = self.spot_account_id().await?;
        let mut orders = Vec::new();
        if request.pairs.is_empty() {
            orders = self.get_open_orders(account_id, "").await?;
        } else {
            for pair in &request.pairs {
                orders.extend(
                    self.get_open_orders(account_id, &self.symbol(pair, request.asset)?)
                        .await?,
                );
            }
        }
        let details = orders
            .iter()
            .map(|o| self.detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        if request.pairs.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let start = request.start.map(|t| t.as_millis());
        let end = request.end.map(|t| t.as_millis());
        let mut details = Vec::new();
        for pair in &request.pairs {
            let symbol = self.symbol(pair, request.asset)?;
            for order in self.get_orders(&symbol, HISTORY_STATES, start, end).await? {
                details.push(self.detail(&order, request.asset)?);
            }
        }
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let id = self
            .create_withdrawal(
                &request.currency.to_ascii_lowercase(),
                &crypto.address,
                &crypto.address_tag,
                &crypto.chain,
                request.amount,
                crypto.fee_amount,
            )
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: id.to_string(),
            status: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::mock::MockTransport;
    use std::sync::Arc;

    const ACCOUNTS: &str = r#"{"status":"ok","data":[{"id":100001,"type":"margin","state":"working"},{"id":100009,"type":"spot","state":"working"}]}"#;

    fn huobi(mock: MockTransport) -> (Huobi, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = Huobi::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("huobi-key", "huobi-secret", "", "").unwrap();
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USDT"), Pair::new("ETH", "BTC")], Asset::Spot, false)
            .unwrap();
        (exchange, mock)
    }

    #[test]
    fn test_order_type_strings() {
        let cases = [
            ("buy-limit", Side::Buy, OrderType::Limit),
            ("sell-market", Side::Sell, OrderType::Market),
            ("buy-limit-maker", Side::Buy, OrderType::PostOnly),
            ("sell-ioc", Side::Sell, OrderType::ImmediateOrCancel),
            ("buy-limit-fok", Side::Buy, OrderType::FillOrKill),
            ("sell-stop-limit", Side::Sell, OrderType::StopLimit),
        ];
        for (raw, side, order_type) in cases {
            assert_eq!(parse_order_type(raw), (side, order_type), "{raw}");
        }

        let mut order = Submit::limit(Pair::new("BTC", "USDT"), Side::Sell, Fixed::ONE, Fixed::ONE);
        order.post_only = true;
        assert_eq!(format_order_type(&order).unwrap(), "sell-limit-maker");
        let market = Submit::market(Pair::new("BTC", "USDT"), Side::Buy, Fixed::ONE);
        assert_eq!(format_order_type(&market).unwrap(), "buy-market");
    }

    #[test]
    fn test_status_table() {
        let cases = [
            ("submitted", Status::Active),
            ("partial-filled", Status::PartiallyFilled),
            ("filled", Status::Filled),
            ("partial-canceled", Status::PartiallyCancelled),
            ("canceled", Status::Cancelled),
            ("canceling", Status::PendingCancel),
            ("created", Status::New),
            ("bogus", Status::Unknown),
        ];
        for (state, expected) in cases {
            assert_eq!(order_status(state), expected, "{state}");
        }
    }

    #[monoio::test]
    async fn test_ticker_from_merged_detail() {
        let (exchange, mock) = huobi(MockTransport::new().route(
            Method::Get,
            "/market/detail/merged",
            200,
            r#"{"status":"ok","ch":"market.btcusdt.detail.merged","ts":1629788763750,"tick":{"id":272156789143,"version":272156789143,"open":50080.0,"close":49820.92,"low":48767.0,"high":50500.0,"amount":12055.365781937457,"vol":5.985618685709001E8,"count":420573,"bid":[49819.48,2.58112],"ask":[49819.49,0.002411]}}"#,
        ));
        let ticker = exchange.update_ticker(&Pair::new("BTC", "USDT"), Asset::Spot).await.unwrap();
        assert_eq!(ticker.bid.to_string_exact(), "49819.48");
        assert_eq!(ticker.ask.to_string_exact(), "49819.49");
        assert_eq!(ticker.open.to_string_exact(), "50080");
        assert!(mock.last_request().unwrap().url.contains("symbol=btcusdt"));
    }

    #[monoio::test]
    async fn test_error_envelope() {
        let (exchange, _) = huobi(MockTransport::new().route(
            Method::Get,
            "/market/depth",
            200,
            r#"{"status":"error","err-code":"invalid-parameter","err-msg":"invalid symbol","data":null}"#,
        ));
        let err = exchange
            .update_orderbook(&Pair::new("BTC", "USDT"), Asset::Spot)
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "invalid-parameter", "invalid symbol"));
    }

    #[monoio::test]
    async fn test_account_id_cached_and_balances_grouped() {
        let (exchange, mock) = huobi(
            MockTransport::new()
                .route(Method::Get, "/v1/account/accounts/100009/balance", 200, r#"{"status":"ok","data":{"id":100009,"type":"spot","state":"working","list":[{"currency":"usdt","type":"trade","balance":"500"},{"currency":"usdt","type":"frozen","balance":"100"},{"currency":"eth","type":"trade","balance":"0"},{"currency":"eth","type":"frozen","balance":"0"}]}}"#)
                .route(Method::Get, "/v1/account/accounts", 200, ACCOUNTS),
        );
        let holdings = exchange.update_account_info(Asset::Spot).await.unwrap();
        assert_eq!(holdings.accounts[0].id, "100009");
        let usdt = &holdings.accounts[0].currencies;
        assert_eq!(usdt.len(), 1);
        assert_eq!(usdt[0].total.to_string_exact(), "600");
        assert_eq!(usdt[0].hold.to_string_exact(), "100");

        exchange.update_account_info(Asset::Spot).await.unwrap();
        let account_lookups = mock
            .requests()
            .iter()
            .filter(|r| r.url.contains("/v1/account/accounts?"))
            .count();
        assert_eq!(account_lookups, 1);
    }

    #[monoio::test]
    async fn test_submit_signs_query() {
        let (exchange, mock) = huobi(
            MockTransport::new()
                .route(Method::Get, "/v1/account/accounts", 200, ACCOUNTS)
                .route(Method::Post, "/v1/order/orders/place", 200, r#"{"status":"ok","data":"356501383558845"}"#),
        );
        let order = Submit::limit(
            Pair::new("BTC", "USDT"),
            Side::Buy,
            Fixed::from_str_exact("0.001").unwrap(),
            Fixed::from_i64(30000),
        );
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "356501383558845");

        let request = mock.last_request().unwrap();
        assert!(request.url.contains("AccessKeyId=huobi-key"));
        assert!(request.url.contains("SignatureMethod=HmacSHA256"));
        assert!(request.url.contains("SignatureVersion=2"));
        assert!(request.url.contains("&Signature="));
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["account-id"], "100009");
        assert_eq!(body["type"], "buy-limit");
        assert_eq!(body["price"], "30000");
    }

    #[monoio::test]
    async fn test_cancel_by_client_order_id() {
        let (exchange, mock) = huobi(MockTransport::new().route(
            Method::Post,
            "/v1/order/orders/submitCancelClientOrder",
            200,
            r#"{"status":"ok","data":10}"#,
        ));
        let mut cancel = Cancel::new("", Pair::new("BTC", "USDT"), Asset::Spot);
        cancel.client_order_id = "tb-a1b2c3".to_string();
        exchange.cancel_order(&cancel).await.unwrap();

        let request = mock.last_request().unwrap();
        assert!(!request.url.contains("/orders//"));
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["client-order-id"], "tb-a1b2c3");
    }

    #[monoio::test]
    async fn test_single_content_type_header() {
        let (exchange, mock) = huobi(
            MockTransport::new()
                .route(Method::Post, "/submitcancel", 200, r#"{"status":"ok","data":"59378"}"#)
                .route(Method::Get, "/v1/order/orders/59378", 200, r#"{"status":"ok","data":{"id":59378,"symbol":"ethbtc","account-id":100009,"amount":"10","price":"0.05","created-at":1494901162595,"type":"sell-limit","field-amount":"0","field-cash-amount":"0","field-fees":"0","finished-at":0,"state":"submitted"}}"#),
        );
        exchange
            .cancel_order(&Cancel::new("59378", Pair::new("ETH", "BTC"), Asset::Spot))
            .await
            .unwrap();
        exchange
            .order_info("59378", &Pair::new("ETH", "BTC"), Asset::Spot)
            .await
            .unwrap();

        for request in mock.requests() {
            let count = request
                .headers
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .count();
            assert_eq!(count, 1, "{}", request.url);
        }
    }

    #[monoio::test]
    async fn test_order_info_average_price() {
        let (exchange, _) = huobi(MockTransport::new().route(
            Method::Get,
            "/v1/order/orders/59378",
            200,
            r#"{"status":"ok","data":{"id":59378,"symbol":"ethbtc","account-id":100009,"amount":"10","price":"0.05","created-at":1494901162595,"type":"sell-limit","field-amount":"4","field-cash-amount":"0.2","field-fees":"0.0004","finished-at":0,"state":"partial-filled"}}"#,
        ));
        let detail = exchange
            .order_info("59378", &Pair::new("ETH", "BTC"), Asset::Spot)
            .await
            .unwrap();
        assert_eq!(detail.pair, Pair::new("ETH", "BTC"));
        assert_eq!(detail.side, Side::Sell);
        assert_eq!(detail.status, Status::PartiallyFilled);
        assert_eq!(detail.average_executed_price.to_string_exact(), "0.05");
        assert_eq!(detail.remaining_amount.to_string_exact(), "6");
    }

    #[monoio::test]
    async fn test_v2_deposit_address() {
        let (exchange, mock) = huobi(MockTransport::new().route(
            Method::Get,
            "/v2/account/deposit/address",
            200,
            r#"{"code":200,"data":[{"currency":"usdt","address":"0xusdt","addressTag":"","chain":"usdterc20"},{"currency":"usdt","address":"Ttrc","addressTag":"","chain":"trc20usdt"}]}"#,
        ));
        assert_eq!(exchange.deposit_address("USDT", "", "trc20usdt").await.unwrap(), "Ttrc");
        assert!(mock.last_request().unwrap().url.contains("currency=usdt"));
    }
}
