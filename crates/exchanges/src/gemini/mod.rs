//! Gemini adapter
//!
//! Symbols are lowercase with no delimiter (`btcusd`), so pairs are split on
//! a list of known quote currencies. Only limit orders exist; market orders
//! are rejected before they reach the venue.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};
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

use self::rest::{GEMINI_API_URL, GEMINI_SANDBOX_URL};
use self::types::Order;

pub const NAME: &str = "Gemini";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.001", "0.0035");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.0001"),
    ("ETH", "0.001"),
    ("ZEC", "0.001"),
    ("BCH", "0.001"),
    ("LTC", "0.001"),
];

/// Longest first so `usdt` wins over `usd`
const QUOTES: &[&str] = &[
    "gusd", "usdt", "usdc", "usd", "dai", "btc", "eth", "eur", "gbp", "sgd", "aud", "bch", "ltc",
];

pub struct Gemini {
    pub base: Base,
    nonce: Nonce,
}

impl Gemini {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, GEMINI_API_URL),
            (UrlKind::RestSandbox, GEMINI_SANDBOX_URL),
            (UrlKind::WebsocketSpot, "wss://api.gemini.com/v1/marketdata"),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(false, ""), PairFormat::new(true, "-"));
        base.pairs.register(Asset::Spot, None, None);

        base.features = Features::rest(
            ProtocolFeatures {
                ticker_fetching: true,
                orderbook_fetching: true,
                trade_fetching: true,
                account_info: true,
                submit_order: true,
                cancel_order: true,
                cancel_orders: true,
                get_order: true,
                get_orders: true,
                user_trade_history: true,
                crypto_deposit: true,
                crypto_withdrawal: true,
                deposit_history: true,
                withdrawal_history: true,
                trade_fee: true,
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION
                | WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP
                | WithdrawPermissions::WITHDRAW_FIAT_VIA_WEBSITE_ONLY,
        );

        // 120 public requests per minute, 600 private
        base.set_rate_limits(&[
            (PUBLIC, RateLimit::new(120, Duration::from_secs(60))),
            (PRIVATE, RateLimit::new(600, Duration::from_secs(60))),
        ]);

        Ok(Self {
            base,
            nonce: Nonce::new(NonceUnit::Millis),
        })
    }

    pub fn use_sandbox(&mut self) -> Result<()> {
        let sandbox = self.base.api_url(UrlKind::RestSandbox)?;
        self.base.set_api_url(UrlKind::RestSpot, &sandbox)
    }

    fn symbol(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    fn detail(order: &Order, asset: Asset) -> Result<Detail> {
        let pair = split_symbol(&order.symbol)?;
        let mut detail = Detail::new(NAME, &order.order_id, pair, asset);
        detail.client_order_id = order.client_order_id.clone().unwrap_or_default();
        detail.side = Side::parse(&order.side);
        detail.order_type = OrderType::parse(&order.order_type);
        detail.status = order_status(order);
        detail.price = order.price;
        detail.amount = order.original_amount;
        detail.executed_amount = order.executed_amount;
        detail.remaining_amount = order.remaining_amount;
        detail.average_executed_price = order.avg_execution_price;
        detail.date = Timestamp::from_millis(order.timestampms);
        detail.last_updated = detail.date;
        detail.infer_remaining();
        Ok(detail)
    }
}

fn parse_order_id(id: &str) -> Result<i64> {
    id.parse().map_err(|_| ExchangeError::OrderNotFound(id.to_string()))
}

/// `btcusd` -> BTC-USD
pub fn split_symbol(symbol: &str) -> Result<Pair> {
    let lower = symbol.to_ascii_lowercase();
    QUOTES
        .iter()
        .find(|quote| lower.len() > quote.len() && lower.ends_with(*quote))
        .map(|quote| Pair::new(&lower[..lower.len() - quote.len()], quote))
        .ok_or_else(|| ExchangeError::InvalidPair(symbol.to_string()))
}

pub fn order_status(order: &Order) -> Status {
    let executed = order.executed_amount.is_positive();
    if order.is_live {
        if executed { Status::PartiallyFilled } else { Status::Active }
    } else if order.is_cancelled {
        if executed { Status::PartiallyCancelled } else { Status::Cancelled }
    } else if order.original_amount.is_positive() && order.executed_amount >= order.original_amount {
        Status::Filled
    } else {
        Status::Unknown
    }
}

#[async_trait(?Send)]
impl BotExchange for Gemini {
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
        let mut pairs = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            match split_symbol(symbol) {
                Ok(pair) => pairs.push(pair),
                Err(_) => warn!("⚠️ {} skipping symbol with unknown quote: {}", NAME, symbol),
            }
        }
        Ok(pairs)
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let tick = self.get_ticker(&self.symbol(pair, asset)?).await?;
        let volume = tick
            .volume
            .get(&pair.base)
            .map(Fixed::from_json)
            .transpose()?
            .unwrap_or(Fixed::ZERO);
        let quote_volume = tick
            .volume
            .get(&pair.quote)
            .map(Fixed::from_json)
            .transpose()?
            .unwrap_or(Fixed::ZERO);
        let last_updated = tick
            .volume
            .get("timestamp")
            .and_then(Value::as_u64)
            .map(Timestamp::from_millis)
            .unwrap_or_else(Timestamp::now);

        let ticker = Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: tick.last,
            bid: tick.bid,
            ask: tick.ask,
            volume,
            quote_volume,
            last_updated,
            ..Default::default()
        };
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let raw = self.get_orderbook(&self.symbol(pair, asset)?).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = raw.bids.iter().map(|e| Level::new(e.price, e.amount)).collect();
        book.asks = raw.asks.iter().map(|e| Level::new(e.price, e.amount)).collect();
        book.last_updated = Timestamp::now();
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let balances = self.get_balances().await?;
        let currencies = balances
            .iter()
            .map(|b| Balance::from_total_and_hold(&b.currency, b.amount, b.amount - b.available))
            .collect();
        let holdings = Holdings {
            exchange: NAME.to_string(),
            accounts: vec![SubAccount {
                id: String::new(),
                asset: Some(asset),
                currencies,
            }],
        };
        self.base.store.process_holdings(holdings.clone(), asset)?;
        Ok(holdings)
    }

    async fn recent_trades(&self, pair: &Pair, asset: Asset) -> Result<Vec<TradeData>> {
        let trades = self.get_trades(&self.symbol(pair, asset)?, None).await?;
        Ok(trades
            .into_iter()
            .map(|t| TradeData {
                tid: t.tid.to_string(),
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: Side::parse(&t.side),
                price: t.price,
                amount: t.amount,
                timestamp: Timestamp::from_millis(t.timestampms),
            })
            .collect())
    }

    async fn historic_trades(
        &self,
        pair: &Pair,
        asset: Asset,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<TradeData>> {
        if end < start {
            return Err(ExchangeError::EndpointError("end before start".to_string()));
        }
        let trades = self
            .get_trades(&self.symbol(pair, asset)?, Some(start.as_millis()))
            .await?;
        Ok(trades
            .into_iter()
            .filter(|t| Timestamp::from_millis(t.timestampms) <= end)
            .map(|t| TradeData {
                tid: t.tid.to_string(),
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: Side::parse(&t.side),
                price: t.price,
                amount: t.amount,
                timestamp: Timestamp::from_millis(t.timestampms),
            })
            .collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let volume = self.get_notional_volume().await?;
                let bps = if builder.is_maker { volume.api_maker_fee_bps } else { volume.api_taker_fee_bps };
                Ok(builder.notional() * Fixed::from_i64(bps) / Fixed::from_i64(10_000))
            }
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let transfers = self.get_transfers().await?;
        Ok(transfers
            .into_iter()
            .map(|t| FundHistory {
                id: t.eid.to_string(),
                status: t.status,
                timestamp: Timestamp::from_millis(t.timestampms),
                currency: t.currency.to_ascii_uppercase(),
                amount: t.amount,
                fee: Fixed::ZERO,
                transfer_type: t.transfer_type,
                crypto_to_address: t.destination,
                crypto_tx_id: t.tx_hash,
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let mut options = Vec::new();
        match order.order_type {
            OrderType::Limit => {}
            OrderType::PostOnly => options.push("maker-or-cancel"),
            OrderType::ImmediateOrCancel => options.push("immediate-or-cancel"),
            OrderType::FillOrKill => options.push("fill-or-kill"),
            other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
        }
        if order.post_only && options.is_empty() {
            options.push("maker-or-cancel");
        }
        if order.immediate_or_cancel && options.is_empty() {
            options.push("immediate-or-cancel");
        }

        let side = if order.side.is_long() { "buy" } else { "sell" };
        let mut params = json!({
            "symbol": self.symbol(&order.pair, order.asset)?,
            "amount": order.amount.to_string_exact(),
            "price": order.price.to_string_exact(),
            "side": side,
            "type": "exchange limit",
        });
        if !options.is_empty() {
            params["options"] = json!(options);
        }
        if !order.client_order_id.is_empty() {
            params["client_order_id"] = json!(order.client_order_id);
        }

        let placed = self.new_order(params).await?;
        log_order!(NAME, "placed", placed.order_id, order.pair, side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: order_status(&placed) == Status::Filled,
            order_id: placed.order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        self.cancel_existing_order(parse_order_id(cancel.require_order_id()?)?).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, _cancel: &Cancel) -> Result<CancelAllResponse> {
        let result = self.cancel_existing_orders(false).await?;
        let mut response = CancelAllResponse::default();
        for id in &result.details.cancelled_orders {
            response.status.insert(id.to_string(), String::new());
        }
        for id in &result.details.cancel_rejects {
            response.status.insert(id.to_string(), "rejected".to_string());
        }
        response.count = result.details.cancelled_orders.len();
        info!("🧹 {} cancelled {} orders", NAME, response.count);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.get_order_status(parse_order_id(order_id)?).await?;
        Self::detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, _chain: &str) -> Result<String> {
        let address = self.get_new_deposit_address(currency, "").await?;
        Ok(address.address)
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let orders = self.get_orders().await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let since = request.start.map(|s| s.as_millis());
        let orders = self.get_orders_history(since).await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let result = self.withdraw(&request.currency, &crypto.address, request.amount).await?;
        if !result.message.is_empty() {
            warn!("⚠️ {} withdrawal message: {}", NAME, result.message);
        }
        info!("💸 {} withdrawal {} of {} {}", NAME, result.withdrawal_id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: if result.withdrawal_id.is_empty() { result.tx_hash } else { result.withdrawal_id },
            status: result.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::mock::MockTransport;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::sync::Arc;

    fn gemini(mock: MockTransport) -> (Gemini, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = Gemini::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("account-key", "secret", "", "").unwrap();
        (exchange, mock)
    }

    fn order_json(is_live: bool, is_cancelled: bool, executed: &str) -> String {
        format!(
            r#"{{"order_id":"106817811","id":"106817811","symbol":"btcusd","exchange":"gemini",
            "avg_execution_price":"3632.8508430064554","side":"buy","type":"exchange limit",
            "timestamp":"1547220404","timestampms":1547220404836,"is_live":{is_live},
            "is_cancelled":{is_cancelled},"is_hidden":false,"was_forced":false,
            "executed_amount":"{executed}","remaining_amount":"0","client_order_id":"20190110-4738721",
            "options":[],"price":"3633.00","original_amount":"3"}}"#
        )
    }

    fn payload(request: &crate::http::HttpRequest) -> Value {
        let encoded = request.header("X-GEMINI-PAYLOAD").unwrap();
        serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn test_split_symbol() {
        assert_eq!(split_symbol("btcusd").unwrap(), Pair::new("BTC", "USD"));
        assert_eq!(split_symbol("ethusdt").unwrap(), Pair::new("ETH", "USDT"));
        assert_eq!(split_symbol("ethbtc").unwrap(), Pair::new("ETH", "BTC"));
        assert_eq!(split_symbol("btcgusd").unwrap(), Pair::new("BTC", "GUSD"));
        assert!(split_symbol("usd").is_err());
        assert!(split_symbol("btcxyz").is_err());
    }

    #[monoio::test]
    async fn test_tradable_pairs_skip_unknown() {
        let (exchange, _) = gemini(MockTransport::new().route(
            Method::Get,
            "/v1/symbols",
            200,
            r#"["btcusd","ethbtc","zecxyz"]"#,
        ));
        let pairs = exchange.fetch_tradable_pairs(Asset::Spot).await.unwrap();
        assert_eq!(pairs, vec![Pair::new("BTC", "USD"), Pair::new("ETH", "BTC")]);
    }

    #[monoio::test]
    async fn test_ticker_volume_by_currency() {
        let (exchange, mock) = gemini(MockTransport::new().route(
            Method::Get,
            "/v1/pubticker/btcusd",
            200,
            r#"{"ask":"977.59","bid":"977.35","last":"977.65","volume":{"BTC":"2210.505328803","USD":"2135477.463379586263","timestamp":1483018200000}}"#,
        ));
        let ticker = exchange.update_ticker(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap();
        assert_eq!(ticker.volume.to_string_exact(), "2210.505328803");
        assert_eq!(ticker.quote_volume.to_string_exact(), "2135477.463379586263");
        assert_eq!(ticker.last_updated, Timestamp::from_millis(1483018200000));
        assert!(mock.last_request().unwrap().url.ends_with("/v1/pubticker/btcusd"));
    }

    #[monoio::test]
    async fn test_balances_signed_payload() {
        let (exchange, mock) = gemini(MockTransport::new().route(
            Method::Post,
            "/v1/balances",
            200,
            r#"[{"type":"exchange","currency":"BTC","amount":"1154.62034001","available":"1129.10517279","availableForWithdrawal":"1129.10517279"}]"#,
        ));
        let holdings = exchange.update_account_info(Asset::Spot).await.unwrap();
        let btc = &holdings.accounts[0].currencies[0];
        assert_eq!(btc.total.to_string_exact(), "1154.62034001");
        assert_eq!(btc.hold.to_string_exact(), "25.51516722");

        let request = mock.last_request().unwrap();
        assert_eq!(request.header("X-GEMINI-APIKEY"), Some("account-key"));
        assert_eq!(request.header("X-GEMINI-SIGNATURE").map(str::len), Some(96));
        assert_eq!(payload(&request)["request"], "/v1/balances");
        assert!(payload(&request)["nonce"].as_u64().is_some());
    }

    #[monoio::test]
    async fn test_submit_post_only() {
        let (exchange, mock) = gemini(MockTransport::new().route(
            Method::Post,
            "/v1/order/new",
            200,
            &order_json(true, false, "0"),
        ));
        let mut order = Submit::limit(
            Pair::new("BTC", "USD"),
            Side::Buy,
            Fixed::from_str_exact("3").unwrap(),
            Fixed::from_str_exact("3633").unwrap(),
        );
        order.post_only = true;
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "106817811");
        assert!(!response.fully_matched);

        let sent = payload(&mock.last_request().unwrap());
        assert_eq!(sent["symbol"], "btcusd");
        assert_eq!(sent["type"], "exchange limit");
        assert_eq!(sent["options"], json!(["maker-or-cancel"]));
    }

    #[monoio::test]
    async fn test_market_order_rejected() {
        let (exchange, mock) = gemini(MockTransport::new());
        let order = Submit::market(Pair::new("BTC", "USD"), Side::Sell, Fixed::ONE);
        assert!(matches!(
            exchange.submit_order(&order).await,
            Err(ExchangeError::TypeIsInvalid(_))
        ));
        assert!(mock.requests().is_empty());
    }

    #[monoio::test]
    async fn test_order_status_flags() {
        let cases = [
            (order_json(true, false, "0"), Status::Active),
            (order_json(true, false, "1"), Status::PartiallyFilled),
            (order_json(false, true, "0"), Status::Cancelled),
            (order_json(false, true, "1"), Status::PartiallyCancelled),
            (order_json(false, false, "3"), Status::Filled),
        ];
        for (body, expected) in cases {
            let (exchange, _) = gemini(MockTransport::new().route(Method::Post, "/v1/order/status", 200, &body));
            let detail = exchange
                .order_info("106817811", &Pair::new("BTC", "USD"), Asset::Spot)
                .await
                .unwrap();
            assert_eq!(detail.status, expected, "{body}");
            assert_eq!(detail.client_order_id, "20190110-4738721");
        }
    }

    #[monoio::test]
    async fn test_cancel_all_reports_rejects() {
        let (exchange, _) = gemini(MockTransport::new().route(
            Method::Post,
            "/v1/order/cancel/all",
            200,
            r#"{"result":"ok","details":{"cancelledOrders":[330429345,330429346],"cancelRejects":[330429347]}}"#,
        ));
        let response = exchange.cancel_all_orders(&Cancel::new("", Pair::new("BTC", "USD"), Asset::Spot)).await.unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(response.status.get("330429347").map(String::as_str), Some("rejected"));
        assert_eq!(response.status.len(), 3);
    }

    #[monoio::test]
    async fn test_api_error_reason() {
        let (exchange, _) = gemini(MockTransport::new().route(
            Method::Post,
            "/v1/order/cancel",
            400,
            r#"{"result":"error","reason":"OrderNotFound","message":"Order 1 not found"}"#,
        ));
        let err = exchange
            .cancel_order(&Cancel::new("1", Pair::new("BTC", "USD"), Asset::Spot))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "OrderNotFound", "Order 1 not found"));
    }

    #[monoio::test]
    async fn test_withdraw() {
        let (exchange, mock) = gemini(MockTransport::new().route(
            Method::Post,
            "/v1/withdraw/btc",
            200,
            r#"{"address":"mi98Z9brJ3TgaKsmvXatuRahbFRUFKRUdR","amount":"1","withdrawalId":"02176a83-a6b1-4202-9b85-1c1c92dd25c4","message":"You have requested a transfer"}"#,
        ));
        let request = WithdrawRequest::crypto("BTC", Fixed::ONE, "mi98Z9brJ3TgaKsmvXatuRahbFRUFKRUdR");
        let response = exchange.withdraw_crypto(&request).await.unwrap();
        assert_eq!(response.id, "02176a83-a6b1-4202-9b85-1c1c92dd25c4");
        assert_eq!(payload(&mock.last_request().unwrap())["amount"], "1");
    }
}
