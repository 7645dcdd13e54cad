//! Coinbase Pro adapter
//!
//! Product ids are `BTC-USD`. Requests are signed with the base64-decoded
//! secret; the API passphrase travels as the credentials' client id.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::credentials::CredentialsValidator;
use crate::currency::{Pair, PairFormat};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::exchange::Base;
use crate::fee::{FeeBuilder, FeeType, TradeFeeSchedule};
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

use self::rest::{COINBASE_API_URL, COINBASE_SANDBOX_URL};
use self::types::Order;

pub const NAME: &str = "CoinbasePro";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.004", "0.006");

pub struct CoinbasePro {
    pub base: Base,
}

impl CoinbasePro {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator {
            requires_client_id: true,
            requires_base64_decode_secret: true,
            ..CredentialsValidator::key_and_secret()
        };
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, COINBASE_API_URL),
            (UrlKind::RestSandbox, COINBASE_SANDBOX_URL),
            (UrlKind::WebsocketSpot, "wss://ws-feed.pro.coinbase.com"),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(true, "-"), PairFormat::new(true, "-"));
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
                crypto_withdrawal: true,
                deposit_history: true,
                withdrawal_history: true,
                trade_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION
                | WithdrawPermissions::AUTO_WITHDRAW_FIAT_WITH_API_PERMISSION,
        );

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::per_second(3)),
            (PRIVATE, RateLimit::per_second(5)),
        ]);

        Ok(Self { base })
    }

    /// Point REST calls at the public sandbox
    pub fn use_sandbox(&mut self) -> Result<()> {
        let sandbox = self.base.api_url(UrlKind::RestSandbox)?;
        self.base.set_api_url(UrlKind::RestSpot, &sandbox)
    }

    fn product_id(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    fn detail(order: &Order, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.product_id, "-")?;
        let mut detail = Detail::new(NAME, &order.id, pair, asset);
        detail.client_order_id = order.client_oid.clone();
        detail.side = Side::parse(&order.side);
        detail.order_type = OrderType::parse(&order.order_type);
        detail.status = order_status(order);
        detail.price = order.price;
        detail.amount = order.size;
        detail.executed_amount = order.filled_size;
        if order.filled_size.is_positive() {
            detail.average_executed_price = order.executed_value.checked_div(order.filled_size)?;
        }
        detail.fee = order.fill_fees;
        detail.date = Timestamp::parse_rfc3339(&order.created_at).unwrap_or_default();
        detail.last_updated = Timestamp::parse_rfc3339(&order.done_at).unwrap_or(detail.date);
        detail.infer_remaining();
        Ok(detail)
    }
}

/// `done` orders carry the real outcome in `done_reason`
pub fn order_status(order: &Order) -> Status {
    let partial = order.filled_size.is_positive();
    match (order.status.as_str(), order.done_reason.as_str()) {
        ("done", "filled") => Status::Filled,
        ("done", "canceled") if partial => Status::PartiallyCancelled,
        ("done", "canceled") => Status::Cancelled,
        ("done", "rejected") | ("rejected", _) => Status::Rejected,
        ("open", _) if partial => Status::PartiallyFilled,
        ("open", _) | ("active", _) => Status::Active,
        ("pending", _) | ("received", _) => Status::New,
        (other, _) => Status::parse(other),
    }
}

#[async_trait(?Send)]
impl BotExchange for CoinbasePro {
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
        let products = self.get_products().await?;
        Ok(products
            .iter()
            .filter(|p| !p.trading_disabled && (p.status.is_empty() || p.status == "online"))
            .map(|p| Pair::new(&p.base_currency, &p.quote_currency))
            .collect())
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let id = self.product_id(pair, asset)?;
        let tick = self.get_ticker(&id).await?;
        let stats = self.get_stats(&id).await?;
        let ticker = Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: tick.price,
            high: stats.high,
            low: stats.low,
            bid: tick.bid,
            ask: tick.ask,
            volume: tick.volume,
            open: stats.open,
            last_updated: Timestamp::parse_rfc3339(&tick.time).unwrap_or_else(Timestamp::now),
            ..Default::default()
        };
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let id = self.product_id(pair, asset)?;
        let raw = self.get_orderbook(&id).await?;

        let level = |row: &serde_json::Value| -> Result<Level> {
            let mut level = Level::from_pair_value(row)?;
            level.count = row.get(2).and_then(serde_json::Value::as_i64);
            Ok(level)
        };
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = raw.bids.iter().map(level).collect::<Result<_>>()?;
        book.asks = raw.asks.iter().map(level).collect::<Result<_>>()?;
        book.update_id = raw.sequence;
        book.last_updated = Timestamp::now();
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let accounts = self.get_accounts().await?;
        let currencies = accounts
            .iter()
            .map(|a| Balance {
                currency: a.currency.to_ascii_uppercase(),
                total: a.balance,
                hold: a.hold,
                free: a.available,
            })
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
        let trades = self.get_trades(&self.product_id(pair, asset)?).await?;
        Ok(trades
            .into_iter()
            .map(|t| TradeData {
                tid: t.trade_id.to_string(),
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: Side::parse(&t.side),
                price: t.price,
                amount: t.size,
                timestamp: Timestamp::parse_rfc3339(&t.time).unwrap_or_default(),
            })
            .collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let rates = self.get_fees().await?;
                let rate = if builder.is_maker { rates.maker_fee_rate } else { rates.taker_fee_rate };
                Ok(builder.notional() * rate)
            }
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let transfers = self.get_transfers().await?;
        Ok(transfers
            .into_iter()
            .map(|t| {
                let status = if t.canceled_at.is_some() {
                    "Cancelled"
                } else if t.completed_at.is_some() {
                    "Completed"
                } else {
                    "Pending"
                };
                FundHistory {
                    id: t.id,
                    status: status.to_string(),
                    timestamp: Timestamp::parse_rfc3339(&t.created_at).unwrap_or_default(),
                    currency: t.details.currency.to_ascii_uppercase(),
                    amount: t.amount,
                    fee: t.details.fee,
                    transfer_type: t.transfer_type,
                    crypto_to_address: t.details.crypto_address,
                    crypto_tx_id: t.details.crypto_transaction_hash,
                }
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let side = if order.side.is_long() { "buy" } else { "sell" };
        let mut body = json!({
            "product_id": self.product_id(&order.pair, order.asset)?,
            "side": side,
            "size": order.amount.to_string_exact(),
        });
        match order.order_type {
            OrderType::Market => body["type"] = json!("market"),
            OrderType::Limit | OrderType::PostOnly | OrderType::ImmediateOrCancel | OrderType::FillOrKill => {
                body["type"] = json!("limit");
                body["price"] = json!(order.price.to_string_exact());
                let tif = match order.order_type {
                    OrderType::ImmediateOrCancel => "IOC",
                    OrderType::FillOrKill => "FOK",
                    _ if order.immediate_or_cancel => "IOC",
                    _ => "GTC",
                };
                body["time_in_force"] = json!(tif);
                if order.post_only || order.order_type == OrderType::PostOnly {
                    body["post_only"] = json!(true);
                }
            }
            OrderType::Stop | OrderType::StopLimit => {
                body["type"] = json!("limit");
                body["price"] = json!(order.price.to_string_exact());
                body["stop"] = json!(if order.side.is_long() { "entry" } else { "loss" });
                body["stop_price"] = json!(order.trigger_price.to_string_exact());
            }
            other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
        }
        if !order.client_order_id.is_empty() {
            body["client_oid"] = json!(order.client_order_id);
        }

        let placed = self.place_order(body).await?;
        log_order!(NAME, "placed", placed.id, order.pair, side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: order_status(&placed) == Status::Filled,
            order_id: placed.id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        cancel.validate()?;
        let id = if cancel.order_id.is_empty() {
            format!("client:{}", cancel.client_order_id)
        } else {
            cancel.order_id.clone()
        };
        self.cancel_existing_order(&id).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let product = if cancel.pair.is_empty() {
            None
        } else {
            Some(self.product_id(&cancel.pair, cancel.asset)?)
        };
        let ids = self.cancel_all_existing_orders(product.as_deref()).await?;
        Ok(CancelAllResponse {
            count: ids.len(),
            status: ids.into_iter().map(|id| (id, String::new())).collect(),
        })
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.get_order(order_id).await?;
        Self::detail(&order, asset)
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let product = match request.pairs.as_slice() {
            [single] => Some(self.product_id(single, request.asset)?),
            _ => None,
        };
        let orders = self.get_orders(&["open", "pending", "active"], product.as_deref()).await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let product = match request.pairs.as_slice() {
            [single] => Some(self.product_id(single, request.asset)?),
            _ => None,
        };
        let orders = self.get_orders(&["done"], product.as_deref()).await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let result = self
            .withdraw_to_crypto_address(&request.currency, request.amount, &crypto.address, &crypto.address_tag)
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, result.id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: result.id,
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

    fn coinbase(mock: MockTransport) -> (CoinbasePro, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = CoinbasePro::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("cb-key", "c2VjcmV0", "passphrase", "").unwrap();
        (exchange, mock)
    }

    fn order_json(status: &str, done_reason: &str, filled: &str) -> String {
        format!(
            r#"{{"id":"d0c5340b-6d6c-49d9-b567-48c4bfca13d2","price":"0.10000000","size":"0.01000000",
            "product_id":"BTC-USD","side":"buy","type":"limit","post_only":false,
            "created_at":"2016-12-08T20:02:28.53864Z","done_at":"2016-12-08T20:09:05.508883Z",
            "done_reason":"{done_reason}","fill_fees":"0.0000000000000000","filled_size":"{filled}",
            "executed_value":"0.0010000000000000","status":"{status}","settled":true}}"#
        )
    }

    #[monoio::test]
    async fn test_ticker_merges_stats() {
        let (exchange, mock) = coinbase(
            MockTransport::new()
                .route(
                    Method::Get,
                    "/products/BTC-USD/ticker",
                    200,
                    r#"{"trade_id":4729088,"price":"333.99","size":"0.193","bid":"333.98","ask":"333.99","volume":"5957.11914015","time":"2015-11-14T20:46:03.511254Z"}"#,
                )
                .route(
                    Method::Get,
                    "/products/BTC-USD/stats",
                    200,
                    r#"{"open":"6745.61","high":"7292.11","low":"6650","volume":"26185.51","last":"333.99"}"#,
                ),
        );
        let ticker = exchange.update_ticker(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap();
        assert_eq!(ticker.last.to_string_exact(), "333.99");
        assert_eq!(ticker.high.to_string_exact(), "7292.11");
        assert_eq!(mock.requests().len(), 2);
    }

    #[monoio::test]
    async fn test_accounts_signed() {
        let (exchange, mock) = coinbase(MockTransport::new().route(
            Method::Get,
            "/accounts",
            200,
            r#"[{"id":"71452118","currency":"BTC","balance":"1.5","available":"1.0","hold":"0.5","profile_id":"75da88c5"}]"#,
        ));
        let holdings = exchange.update_account_info(Asset::Spot).await.unwrap();
        assert_eq!(holdings.accounts[0].currencies[0].hold.to_string_exact(), "0.5");

        let request = mock.last_request().unwrap();
        assert_eq!(request.header("CB-ACCESS-KEY"), Some("cb-key"));
        assert_eq!(request.header("CB-ACCESS-PASSPHRASE"), Some("passphrase"));
        assert!(request.header("CB-ACCESS-SIGN").is_some());
        assert!(request.header("CB-ACCESS-TIMESTAMP").is_some());
    }

    #[monoio::test]
    async fn test_submit_limit_order() {
        let (exchange, mock) = coinbase(MockTransport::new().route(
            Method::Post,
            "/orders",
            200,
            &order_json("pending", "", "0"),
        ));
        let mut order = Submit::limit(Pair::new("BTC", "USD"), Side::Buy, Fixed::from_str_exact("0.01").unwrap(), Fixed::from_str_exact("0.1").unwrap());
        order.post_only = true;
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "d0c5340b-6d6c-49d9-b567-48c4bfca13d2");
        assert!(!response.fully_matched);

        let body: serde_json::Value = serde_json::from_str(&mock.last_request().unwrap().body.unwrap()).unwrap();
        assert_eq!(body["product_id"], "BTC-USD");
        assert_eq!(body["type"], "limit");
        assert_eq!(body["post_only"], true);
        assert_eq!(body["time_in_force"], "GTC");
    }

    #[monoio::test]
    async fn test_order_info_done_reason() {
        let cases = [
            (order_json("done", "filled", "0.01"), Status::Filled),
            (order_json("done", "canceled", "0"), Status::Cancelled),
            (order_json("done", "canceled", "0.005"), Status::PartiallyCancelled),
            (order_json("open", "", "0.005"), Status::PartiallyFilled),
            (order_json("pending", "", "0"), Status::New),
        ];
        for (body, expected) in cases {
            let (exchange, _) = coinbase(MockTransport::new().route(Method::Get, "/orders/", 200, &body));
            let detail = exchange
                .order_info("d0c5340b-6d6c-49d9-b567-48c4bfca13d2", &Pair::new("BTC", "USD"), Asset::Spot)
                .await
                .unwrap();
            assert_eq!(detail.status, expected, "{body}");
            assert_eq!(detail.pair, Pair::new("BTC", "USD"));
        }
    }

    #[monoio::test]
    async fn test_error_message_surfaces() {
        let (exchange, _) = coinbase(MockTransport::new().route(
            Method::Delete,
            "/orders/abc",
            404,
            r#"{"message":"order not found"}"#,
        ));
        let err = exchange
            .cancel_order(&Cancel::new("abc", Pair::new("BTC", "USD"), Asset::Spot))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 404, "order not found"));
    }

    #[monoio::test]
    async fn test_deposit_address_unsupported() {
        let (exchange, _) = coinbase(MockTransport::new());
        assert_eq!(
            exchange.deposit_address("BTC", "", "").await.unwrap_err(),
            ExchangeError::FunctionNotSupported
        );
    }

    #[test]
    fn test_sandbox_switch() {
        let mut exchange = CoinbasePro::new().unwrap();
        exchange.use_sandbox().unwrap();
        assert_eq!(exchange.base.api_url(UrlKind::RestSpot).unwrap(), COINBASE_SANDBOX_URL);
    }
}
