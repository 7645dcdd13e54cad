//! BTCMarkets adapter (v3 API)
//!
//! Market ids are `BTC-AUD`; sides are `Bid`/`Ask`. Orders can be amended in
//! place through the replace endpoint.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::credentials::CredentialsValidator;
use crate::currency::{Pair, PairFormat};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::exchange::Base;
use crate::fee::{FeeBuilder, FeeType, TradeFeeSchedule, lookup_withdrawal_fee};
use crate::order::{
    Cancel, CancelAllResponse, Detail, GetOrdersRequest, Modify, ModifyResponse, OrderType, Side,
    Status, Submit, SubmitResponse,
};
use crate::orderbook::{Level, Orderbook};
use crate::pairs::PairsManager;
use crate::protocol::{Features, ProtocolFeatures};
use crate::request::{EndpointLimit, RateLimit};
use crate::traits::BotExchange;
use crate::types::{Balance, FundHistory, Holdings, SubAccount, Ticker, TradeData};
use crate::withdraw::{WithdrawPermissions, WithdrawRequest, WithdrawResponse};

use self::rest::BTCMARKETS_API_URL;
use self::types::{MarketTicker, Order};

pub const NAME: &str = "BTCMarkets";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.0085", "0.0085");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.0005"),
    ("ETH", "0.01"),
    ("LTC", "0.001"),
    ("XRP", "0.15"),
    ("BCH", "0.0001"),
    ("ETC", "0.001"),
    ("OMG", "0.15"),
    ("POWR", "10"),
];

pub struct BtcMarkets {
    pub base: Base,
}

pub fn order_status(status: &str) -> Status {
    match status {
        "Accepted" => Status::New,
        "Placed" => Status::Active,
        "Partially Matched" => Status::PartiallyFilled,
        "Fully Matched" => Status::Filled,
        "Cancelled" => Status::Cancelled,
        "Partially Cancelled" => Status::PartiallyCancelled,
        "Failed" => Status::Rejected,
        other => Status::parse(other),
    }
}

fn side_name(side: Side) -> &'static str {
    if side.is_long() { "Bid" } else { "Ask" }
}

/// `Bid`/`Ask` back to the shared model
fn parse_side(side: &str) -> Side {
    match side {
        "Bid" => Side::Buy,
        "Ask" => Side::Sell,
        other => Side::parse(other),
    }
}

impl BtcMarkets {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator {
            requires_base64_decode_secret: true,
            ..CredentialsValidator::key_and_secret()
        };
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, BTCMARKETS_API_URL),
            (UrlKind::WebsocketSpot, "wss://socket.btcmarkets.net/v2"),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(true, "-"), PairFormat::new(true, "-"));
        base.pairs.register(Asset::Spot, None, None);

        base.features = Features::rest(
            ProtocolFeatures {
                ticker_fetching: true,
                ticker_batching: true,
                orderbook_fetching: true,
                trade_fetching: true,
                account_info: true,
                submit_order: true,
                modify_order: true,
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
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO
                | WithdrawPermissions::AUTO_WITHDRAW_FIAT,
        );

        // 50 requests per 10s for market data, 25 per 10s for trading
        base.set_rate_limits(&[
            (PUBLIC, RateLimit::new(50, Duration::from_secs(10))),
            (PRIVATE, RateLimit::new(25, Duration::from_secs(10))),
        ]);

        Ok(Self { base })
    }

    fn market_id(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    fn ticker(&self, pair: &Pair, asset: Asset, tick: &MarketTicker) -> Ticker {
        Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: tick.last_price,
            high: tick.high24h,
            low: tick.low24h,
            bid: tick.best_bid,
            ask: tick.best_ask,
            volume: tick.volume24h,
            quote_volume: tick.volume_qte24h,
            open: tick.last_price - tick.price24h,
            last_updated: Timestamp::parse_rfc3339(&tick.timestamp).unwrap_or_else(Timestamp::now),
            ..Default::default()
        }
    }

    /// Refresh the batch ticker markets in one request
    pub async fn update_tickers(&self, asset: Asset) -> Result<Vec<Ticker>> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let ids = pairs
            .iter()
            .map(|p| self.market_id(p, asset))
            .collect::<Result<Vec<_>>>()?;
        let ticks = self.get_tickers(&ids).await?;
        let mut tickers = Vec::with_capacity(ticks.len());
        for tick in &ticks {
            let pair = Pair::from_delimited(&tick.market_id, "-")?;
            let ticker = self.ticker(&pair, asset, tick);
            self.base.store.process_ticker(ticker.clone(), asset)?;
            tickers.push(ticker);
        }
        Ok(tickers)
    }

    fn detail(order: &Order, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.market_id, "-")?;
        let mut detail = Detail::new(NAME, &order.order_id, pair, asset);
        detail.client_order_id = order.client_order_id.clone();
        detail.side = parse_side(&order.side);
        detail.order_type = OrderType::parse(&order.order_type);
        detail.status = order_status(&order.status);
        detail.price = order.price;
        detail.amount = order.amount;
        detail.remaining_amount = order.open_amount;
        detail.executed_amount = order.amount - order.open_amount;
        detail.date = Timestamp::parse_rfc3339(&order.creation_time).unwrap_or_default();
        detail.last_updated = detail.date;
        Ok(detail)
    }

    fn single_market(&self, request: &GetOrdersRequest) -> Result<Option<String>> {
        match request.pairs.as_slice() {
            [single] => Ok(Some(self.market_id(single, request.asset)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait(?Send)]
impl BotExchange for BtcMarkets {
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
        let markets = self.get_markets().await?;
        Ok(markets
            .iter()
            .filter(|m| m.status.is_empty() || m.status == "Online")
            .map(|m| Pair::new(&m.base_asset_name, &m.quote_asset_name))
            .collect())
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let tick = self.get_ticker(&self.market_id(pair, asset)?).await?;
        let ticker = self.ticker(pair, asset, &tick);
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let raw = self.get_orderbook(&self.market_id(pair, asset)?).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = raw.bids.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.asks = raw.asks.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.update_id = raw.snapshot_id;
        book.last_updated = Timestamp::now();
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let balances = self.get_account_balance().await?;
        let currencies = balances
            .iter()
            .map(|b| Balance {
                currency: b.asset_name.to_ascii_uppercase(),
                total: b.balance,
                hold: b.locked,
                free: b.available,
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
        let trades = self.get_trades(&self.market_id(pair, asset)?).await?;
        Ok(trades
            .into_iter()
            .map(|t| TradeData {
                tid: t.id,
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: parse_side(&t.side),
                price: t.price,
                amount: t.amount,
                timestamp: Timestamp::parse_rfc3339(&t.timestamp).unwrap_or_default(),
            })
            .collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let market = self.market_id(&builder.pair, Asset::Spot)?;
                let fees = self.get_trading_fees().await?;
                match fees.fee_by_markets.iter().find(|f| f.market_id == market) {
                    Some(fee) => {
                        let rate = if builder.is_maker { fee.maker_fee_rate } else { fee.taker_fee_rate };
                        Ok(builder.notional() * rate)
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
        let transfers = self.get_transfers().await?;
        Ok(transfers
            .into_iter()
            .map(|t| FundHistory {
                id: t.id,
                status: t.status,
                timestamp: Timestamp::parse_rfc3339(&t.creation_time).unwrap_or_default(),
                currency: t.asset_name.to_ascii_uppercase(),
                amount: t.amount,
                fee: t.fee,
                transfer_type: t.transfer_type,
                crypto_to_address: t.payment_detail.address,
                crypto_tx_id: t.payment_detail.tx_id,
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let mut body = json!({
            "marketId": self.market_id(&order.pair, order.asset)?,
            "amount": order.amount.to_string_exact(),
            "side": side_name(order.side),
        });
        match order.order_type {
            OrderType::Market => body["type"] = json!("Market"),
            OrderType::Limit | OrderType::PostOnly | OrderType::ImmediateOrCancel | OrderType::FillOrKill => {
                body["type"] = json!("Limit");
                body["price"] = json!(order.price.to_string_exact());
            }
            OrderType::Stop => {
                body["type"] = json!("Stop");
                body["triggerPrice"] = json!(order.trigger_price.to_string_exact());
            }
            OrderType::StopLimit => {
                body["type"] = json!("Stop Limit");
                body["price"] = json!(order.price.to_string_exact());
                body["triggerPrice"] = json!(order.trigger_price.to_string_exact());
            }
            other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
        }
        match order.order_type {
            OrderType::ImmediateOrCancel => body["timeInForce"] = json!("IOC"),
            OrderType::FillOrKill => body["timeInForce"] = json!("FOK"),
            _ if order.immediate_or_cancel => body["timeInForce"] = json!("IOC"),
            _ => {}
        }
        if order.post_only || order.order_type == OrderType::PostOnly {
            body["postOnly"] = json!(true);
        }
        if !order.client_order_id.is_empty() {
            body["clientOrderId"] = json!(order.client_order_id);
        }

        let placed = self.new_order(body).await?;
        log_order!(NAME, "placed", placed.order_id, order.pair, order.side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: order_status(&placed.status) == Status::Filled,
            order_id: placed.order_id,
        })
    }

    async fn modify_order(&self, action: &Modify) -> Result<ModifyResponse> {
        if action.order_id.is_empty() {
            return Err(ExchangeError::OrderIdNotSet);
        }
        let replaced = self.replace_order(&action.order_id, action.price, action.amount).await?;
        info!("🔄 {} order {} replaced by {}", NAME, action.order_id, replaced.order_id);
        Ok(ModifyResponse {
            order_id: replaced.order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        self.remove_order(cancel.require_order_id()?).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let markets = if cancel.pair.is_empty() {
            Vec::new()
        } else {
            vec![self.market_id(&cancel.pair, cancel.asset)?]
        };
        let removed = self.remove_all_orders(&markets).await?;
        info!("🧹 {} cancelled {} orders", NAME, removed.len());
        Ok(CancelAllResponse {
            count: removed.len(),
            status: removed
                .into_iter()
                .map(|o| (o.order_id, "Cancelled".to_string()))
                .collect(),
        })
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.fetch_order(order_id).await?;
        Self::detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, _chain: &str) -> Result<String> {
        Ok(self.fetch_deposit_address(&currency.to_ascii_uppercase()).await?.address)
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let orders = self.get_orders(self.single_market(request)?.as_deref(), "open").await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let orders = self.get_orders(self.single_market(request)?.as_deref(), "all").await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .filter(|d| d.as_ref().map(|d| d.status != Status::Active && d.status != Status::New).unwrap_or(true))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let address = if crypto.address_tag.is_empty() {
            crypto.address.clone()
        } else {
            format!("{}?dt={}", crypto.address, crypto.address_tag)
        };
        let transfer = self.request_withdraw(&request.currency, request.amount, &address).await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, transfer.id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: transfer.id,
            status: transfer.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::mock::MockTransport;
    use std::sync::Arc;

    fn btcmarkets(mock: MockTransport) -> (BtcMarkets, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = BtcMarkets::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("bm-key", "c2VjcmV0", "", "").unwrap();
        (exchange, mock)
    }

    fn order_json(status: &str, open_amount: &str) -> String {
        format!(
            r#"{{"orderId":"7524","marketId":"BTC-AUD","side":"Bid","type":"Limit",
            "creationTime":"2019-08-30T11:08:21.956000Z","price":"100.12","amount":"1.034",
            "openAmount":"{open_amount}","status":"{status}","clientOrderId":"abc-1"}}"#
        )
    }

    #[test]
    fn test_status_table() {
        let cases = [
            ("Accepted", Status::New),
            ("Placed", Status::Active),
            ("Partially Matched", Status::PartiallyFilled),
            ("Fully Matched", Status::Filled),
            ("Cancelled", Status::Cancelled),
            ("Partially Cancelled", Status::PartiallyCancelled),
            ("Failed", Status::Rejected),
        ];
        for (raw, expected) in cases {
            assert_eq!(order_status(raw), expected, "{raw}");
        }
    }

    #[monoio::test]
    async fn test_ticker() {
        let (exchange, _) = btcmarkets(MockTransport::new().route(
            Method::Get,
            "/v3/markets/BTC-AUD/ticker",
            200,
            r#"{"marketId":"BTC-AUD","bestBid":"13970.17","bestAsk":"13990.84","lastPrice":"13990.84","volume24h":"285.80","volumeQte24h":"4000000.12","price24h":"90.84","pricePct24h":"0.65","low24h":"13800","high24h":"14100","timestamp":"2019-09-05T06:13:37.924000Z"}"#,
        ));
        let ticker = exchange.update_ticker(&Pair::new("BTC", "AUD"), Asset::Spot).await.unwrap();
        assert_eq!(ticker.bid.to_string_exact(), "13970.17");
        assert_eq!(ticker.open.to_string_exact(), "13900");
        assert_eq!(ticker.quote_volume.to_string_exact(), "4000000.12");
    }

    #[monoio::test]
    async fn test_orderbook_rows() {
        let (exchange, _) = btcmarkets(MockTransport::new().route(
            Method::Get,
            "orderbook?level=2",
            200,
            r#"{"marketId":"BTC-AUD","snapshotId":1567334110144000,"asks":[["14000.1","0.5",2],["14001","1"]],"bids":[["13999","0.3",1]]}"#,
        ));
        let book = exchange.update_orderbook(&Pair::new("BTC", "AUD"), Asset::Spot).await.unwrap();
        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.update_id, 1567334110144000);
    }

    #[monoio::test]
    async fn test_submit_signed_body() {
        let (exchange, mock) = btcmarkets(MockTransport::new().route(
            Method::Post,
            "/v3/orders",
            200,
            &order_json("Accepted", "1.034"),
        ));
        let order = Submit::limit(
            Pair::new("BTC", "AUD"),
            Side::Buy,
            Fixed::from_str_exact("1.034").unwrap(),
            Fixed::from_str_exact("100.12").unwrap(),
        );
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "7524");

        let request = mock.last_request().unwrap();
        assert_eq!(request.header("BM-AUTH-APIKEY"), Some("bm-key"));
        assert_eq!(request.header("BM-AUTH-SIGNATURE").map(str::len), Some(88));
        assert!(request.header("BM-AUTH-TIMESTAMP").is_some());
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["marketId"], "BTC-AUD");
        assert_eq!(body["side"], "Bid");
        assert_eq!(body["type"], "Limit");
        assert_eq!(body["price"], "100.12");
    }

    #[monoio::test]
    async fn test_order_info_partial() {
        let (exchange, _) = btcmarkets(MockTransport::new().route(
            Method::Get,
            "/v3/orders/7524",
            200,
            &order_json("Partially Matched", "0.034"),
        ));
        let detail = exchange.order_info("7524", &Pair::new("BTC", "AUD"), Asset::Spot).await.unwrap();
        assert_eq!(detail.status, Status::PartiallyFilled);
        assert_eq!(detail.side, Side::Buy);
        assert_eq!(detail.executed_amount.to_string_exact(), "1");
    }

    #[monoio::test]
    async fn test_modify_uses_replace() {
        let (exchange, mock) = btcmarkets(MockTransport::new().route(
            Method::Put,
            "/v3/orders/7524",
            200,
            &order_json("Placed", "2").replace("\"7524\"", "\"7600\""),
        ));
        let response = exchange
            .modify_order(&Modify {
                order_id: "7524".to_string(),
                pair: Pair::new("BTC", "AUD"),
                asset: Asset::Spot,
                side: Side::Buy,
                amount: Fixed::from_i64(2),
                price: Fixed::from_i64(101),
            })
            .await
            .unwrap();
        assert_eq!(response.order_id, "7600");
        let body: serde_json::Value = serde_json::from_str(mock.last_request().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(body["price"], "101");
    }

    #[monoio::test]
    async fn test_cancel_all_for_market() {
        let (exchange, mock) = btcmarkets(MockTransport::new().route(
            Method::Delete,
            "/v3/orders?marketId=BTC-AUD",
            200,
            r#"[{"orderId":"7524","clientOrderId":"abc-1"},{"orderId":"7525","clientOrderId":""}]"#,
        ));
        let response = exchange
            .cancel_all_orders(&Cancel::new("", Pair::new("BTC", "AUD"), Asset::Spot))
            .await
            .unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(mock.requests().len(), 1);
    }

    #[monoio::test]
    async fn test_api_error_code() {
        let (exchange, _) = btcmarkets(MockTransport::new().route(
            Method::Post,
            "/v3/orders",
            400,
            r#"{"code":"InsufficientFund","message":"insufficient funds"}"#,
        ));
        let order = Submit::market(Pair::new("BTC", "AUD"), Side::Sell, Fixed::ONE);
        let err = exchange.submit_order(&order).await.unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "InsufficientFund", "insufficient funds"));
    }
}
