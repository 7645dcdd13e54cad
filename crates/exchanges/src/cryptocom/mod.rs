//! Crypto.com exchange adapter
//!
//! Instruments are `BTC_USDT`. REST covers market data, trading and
//! transfers; [`websocket`] adds the market and user streams.

pub mod rest;
pub mod types;
pub mod websocket;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
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
    Cancel, CancelAllResponse, Detail, GetOrdersRequest, OrderType, Side, Status, Submit,
    SubmitResponse,
};
use crate::orderbook::Orderbook;
use crate::pairs::PairsManager;
use crate::protocol::{Features, ProtocolFeatures};
use crate::request::{EndpointLimit, RateLimit};
use crate::traits::BotExchange;
use crate::types::{Balance, FundHistory, Holdings, SubAccount, Ticker, TradeData};
use crate::withdraw::{WithdrawPermissions, WithdrawRequest, WithdrawResponse};

use self::rest::{CRYPTOCOM_API_URL, CRYPTOCOM_WS_MARKET_URL, CRYPTOCOM_WS_USER_URL};
use self::types::{OrderInfo, Transfer};
use self::websocket::{BOOK_DEPTH, Streams, ticker_from};

pub const NAME: &str = "CryptoCom";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.004", "0.004");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.0004"),
    ("CRO", "1"),
    ("ETH", "0.007"),
    ("LTC", "0.001"),
    ("USDC", "1"),
    ("USDT", "1"),
    ("XRP", "0.25"),
];

pub struct CryptoCom {
    pub base: Base,
    pub(crate) request_id: Nonce,
    pub(crate) streams: Mutex<Streams>,
}

/// `BTC_USDT` to a pair
pub fn instrument_pair(instrument: &str) -> Result<Pair> {
    Pair::from_delimited(instrument, "_")
}

pub fn order_status(order: &OrderInfo) -> Status {
    let partial = order.cumulative_quantity.is_positive();
    match order.status.as_str() {
        "ACTIVE" if partial => Status::PartiallyFilled,
        "ACTIVE" => Status::Active,
        "PENDING" => Status::New,
        "FILLED" => Status::Filled,
        "CANCELED" if partial => Status::PartiallyCancelled,
        "CANCELED" => Status::Cancelled,
        "REJECTED" => Status::Rejected,
        "EXPIRED" => Status::Expired,
        _ => Status::Unknown,
    }
}

pub(crate) fn order_detail(order: &OrderInfo, asset: Asset) -> Result<Detail> {
    let mut detail = Detail::new(NAME, &order.order_id, instrument_pair(&order.instrument_name)?, asset);
    detail.client_order_id = order.client_oid.clone();
    detail.side = Side::parse(&order.side);
    detail.order_type = match order.order_type.as_str() {
        "STOP_LOSS" => OrderType::Stop,
        "STOP_LIMIT" => OrderType::StopLimit,
        other => OrderType::parse(other),
    };
    detail.status = order_status(order);
    detail.price = order.price;
    detail.amount = order.quantity;
    detail.executed_amount = order.cumulative_quantity;
    detail.average_executed_price = order.avg_price;
    detail.date = Timestamp::from_millis(order.create_time);
    detail.last_updated = Timestamp::from_millis(order.update_time.max(order.create_time));
    detail.infer_remaining();
    Ok(detail)
}

fn fund_history(transfer: Transfer, transfer_type: &str) -> FundHistory {
    FundHistory {
        id: transfer.id,
        status: transfer.status,
        timestamp: Timestamp::from_millis(transfer.create_time),
        currency: transfer.currency,
        amount: transfer.amount,
        fee: transfer.fee,
        transfer_type: transfer_type.to_string(),
        crypto_to_address: transfer.address,
        crypto_tx_id: transfer.txid,
    }
}

impl CryptoCom {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, CRYPTOCOM_API_URL),
            (UrlKind::WebsocketSpot, CRYPTOCOM_WS_MARKET_URL),
            (UrlKind::WebsocketSpotSupplementary, CRYPTOCOM_WS_USER_URL),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(true, "_"), PairFormat::new(true, "_"));
        base.pairs.register(Asset::Spot, None, None);

        let capabilities = ProtocolFeatures {
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
            crypto_withdrawal_fee: true,
            ..Default::default()
        };
        base.features = Features::rest(
            capabilities,
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO | WithdrawPermissions::NO_FIAT_WITHDRAWALS,
        )
        .with_websocket(ProtocolFeatures {
            ticker_fetching: true,
            orderbook_fetching: true,
            trade_fetching: true,
            account_info: true,
            get_orders: true,
            subscribe: true,
            unsubscribe: true,
            authenticated_endpoints: true,
            message_correlation: true,
            ..Default::default()
        });
        base.features.enabled.websocket_api = true;

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::per_second(100)),
            (PRIVATE, RateLimit::new(15, Duration::from_millis(100))),
        ]);

        Ok(Self {
            base,
            request_id: Nonce::new(NonceUnit::Millis),
            streams: Mutex::new(Streams::default()),
        })
    }

    fn instrument(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    /// Refresh the batch ticker pairs with one request
    pub async fn update_tickers(&self, asset: Asset) -> Result<()> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(());
        }
        for row in self.get_ticker(None).await? {
            let ticker = ticker_from(&row)?;
            if pairs.contains(&ticker.pair) {
                self.base.store.process_ticker(ticker, asset)?;
            }
        }
        Ok(())
    }

    fn trade(asset: Asset, pair: &Pair, t: types::TradeData) -> TradeData {
        TradeData {
            tid: t.trade_id,
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset,
            side: Side::parse(&t.side),
            price: t.price,
            amount: t.quantity,
            timestamp: Timestamp::from_millis(t.timestamp),
        }
    }
}

#[async_trait(?Send)]
impl BotExchange for CryptoCom {
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
        let instruments = self.get_instruments().await?;
        Ok(instruments
            .iter()
            .map(|i| Pair::new(&i.base_currency, &i.quote_currency))
            .collect())
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let instrument = self.instrument(pair, asset)?;
        let row = self
            .get_ticker(Some(&instrument))
            .await?
            .into_iter()
            .find(|t| t.instrument_name == instrument)
            .ok_or_else(|| ExchangeError::InvalidPair(instrument.clone()))?;
        let mut ticker = ticker_from(&row)?;
        ticker.asset = Some(asset);
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let result = self.get_book(&self.instrument(pair, asset)?, BOOK_DEPTH).await?;
        let snapshot = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} empty book for {pair}")))?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = types::BookData::levels(&snapshot.bids)?;
        book.asks = types::BookData::levels(&snapshot.asks)?;
        book.last_updated = Timestamp::from_millis(snapshot.timestamp);
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let accounts = self.get_account_summary("").await?;
        let currencies: Vec<Balance> = accounts
            .iter()
            .map(|a| Balance::from_total_and_hold(&a.currency, a.balance, a.balance - a.available))
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
        let trades = self.get_trades(&self.instrument(pair, asset)?).await?;
        Ok(trades.into_iter().map(|t| Self::trade(asset, pair, t)).collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let mut history: Vec<FundHistory> = self
            .get_deposit_history()
            .await?
            .into_iter()
            .map(|t| fund_history(t, "deposit"))
            .collect();
        history.extend(
            self.get_withdrawal_history()
                .await?
                .into_iter()
                .map(|t| fund_history(t, "withdrawal")),
        );
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let side = if order.side.is_long() { "BUY" } else { "SELL" };
        let mut params = json!({
            "instrument_name": self.instrument(&order.pair, order.asset)?,
            "side": side,
            "quantity": order.amount.to_string_exact(),
        });
        match order.order_type {
            OrderType::Market => params["type"] = json!("MARKET"),
            OrderType::Limit | OrderType::PostOnly | OrderType::ImmediateOrCancel | OrderType::FillOrKill => {
                params["type"] = json!("LIMIT");
                params["price"] = json!(order.price.to_string_exact());
                let time_in_force = match order.order_type {
                    OrderType::ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
                    OrderType::FillOrKill => "FILL_OR_KILL",
                    _ if order.immediate_or_cancel => "IMMEDIATE_OR_CANCEL",
                    _ => "GOOD_TILL_CANCEL",
                };
                params["time_in_force"] = json!(time_in_force);
                if order.post_only || order.order_type == OrderType::PostOnly {
                    params["exec_inst"] = json!("POST_ONLY");
                }
            }
            other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
        }
        if !order.client_order_id.is_empty() {
            params["client_oid"] = json!(order.client_order_id);
        }

        let created = self.create_order(params).await?;
        log_order!(NAME, "placed", created.order_id, order.pair, side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: false,
            order_id: created.order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        let order_id = cancel.require_order_id()?;
        self.cancel_existing_order(&self.instrument(&cancel.pair, cancel.asset)?, order_id)
            .await
    }

    /// The venue cancels asynchronously and reports no per-order results
    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let instrument = self.instrument(&cancel.pair, cancel.asset)?;
        let open = self.get_open_orders(&instrument).await?;
        self.cancel_all_orders_by_instrument(&instrument).await?;
        let mut response = CancelAllResponse::default();
        for order in open {
            response.status.insert(order.order_id, Status::PendingCancel.to_string());
            response.count += 1;
        }
        info!("🧹 {} cancel-all on {} covers {} orders", NAME, instrument, response.count);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.get_order_detail(order_id).await?;
        order_detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, chain: &str) -> Result<String> {
        let currency = currency.to_ascii_uppercase();
        let addresses = self.get_deposit_address(&currency).await?;
        addresses
            .into_iter()
            .find(|a| chain.is_empty() || a.network.eq_ignore_ascii_case(chain))
            .map(|a| a.address)
            .ok_or_else(|| ExchangeError::EndpointError(format!("{NAME} has no {currency} address for chain '{chain}'")))
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let mut orders = Vec::new();
        if request.pairs.is_empty() {
            orders = self.get_open_orders("").await?;
        } else {
            for pair in &request.pairs {
                orders.extend(self.get_open_orders(&self.instrument(pair, request.asset)?).await?);
            }
        }
        let details = orders
            .iter()
            .map(|o| order_detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let start = request.start.map(|t| t.as_millis());
        let end = request.end.map(|t| t.as_millis());
        let mut orders = Vec::new();
        if request.pairs.is_empty() {
            orders = self.get_order_history("", start, end).await?;
        } else {
            for pair in &request.pairs {
                orders.extend(
                    self.get_order_history(&self.instrument(pair, request.asset)?, start, end)
                        .await?,
                );
            }
        }
        let details = orders
            .iter()
            .map(|o| order_detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let withdrawal = self
            .create_withdrawal(
                &request.currency.to_ascii_uppercase(),
                request.amount,
                &crypto.address,
                &crypto.address_tag,
                &request.description,
            )
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, withdrawal.id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: withdrawal.id,
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

    fn cryptocom(mock: MockTransport) -> (CryptoCom, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = CryptoCom::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("cdc-key", "cdc-secret", "", "").unwrap();
        (exchange, mock)
    }

    #[monoio::test]
    async fn test_instruments_to_pairs() {
        let (exchange, _) = cryptocom(MockTransport::new().route(
            Method::Get,
            "public/get-instruments",
            200,
            r#"{"id":1,"method":"public/get-instruments","code":0,"result":{"instruments":[{"instrument_name":"BTC_USDT","quote_currency":"USDT","base_currency":"BTC","price_decimals":2,"quantity_decimals":6},{"instrument_name":"CRO_BTC","quote_currency":"BTC","base_currency":"CRO","price_decimals":8,"quantity_decimals":3}]}}"#,
        ));
        let pairs = exchange.fetch_tradable_pairs(Asset::Spot).await.unwrap();
        assert_eq!(pairs, vec![Pair::new("BTC", "USDT"), Pair::new("CRO", "BTC")]);
    }

    #[monoio::test]
    async fn test_book_request_depth() {
        let (exchange, mock) = cryptocom(MockTransport::new().route(
            Method::Get,
            "public/get-book",
            200,
            r#"{"code":0,"method":"public/get-book","result":{"instrument_name":"BTC_USDT","depth":150,"data":[{"bids":[["50000.5","0.2",2]],"asks":[["50001","1.1",1]],"t":1654780033786}]}}"#,
        ));
        let book = exchange.update_orderbook(&Pair::new("BTC", "USDT"), Asset::Spot).await.unwrap();
        assert_eq!(book.bids[0].count, Some(2));
        let url = mock.last_request().unwrap().url;
        assert!(url.contains("instrument_name=BTC_USDT"));
        assert!(url.contains("depth=150"));
    }

    #[monoio::test]
    async fn test_submit_signed_body() {
        let (exchange, mock) = cryptocom(MockTransport::new().route(
            Method::Post,
            "private/create-order",
            200,
            r#"{"id":11,"method":"private/create-order","code":0,"result":{"order_id":"337843775021233500","client_oid":"my_order_0002"}}"#,
        ));
        let mut order = Submit::limit(
            Pair::new("BTC", "USDT"),
            Side::Sell,
            Fixed::from_str_exact("0.5").unwrap(),
            Fixed::from_i64(51000),
        );
        order.client_order_id = "my_order_0002".to_string();
        order.post_only = true;
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "337843775021233500");

        let request = mock.last_request().unwrap();
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["method"], "private/create-order");
        assert_eq!(body["api_key"], "cdc-key");
        assert_eq!(body["params"]["side"], "SELL");
        assert_eq!(body["params"]["exec_inst"], "POST_ONLY");
        let expected = rest::sign(
            b"cdc-secret",
            "private/create-order",
            body["id"].as_u64().unwrap(),
            "cdc-key",
            &body["params"],
            body["nonce"].as_u64().unwrap(),
        )
        .unwrap();
        assert_eq!(body["sig"], expected);
    }

    #[monoio::test]
    async fn test_error_envelope_on_bad_request() {
        let (exchange, _) = cryptocom(MockTransport::new().route(
            Method::Post,
            "private/cancel-order",
            400,
            r#"{"id":12,"method":"private/cancel-order","code":316,"message":"INVALID_ORDERID"}"#,
        ));
        let err = exchange
            .cancel_order(&Cancel::new("nope", Pair::new("BTC", "USDT"), Asset::Spot))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 316, "INVALID_ORDERID"));
    }

    #[test]
    fn test_status_table() {
        let order = |status: &str, filled: &str| OrderInfo {
            order_id: "1".to_string(),
            client_oid: String::new(),
            status: status.to_string(),
            side: "BUY".to_string(),
            order_type: "LIMIT".to_string(),
            instrument_name: "BTC_USDT".to_string(),
            price: Fixed::ONE,
            quantity: Fixed::from_i64(2),
            cumulative_quantity: Fixed::from_str_exact(filled).unwrap(),
            avg_price: Fixed::ZERO,
            fee_currency: String::new(),
            time_in_force: String::new(),
            create_time: 0,
            update_time: 0,
        };
        let cases = [
            ("ACTIVE", "0", Status::Active),
            ("ACTIVE", "1", Status::PartiallyFilled),
            ("FILLED", "2", Status::Filled),
            ("CANCELED", "0", Status::Cancelled),
            ("CANCELED", "1", Status::PartiallyCancelled),
            ("REJECTED", "0", Status::Rejected),
            ("EXPIRED", "0", Status::Expired),
            ("SOMETHING", "0", Status::Unknown),
        ];
        for (status, filled, expected) in cases {
            assert_eq!(order_status(&order(status, filled)), expected, "{status} {filled}");
        }
    }

    #[monoio::test]
    async fn test_funding_history_merges_sorted() {
        let (exchange, _) = cryptocom(
            MockTransport::new()
                .route(
                    Method::Post,
                    "private/get-deposit-history",
                    200,
                    r#"{"code":0,"result":{"deposit_list":[{"currency":"BTC","fee":0,"create_time":1000,"id":"d1","update_time":1000,"amount":0.5,"address":"addr1","status":"1"}]}}"#,
                )
                .route(
                    Method::Post,
                    "private/get-withdrawal-history",
                    200,
                    r#"{"code":0,"result":{"withdrawal_list":[{"currency":"CRO","client_wid":"w","fee":1,"create_time":2000,"id":2220,"update_time":2000,"amount":8,"address":"addr2","status":"5","txid":"0xabc"}]}}"#,
                ),
        );
        let history = exchange.funding_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "2220");
        assert_eq!(history[0].transfer_type, "withdrawal");
        assert_eq!(history[1].transfer_type, "deposit");
    }

    #[monoio::test]
    async fn test_deposit_address_by_network() {
        let (exchange, _) = cryptocom(MockTransport::new().route(
            Method::Post,
            "private/get-deposit-address",
            200,
            r#"{"code":0,"result":{"deposit_address_list":[{"currency":"USDT","create_time":1,"id":"1","address":"0xerc","status":"1","network":"ETH"},{"currency":"USDT","create_time":1,"id":"2","address":"cro1","status":"1","network":"CRO"}]}}"#,
        ));
        assert_eq!(exchange.deposit_address("usdt", "", "CRO").await.unwrap(), "cro1");
        assert_eq!(exchange.deposit_address("usdt", "", "").await.unwrap(), "0xerc");
    }
}
