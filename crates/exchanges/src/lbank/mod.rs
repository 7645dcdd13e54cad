//! LBank spot adapter
//!
//! Symbols are lowercase and underscore delimited (`btc_usdt`). Every
//! private call is a signed form POST.

pub mod rest;
pub mod types;

use async_trait::async_trait;
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

use self::rest::LBANK_API_URL;
use self::types::Order;

pub const NAME: &str = "Lbank";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.001", "0.001");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.001"),
    ("ETH", "0.01"),
    ("LBK", "10"),
    ("LTC", "0.01"),
    ("USDT", "5"),
];

const DEPTH_SIZE: u32 = 60;
const TRADE_COUNT: u32 = 100;
const PAGE_LENGTH: u32 = 100;

pub struct Lbank {
    pub base: Base,
}

pub fn order_status(code: i64) -> Status {
    match code {
        -1 => Status::Cancelled,
        0 => Status::Active,
        1 => Status::PartiallyFilled,
        2 => Status::Filled,
        3 => Status::PartiallyCancelled,
        4 => Status::PendingCancel,
        _ => Status::Unknown,
    }
}

/// `sell_maker` to `(Sell, PostOnly)`
pub fn parse_order_type(value: &str) -> (Side, OrderType) {
    let (side, kind) = value.split_once('_').unwrap_or((value, ""));
    let order_type = match kind {
        "" => OrderType::Limit,
        "market" => OrderType::Market,
        "maker" => OrderType::PostOnly,
        "ioc" => OrderType::ImmediateOrCancel,
        "fok" => OrderType::FillOrKill,
        _ => OrderType::Unknown,
    };
    (Side::parse(side), order_type)
}

pub fn format_order_type(order: &Submit) -> Result<String> {
    let side = if order.side.is_long() { "buy" } else { "sell" };
    let suffix = match order.order_type {
        OrderType::Market => "_market",
        OrderType::Limit if order.post_only => "_maker",
        OrderType::Limit if order.immediate_or_cancel => "_ioc",
        OrderType::Limit => "",
        OrderType::PostOnly => "_maker",
        OrderType::ImmediateOrCancel => "_ioc",
        OrderType::FillOrKill => "_fok",
        other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
    };
    Ok(format!("{side}{suffix}"))
}

impl Lbank {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[(UrlKind::RestSpot, LBANK_API_URL)])?;

        base.pairs = PairsManager::new(PairFormat::new(false, "_"), PairFormat::new(true, "-"));
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
                crypto_withdrawal: true,
                withdrawal_history: true,
                trade_fee: true,
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO | WithdrawPermissions::NO_FIAT_WITHDRAWALS,
        );

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::new(10, Duration::from_secs(1))),
            (PRIVATE, RateLimit::new(10, Duration::from_secs(1))),
        ]);

        Ok(Self { base })
    }

    fn symbol(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    /// Refresh the batch ticker pairs from the `all` listing
    pub async fn update_tickers(&self, asset: Asset) -> Result<()> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(());
        }
        let rows = self.get_ticker("all").await?;
        for pair in pairs {
            let symbol = self.symbol(&pair, asset)?;
            if let Some(row) = rows.iter().find(|r| r.symbol == symbol) {
                self.base.store.process_ticker(Self::ticker(&pair, asset, row), asset)?;
            }
        }
        Ok(())
    }

    fn ticker(pair: &Pair, asset: Asset, row: &types::TickerRow) -> Ticker {
        let t = &row.ticker;
        Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: t.latest,
            high: t.high,
            low: t.low,
            volume: t.vol,
            quote_volume: t.turnover,
            close: t.latest,
            last_updated: if row.timestamp > 0 {
                Timestamp::from_millis(row.timestamp)
            } else {
                Timestamp::now()
            },
            ..Default::default()
        }
    }

    fn detail(order: &Order, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.symbol, "_")?;
        let mut detail = Detail::new(NAME, &order.order_id, pair, asset);
        let (side, order_type) = parse_order_type(&order.order_type);
        detail.client_order_id = order.custom_id.clone();
        detail.side = side;
        detail.order_type = order_type;
        detail.status = order_status(order.status);
        detail.price = order.price;
        detail.amount = order.amount;
        detail.executed_amount = order.deal_amount;
        detail.average_executed_price = order.avg_price;
        detail.date = Timestamp::from_millis(order.create_time);
        detail.last_updated = detail.date;
        detail.infer_remaining();
        Ok(detail)
    }

    async fn open_orders_for(&self, symbol: &str) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        let mut page = 1;
        loop {
            let result = self.get_open_orders(symbol, page, PAGE_LENGTH).await?;
            let fetched = result.orders.len();
            orders.extend(result.orders);
            if fetched < PAGE_LENGTH as usize || orders.len() >= result.total as usize {
                return Ok(orders);
            }
            page += 1;
        }
    }
}

#[async_trait(?Send)]
impl BotExchange for Lbank {
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
        self.get_currency_pairs()
            .await?
            .iter()
            .map(|symbol| Pair::from_delimited(symbol, "_"))
            .collect()
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let rows = self.get_ticker(&self.symbol(pair, asset)?).await?;
        let row = rows
            .first()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME}: empty ticker for {pair}")))?;
        let ticker = Self::ticker(pair, asset, row);
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let depth = self.get_depth(&self.symbol(pair, asset)?, DEPTH_SIZE).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = depth.bids.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.asks = depth.asks.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.last_updated = if depth.timestamp > 0 {
            Timestamp::from_millis(depth.timestamp)
        } else {
            Timestamp::now()
        };
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let info = self.get_user_info().await?;
        let mut currencies = Vec::new();
        for (code, free) in &info.free {
            let free = Fixed::from_json(free)?;
            let hold = match info.freeze.get(code) {
                Some(value) => Fixed::from_json(value)?,
                None => Fixed::ZERO,
            };
            if free.is_zero() && hold.is_zero() {
                continue;
            }
            currencies.push(Balance::from_free_and_hold(&code.to_ascii_uppercase(), free, hold));
        }
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
        let trades = self.get_trades(&self.symbol(pair, asset)?, TRADE_COUNT, None).await?;
        Ok(trades
            .into_iter()
            .map(|t| TradeData {
                tid: t.tid,
                exchange: NAME.to_string(),
                pair: pair.clone(),
                asset,
                side: Side::parse(&t.side),
                price: t.price,
                amount: t.amount,
                timestamp: Timestamp::from_millis(t.date_ms),
            })
            .collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let page = self.get_withdrawals("", 1).await?;
        Ok(page
            .list
            .into_iter()
            .map(|w| FundHistory {
                id: w.id.to_string(),
                status: w.status,
                timestamp: Timestamp::from_millis(w.time),
                currency: w.asset_code.to_ascii_uppercase(),
                amount: w.amount,
                fee: w.fee,
                transfer_type: "withdrawal".to_string(),
                crypto_to_address: w.address,
                crypto_tx_id: w.tx_hash,
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let symbol = self.symbol(&order.pair, order.asset)?;
        let price = if order.order_type == OrderType::Market {
            String::new()
        } else {
            order.price.to_string_exact()
        };
        let result = self
            .create_order(
                &symbol,
                &format_order_type(order)?,
                &price,
                &order.amount.to_string_exact(),
                &order.client_order_id,
            )
            .await?;
        log_order!(NAME, "placed", result.order_id, order.pair, order.side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: false,
            order_id: result.order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        let order_id = cancel.require_order_id()?;
        if cancel.pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let symbol = self.symbol(&cancel.pair, cancel.asset)?;
        self.remove_order(&symbol, order_id).await?;
        Ok(())
    }

    /// Lists open orders on the pair and cancels them one by one
    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        if cancel.pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let symbol = self.symbol(&cancel.pair, cancel.asset)?;
        let mut response = CancelAllResponse::default();
        for order in self.open_orders_for(&symbol).await? {
            match self.remove_order(&symbol, &order.order_id).await {
                Ok(_) => response.count += 1,
                Err(e) => {
                    warn!("⚠️ {} failed to cancel {}: {}", NAME, order.order_id, e);
                    response.status.insert(order.order_id, e.to_string());
                }
            }
        }
        info!("🧹 {} cancelled {} orders on {}", NAME, response.count, symbol);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, pair: &Pair, asset: Asset) -> Result<Detail> {
        if pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let orders = self.query_order(&self.symbol(pair, asset)?, order_id).await?;
        let order = orders
            .iter()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        Self::detail(order, asset)
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        if request.pairs.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let mut details = Vec::new();
        for pair in &request.pairs {
            for order in self.open_orders_for(&self.symbol(pair, request.asset)?).await? {
                details.push(Self::detail(&order, request.asset)?);
            }
        }
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        if request.pairs.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let mut details = Vec::new();
        for pair in &request.pairs {
            let page = self
                .get_order_history(&self.symbol(pair, request.asset)?, 1, PAGE_LENGTH)
                .await?;
            for order in &page.orders {
                let detail = Self::detail(order, request.asset)?;
                let after_start = request.start.is_none_or(|start| detail.date >= start);
                let before_end = request.end.is_none_or(|end| detail.date <= end);
                if after_start && before_end {
                    details.push(detail);
                }
            }
        }
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let result = self
            .withdraw(
                &request.currency.to_ascii_lowercase(),
                &crypto.address,
                &crypto.address_tag,
                request.amount,
                crypto.fee_amount,
            )
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, result.withdraw_id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: result.withdraw_id.to_string(),
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

    fn lbank(mock: MockTransport) -> (Lbank, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = Lbank::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("lbank-key", "lbank-secret", "", "").unwrap();
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USDT"), Pair::new("ETH", "BTC")], Asset::Spot, false)
            .unwrap();
        (exchange, mock)
    }

    #[test]
    fn test_order_type_strings() {
        assert_eq!(parse_order_type("buy"), (Side::Buy, OrderType::Limit));
        assert_eq!(parse_order_type("sell_market"), (Side::Sell, OrderType::Market));
        assert_eq!(parse_order_type("buy_maker"), (Side::Buy, OrderType::PostOnly));
        assert_eq!(parse_order_type("sell_ioc"), (Side::Sell, OrderType::ImmediateOrCancel));

        let mut order = Submit::limit(Pair::new("BTC", "USDT"), Side::Buy, Fixed::ONE, Fixed::ONE);
        assert_eq!(format_order_type(&order).unwrap(), "buy");
        order.immediate_or_cancel = true;
        assert_eq!(format_order_type(&order).unwrap(), "buy_ioc");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(order_status(-1), Status::Cancelled);
        assert_eq!(order_status(1), Status::PartiallyFilled);
        assert_eq!(order_status(4), Status::PendingCancel);
        assert_eq!(order_status(9), Status::Unknown);
    }

    #[monoio::test]
    async fn test_tradable_pairs() {
        let (exchange, _) = lbank(MockTransport::new().route(
            Method::Get,
            "/v2/currencyPairs.do",
            200,
            r#"{"result":"true","data":["bcc_eth","etc_btc","lbk_usdt"],"error_code":0,"ts":1550128421453}"#,
        ));
        let pairs = exchange.fetch_tradable_pairs(Asset::Spot).await.unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2], Pair::new("LBK", "USDT"));
    }

    #[monoio::test]
    async fn test_error_code_lookup() {
        let (exchange, _) = lbank(MockTransport::new().route(
            Method::Get,
            "/v2/ticker.do",
            200,
            r#"{"result":"false","error_code":10008,"ts":1550128421453}"#,
        ));
        let err = exchange
            .update_ticker(&Pair::new("BTC", "USDT"), Asset::Spot)
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 10008, "Invalid trading pair"));
    }

    #[monoio::test]
    async fn test_submit_signs_form() {
        let (exchange, mock) = lbank(MockTransport::new().route(
            Method::Post,
            "/v2/create_order.do",
            200,
            r#"{"result":true,"data":{"order_id":"24f7ce27-af1d-4dca-a8c1-ef1cbeec1b23"},"error_code":0,"ts":1550128421453}"#,
        ));
        let order = Submit::limit(
            Pair::new("ETH", "BTC"),
            Side::Sell,
            Fixed::from_str_exact("1.5").unwrap(),
            Fixed::from_str_exact("0.05").unwrap(),
        );
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "24f7ce27-af1d-4dca-a8c1-ef1cbeec1b23");

        let request = mock.last_request().unwrap();
        let body = request.body.as_deref().unwrap();
        assert!(body.contains("api_key=lbank-key"));
        assert!(body.contains("symbol=eth_btc"));
        assert!(body.contains("type=sell"));
        assert!(body.contains("signature_method=HmacSHA256"));
        assert!(body.contains("&sign="));
        assert!(request.headers.iter().any(|(k, v)| k == "echostr" && v.len() == 35));
    }

    #[monoio::test]
    async fn test_balances_merge_free_and_freeze() {
        let (exchange, _) = lbank(MockTransport::new().route(
            Method::Post,
            "/v2/user_info.do",
            200,
            r#"{"result":"true","data":{"free":{"btc":"1.5","eth":"0","usdt":100},"freeze":{"btc":"0.5","eth":"0","usdt":"0"},"asset":{"btc":"2"}},"error_code":0}"#,
        ));
        let holdings = exchange.update_account_info(Asset::Spot).await.unwrap();
        let currencies = &holdings.accounts[0].currencies;
        assert_eq!(currencies.len(), 2);
        assert_eq!(currencies[0].currency, "BTC");
        assert_eq!(currencies[0].total.to_string_exact(), "2");
        assert_eq!(currencies[0].hold.to_string_exact(), "0.5");
    }

    #[monoio::test]
    async fn test_cancel_all_walks_open_orders() {
        let (exchange, mock) = lbank(
            MockTransport::new()
                .route(Method::Post, "/v2/orders_info_no_deal.do", 200, r#"{"result":"true","data":{"current_page":1,"page_length":100,"total":2,"orders":[{"order_id":"a1","symbol":"btc_usdt","type":"buy","price":"100","avg_price":"0","amount":"1","deal_amount":"0","status":0,"create_time":1550128421000,"custom_id":""},{"order_id":"a2","symbol":"btc_usdt","type":"sell","price":"200","avg_price":"0","amount":"1","deal_amount":"0.2","status":1,"create_time":1550128422000,"custom_id":""}]}}"#)
                .route(Method::Post, "/v2/cancel_order.do", 200, r#"{"result":"true","data":{"order_id":"a1"}}"#),
        );
        let response = exchange
            .cancel_all_orders(&Cancel::new("", Pair::new("BTC", "USDT"), Asset::Spot))
            .await
            .unwrap();
        assert_eq!(response.count, 2);
        assert!(response.status.is_empty());
        let cancels = mock
            .requests()
            .iter()
            .filter(|r| r.url.ends_with("/v2/cancel_order.do"))
            .count();
        assert_eq!(cancels, 2);
    }

    #[monoio::test]
    async fn test_order_info_maps_status() {
        let (exchange, _) = lbank(MockTransport::new().route(
            Method::Post,
            "/v2/orders_info.do",
            200,
            r#"{"result":"true","data":[{"order_id":"a2","symbol":"btc_usdt","type":"sell_maker","price":"200","avg_price":"200","amount":"1","deal_amount":"0.25","status":1,"create_time":1550128422000,"custom_id":"mine"}]}"#,
        ));
        let detail = exchange
            .order_info("a2", &Pair::new("BTC", "USDT"), Asset::Spot)
            .await
            .unwrap();
        assert_eq!(detail.status, Status::PartiallyFilled);
        assert_eq!(detail.order_type, OrderType::PostOnly);
        assert_eq!(detail.client_order_id, "mine");
        assert_eq!(detail.remaining_amount.to_string_exact(), "0.75");
    }
}
