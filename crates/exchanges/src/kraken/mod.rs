//! Kraken spot adapter
//!
//! Kraken names assets its own way (`XXBT`, `ZUSD`, `XDG`). Requests use
//! the `altname` spelling (`XBTUSD`); responses are mapped back through the
//! cached `AssetPairs` listing.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
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

use self::rest::{KRAKEN_API_URL, from_kraken_asset, to_kraken_asset};
use self::types::{AssetPairInfo, OrderInfo};

pub const NAME: &str = "Kraken";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const DEPTH: u32 = 100;

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.0016", "0.0026");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.00015"),
    ("ETH", "0.0035"),
    ("LTC", "0.001"),
    ("XRP", "0.02"),
    ("BCH", "0.0001"),
    ("DOGE", "4"),
    ("DOT", "0.05"),
    ("ADA", "0.15"),
    ("XLM", "0.00002"),
    ("USDT", "2.5"),
];

pub struct Kraken {
    pub base: Base,
    nonce: Nonce,
    asset_pairs: Mutex<HashMap<String, AssetPairInfo>>,
}

impl Kraken {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator {
            requires_base64_decode_secret: true,
            ..CredentialsValidator::key_and_secret()
        };
        base.api
            .endpoints
            .set_defaults(&[
                (UrlKind::RestSpot, KRAKEN_API_URL),
                (UrlKind::WebsocketSpot, "wss://ws.kraken.com"),
            ])?;

        base.pairs = PairsManager::new(PairFormat::new(true, ""), PairFormat::new(true, "-"));
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
                crypto_deposit: true,
                crypto_withdrawal: true,
                deposit_history: true,
                withdrawal_history: true,
                trade_fee: true,
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP
                | WithdrawPermissions::WITHDRAW_CRYPTO_WITH_2FA
                | WithdrawPermissions::AUTO_WITHDRAW_FIAT_WITH_SETUP
                | WithdrawPermissions::WITHDRAW_FIAT_WITH_2FA,
        );

        // Private calls share a counter of 15 that decays by one every 3s
        base.set_rate_limits(&[
            (PUBLIC, RateLimit::per_second(1)),
            (PRIVATE, RateLimit::new(15, Duration::from_secs(45))),
        ]);

        Ok(Self {
            base,
            nonce: Nonce::new(NonceUnit::Micros),
            asset_pairs: Mutex::new(HashMap::new()),
        })
    }

    /// `XBTUSD` style symbol Kraken accepts in requests
    pub fn symbol(&self, pair: &Pair) -> Result<String> {
        if pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        Ok(format!("{}{}", to_kraken_asset(&pair.base), to_kraken_asset(&pair.quote)))
    }

    fn pair_from_info(info: &AssetPairInfo) -> Pair {
        Pair::new(&from_kraken_asset(&info.base), &from_kraken_asset(&info.quote))
    }

    /// Map a response pair name (altname or canonical key) back to a pair
    pub async fn resolve_pair(&self, name: &str) -> Result<Pair> {
        let listing = self.get_asset_pairs().await?;
        if let Some(info) = listing.get(name) {
            return Ok(Self::pair_from_info(info));
        }
        listing
            .values()
            .find(|info| info.altname.eq_ignore_ascii_case(name))
            .map(Self::pair_from_info)
            .ok_or_else(|| ExchangeError::InvalidPair(format!("Kraken pair {name} not listed")))
    }

    async fn order_detail(&self, id: &str, info: &OrderInfo, asset: Asset) -> Result<Detail> {
        let pair = self.resolve_pair(&info.descr.pair).await?;
        let mut detail = Detail::new(NAME, id, pair, asset);
        detail.side = Side::parse(&info.descr.side);
        detail.order_type = OrderType::parse(&info.descr.ordertype);
        detail.status = order_status(&info.status, info.vol_exec);
        detail.price = info.descr.price;
        detail.amount = info.vol;
        detail.executed_amount = info.vol_exec;
        detail.average_executed_price = info.price;
        detail.fee = info.fee;
        detail.date = Timestamp::from_secs_f64(info.opentm);
        if info.closetm > 0.0 {
            detail.last_updated = Timestamp::from_secs_f64(info.closetm);
        }
        if let Some(userref) = info.userref.filter(|r| *r != 0) {
            detail.client_order_id = userref.to_string();
        }
        detail.infer_remaining();
        Ok(detail)
    }

    async fn details(&self, orders: HashMap<String, OrderInfo>, asset: Asset) -> Result<Vec<Detail>> {
        let mut details = Vec::with_capacity(orders.len());
        for (id, info) in &orders {
            details.push(self.order_detail(id, info, asset).await?);
        }
        Ok(details)
    }
}

/// Kraken statuses plus the executed volume that separates partial states
pub fn order_status(status: &str, executed: Fixed) -> Status {
    let partial = executed.is_positive();
    match status {
        "pending" => Status::New,
        "open" if partial => Status::PartiallyFilled,
        "open" => Status::Active,
        "closed" => Status::Filled,
        "canceled" if partial => Status::PartiallyCancelled,
        "canceled" => Status::Cancelled,
        "expired" => Status::Expired,
        other => Status::parse(other),
    }
}

fn kraken_order_type(order: &Submit) -> Result<&'static str> {
    match order.order_type {
        OrderType::Limit | OrderType::PostOnly | OrderType::ImmediateOrCancel => Ok("limit"),
        OrderType::Market => Ok("market"),
        OrderType::Stop => Ok("stop-loss"),
        OrderType::StopLimit => Ok("stop-loss-limit"),
        OrderType::TrailingStop => Ok("trailing-stop"),
        other => Err(ExchangeError::TypeIsInvalid(other.to_string())),
    }
}

fn cell(row: &[Value], index: usize) -> Result<Fixed> {
    Ok(Fixed::from_json(row.get(index).unwrap_or(&Value::Null))?)
}

#[async_trait(?Send)]
impl BotExchange for Kraken {
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
        let listing = self.get_asset_pairs().await?;
        let mut pairs: Vec<Pair> = listing
            .iter()
            // Dark pool books
            .filter(|(key, _)| !key.ends_with(".d"))
            .map(|(_, info)| match info.wsname.split_once('/') {
                Some((base, quote)) => Pair::new(&from_kraken_asset(base), &from_kraken_asset(quote)),
                None => Self::pair_from_info(info),
            })
            .collect();
        pairs.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        Ok(pairs)
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let info = self.get_ticker(&self.symbol(pair)?).await?;
        let ticker = Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: cell(&info.c, 0)?,
            high: cell(&info.h, 1)?,
            low: cell(&info.l, 1)?,
            bid: cell(&info.b, 0)?,
            ask: cell(&info.a, 0)?,
            volume: cell(&info.v, 1)?,
            open: info.o,
            last_updated: Timestamp::now(),
            ..Default::default()
        };
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let depth = self.get_depth(&self.symbol(pair)?, DEPTH).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = depth
            .bids
            .iter()
            .map(|row| Level::from_pair_value(&Value::Array(row.clone())))
            .collect::<Result<_>>()?;
        book.asks = depth
            .asks
            .iter()
            .map(|row| Level::from_pair_value(&Value::Array(row.clone())))
            .collect::<Result<_>>()?;
        book.last_updated = Timestamp::now();
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let balances = self.get_balance().await?;
        let mut currencies = Vec::with_capacity(balances.len());
        for (code, amount) in &balances {
            // Staked and opt-in rewards balances (`DOT.S`, `USD.HOLD`)
            if code.contains('.') {
                continue;
            }
            let total = Fixed::from_json(amount)?;
            currencies.push(Balance::from_total_and_hold(&from_kraken_asset(code), total, Fixed::ZERO));
        }
        currencies.sort_by(|a, b| a.currency.cmp(&b.currency));

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
        let rows = self.get_trades(&self.symbol(pair)?, None).await?;
        rows.iter()
            .map(|row| {
                let tid = match row.get(6) {
                    Some(id) if !id.is_null() => id.to_string(),
                    _ => row.get(2).map(|t| t.to_string()).unwrap_or_default(),
                };
                Ok(TradeData {
                    tid,
                    exchange: NAME.to_string(),
                    pair: pair.clone(),
                    asset,
                    side: Side::parse(row.get(3).and_then(Value::as_str).unwrap_or_default()),
                    price: cell(row, 0)?,
                    amount: cell(row, 1)?,
                    timestamp: Timestamp::from_secs_f64(row.get(2).and_then(Value::as_f64).unwrap_or_default()),
                })
            })
            .collect()
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let (taker, maker) = self.get_trade_volume_fees(&self.symbol(&builder.pair)?).await?;
                let percent = if builder.is_maker { maker } else { taker };
                Ok(builder.notional() * percent / Fixed::from_i64(100))
            }
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let ledgers = self.get_ledgers().await?;
        let mut history: Vec<FundHistory> = ledgers
            .ledger
            .into_values()
            .filter(|entry| entry.entry_type == "deposit" || entry.entry_type == "withdrawal")
            .map(|entry| FundHistory {
                id: entry.refid,
                status: "Success".to_string(),
                timestamp: Timestamp::from_secs_f64(entry.time),
                currency: from_kraken_asset(&entry.asset),
                amount: entry.amount.abs(),
                fee: entry.fee,
                transfer_type: entry.entry_type,
                crypto_to_address: String::new(),
                crypto_tx_id: String::new(),
            })
            .collect();
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(history)
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let ordertype = kraken_order_type(order)?;
        let side = if order.side.is_long() { "buy" } else { "sell" };

        let mut params = vec![
            ("pair".to_string(), self.symbol(&order.pair)?),
            ("type".to_string(), side.to_string()),
            ("ordertype".to_string(), ordertype.to_string()),
            ("volume".to_string(), order.amount.to_string_exact()),
        ];
        match order.order_type {
            OrderType::Stop | OrderType::TrailingStop => {
                params.push(("price".to_string(), order.trigger_price.to_string_exact()));
            }
            OrderType::StopLimit => {
                params.push(("price".to_string(), order.trigger_price.to_string_exact()));
                params.push(("price2".to_string(), order.price.to_string_exact()));
            }
            OrderType::Market => {}
            _ => params.push(("price".to_string(), order.price.to_string_exact())),
        }
        if order.post_only || order.order_type == OrderType::PostOnly {
            params.push(("oflags".to_string(), "post".to_string()));
        }
        if order.immediate_or_cancel || order.order_type == OrderType::ImmediateOrCancel {
            params.push(("timeinforce".to_string(), "IOC".to_string()));
        }
        if let Ok(userref) = order.client_order_id.parse::<i32>() {
            params.push(("userref".to_string(), userref.to_string()));
        }

        let result = self.add_order(params).await?;
        let order_id = result.txid.into_iter().next().ok_or_else(|| {
            ExchangeError::InvalidResponse("Kraken AddOrder returned no txid".to_string())
        })?;
        log_order!(NAME, "placed", order_id, order.pair, side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: false,
            order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        cancel.validate()?;
        let id = if cancel.order_id.is_empty() { &cancel.client_order_id } else { &cancel.order_id };
        let result = self.cancel_order_by_id(id).await?;
        if result.count == 0 {
            return Err(ExchangeError::OrderNotFound(id.clone()));
        }
        Ok(())
    }

    async fn cancel_all_orders(&self, _cancel: &Cancel) -> Result<CancelAllResponse> {
        let result = self.cancel_all().await?;
        debug!("🧹 {} cancelled {} orders", NAME, result.count);
        Ok(CancelAllResponse {
            count: usize::try_from(result.count).unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let orders = self.query_orders(order_id).await?;
        let info = orders
            .get(order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        self.order_detail(order_id, info, asset).await
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, chain: &str) -> Result<String> {
        let asset = to_kraken_asset(currency);
        let method = if chain.is_empty() {
            self.get_deposit_methods(&asset)
                .await?
                .into_iter()
                .next()
                .map(|m| m.method)
                .ok_or_else(|| ExchangeError::EndpointError(format!("Kraken has no deposit method for {currency}")))?
        } else {
            chain.to_string()
        };

        let mut addresses = self.get_deposit_addresses(&asset, &method, false).await?;
        if addresses.is_empty() {
            addresses = self.get_deposit_addresses(&asset, &method, true).await?;
        }
        addresses
            .into_iter()
            .next()
            .map(|a| a.address)
            .ok_or_else(|| ExchangeError::EndpointError(format!("Kraken returned no {currency} address")))
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let open = self.get_open_orders().await?;
        Ok(request.filter(self.details(open.open, request.asset).await?))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let closed = self
            .get_closed_orders(request.start.map(|t| t.as_secs()), request.end.map(|t| t.as_secs()))
            .await?;
        Ok(request.filter(self.details(closed.closed, request.asset).await?))
    }

    /// The address must name a withdrawal key configured on Kraken
    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let result = self
            .withdraw(&to_kraken_asset(&request.currency), &crypto.address, request.amount)
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, result.refid, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: result.refid,
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

    const ASSET_PAIRS: &str = r#"{"error":[],"result":{
        "XXBTZUSD":{"altname":"XBTUSD","wsname":"XBT/USD","base":"XXBT","quote":"ZUSD","pair_decimals":1,"lot_decimals":8},
        "XETHZUSD":{"altname":"ETHUSD","wsname":"ETH/USD","base":"XETH","quote":"ZUSD","pair_decimals":2,"lot_decimals":8},
        "XXBTZUSD.d":{"altname":"XBTUSD.d","wsname":"","base":"XXBT","quote":"ZUSD"}
    }}"#;

    fn kraken(mock: MockTransport) -> (Kraken, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut kraken = Kraken::new().unwrap();
        kraken.base.set_transport(mock.clone());
        kraken.base.disable_rate_limiter();
        kraken.base.api.authenticated_support = true;
        kraken.base.set_credentials("api-key", "c2VjcmV0LXNlY3JldA==", "", "").unwrap();
        (kraken, mock)
    }

    #[monoio::test]
    async fn test_tradable_pairs_skip_dark_pool() {
        let (kraken, _) = kraken(MockTransport::new().route(Method::Get, "/public/AssetPairs", 200, ASSET_PAIRS));
        let pairs = kraken.fetch_tradable_pairs(Asset::Spot).await.unwrap();
        assert_eq!(pairs, vec![Pair::new("BTC", "USD"), Pair::new("ETH", "USD")]);
    }

    #[monoio::test]
    async fn test_ticker() {
        let body = r#"{"error":[],"result":{"XXBTZUSD":{
            "a":["30300.10000","1","1.000"],"b":["30300.00000","1","1.000"],
            "c":["30303.20000","0.00067643"],"v":["4083.67001100","4412.73601799"],
            "p":["30706.77771","30689.13205"],"t":[34619,38907],
            "l":["29868.30000","29868.30000"],"h":["31631.00000","31631.00000"],"o":"30502.80000"}}}"#;
        let (kraken, mock) = kraken(MockTransport::new().route(Method::Get, "/public/Ticker", 200, body));

        let ticker = kraken.update_ticker(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap();
        assert_eq!(ticker.last.to_string_exact(), "30303.2");
        assert_eq!(ticker.bid.to_string_exact(), "30300");
        assert_eq!(ticker.high.to_string_exact(), "31631");
        assert_eq!(ticker.volume.to_string_exact(), "4412.73601799");
        assert!(mock.last_request().unwrap().url.ends_with("Ticker?pair=XBTUSD"));
    }

    #[monoio::test]
    async fn test_orderbook() {
        let body = r#"{"error":[],"result":{"XXBTZUSD":{
            "asks":[["30384.10000","2.059",1688671659],["30387.90000","1.500",1688671380]],
            "bids":[["30297.00000","0.115",1688671701],["30296.70000","0.002",1688671674]]}}}"#;
        let (kraken, _) = kraken(MockTransport::new().route(Method::Get, "/public/Depth", 200, body));
        let book = kraken.update_orderbook(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap();
        assert_eq!(book.best_bid().unwrap().to_string_exact(), "30297");
        assert_eq!(book.asks.len(), 2);
    }

    #[monoio::test]
    async fn test_balance_translates_assets() {
        let body = r#"{"error":[],"result":{"XXBT":"1.5","ZUSD":"2500.25","DOT.S":"10"}}"#;
        let (kraken, mock) = kraken(MockTransport::new().route(Method::Post, "/private/Balance", 200, body));
        let holdings = kraken.update_account_info(Asset::Spot).await.unwrap();

        assert_eq!(holdings.total_for("BTC").to_string_exact(), "1.5");
        assert_eq!(holdings.total_for("USD").to_string_exact(), "2500.25");
        assert!(holdings.total_for("DOT").is_zero());

        let request = mock.last_request().unwrap();
        assert_eq!(request.header("API-Key"), Some("api-key"));
        assert!(request.header("API-Sign").is_some());
        assert!(request.body.unwrap().starts_with("nonce="));
    }

    #[monoio::test]
    async fn test_submit_order_params() {
        let (kraken, mock) = kraken(MockTransport::new().route(
            Method::Post,
            "/private/AddOrder",
            200,
            r#"{"error":[],"result":{"descr":{"order":"buy 1.25 XBTUSD @ limit 27500.0"},"txid":["OUF4EM-FRGI2-MQMWZD"]}}"#,
        ));
        let mut order = Submit::limit(Pair::new("BTC", "USD"), Side::Buy, Fixed::from_str_exact("1.25").unwrap(), Fixed::from_i64(27500));
        order.post_only = true;

        let response = kraken.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "OUF4EM-FRGI2-MQMWZD");

        let body = mock.last_request().unwrap().body.unwrap();
        assert!(body.contains("pair=XBTUSD"));
        assert!(body.contains("ordertype=limit"));
        assert!(body.contains("price=27500"));
        assert!(body.contains("oflags=post"));
    }

    #[monoio::test]
    async fn test_api_error_envelope() {
        let (kraken, _) = kraken(MockTransport::new().route(
            Method::Post,
            "/private/CancelOrder",
            200,
            r#"{"error":["EOrder:Unknown order"]}"#,
        ));
        let err = kraken
            .cancel_order(&Cancel::new("OXXXX", Pair::new("BTC", "USD"), Asset::Spot))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "EOrder", "Unknown order"));
    }

    #[monoio::test]
    async fn test_order_info_maps_status() {
        let mock = MockTransport::new()
            .route(Method::Get, "/public/AssetPairs", 200, ASSET_PAIRS)
            .route(
                Method::Post,
                "/private/QueryOrders",
                200,
                r#"{"error":[],"result":{"OBCMZD-JIEE7-77TH3F":{"status":"canceled","opentm":1688665496.7808,"closetm":1688665499.1922,
                "descr":{"pair":"XBTUSD","type":"sell","ordertype":"limit","price":"31000.0"},
                "vol":"2.0","vol_exec":"0.5","fee":"0.04","price":"31000.0","userref":0}}}"#,
            );
        let (kraken, _) = kraken(mock);
        let detail = kraken
            .order_info("OBCMZD-JIEE7-77TH3F", &Pair::new("BTC", "USD"), Asset::Spot)
            .await
            .unwrap();
        assert_eq!(detail.pair, Pair::new("BTC", "USD"));
        assert_eq!(detail.side, Side::Sell);
        assert_eq!(detail.status, Status::PartiallyCancelled);
        assert_eq!(detail.remaining_amount.to_string_exact(), "1.5");
    }

    #[test]
    fn test_status_table() {
        let cases = [
            ("pending", "0", Status::New),
            ("open", "0", Status::Active),
            ("open", "0.1", Status::PartiallyFilled),
            ("closed", "1", Status::Filled),
            ("canceled", "0", Status::Cancelled),
            ("expired", "0", Status::Expired),
        ];
        for (raw, executed, expected) in cases {
            assert_eq!(order_status(raw, Fixed::from_str_exact(executed).unwrap()), expected, "{raw}");
        }
    }

    #[monoio::test]
    async fn test_private_calls_need_credentials() {
        let mut kraken = Kraken::new().unwrap();
        kraken.base.set_transport(Arc::new(MockTransport::new()));
        assert!(matches!(
            kraken.update_account_info(Asset::Spot).await,
            Err(ExchangeError::AuthenticationSupportNotEnabled(_))
        ));
    }
}
