//! Bitfinex v2 adapter
//!
//! Trading symbols carry a `t` prefix (`tBTCUSD`); currencies longer than
//! three letters switch to a colon form (`tDOGE:USD`). Public calls go to
//! `api-pub`, signed calls to the authenticated host.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::json;
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

use self::rest::{BITFINEX_AUTH_URL, BITFINEX_PUBLIC_URL};
use self::types::{OrderRow, TickerRow, TradeRow};

pub const NAME: &str = "Bitfinex";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const BOOK_DEPTH: u32 = 100;

/// Post-only order flag
const FLAG_POST_ONLY: i64 = 4096;

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.001", "0.002");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.0004"),
    ("ETH", "0.00135"),
    ("LTC", "0.001"),
    ("XRP", "0.1"),
    ("EOS", "0.1"),
    ("USDT", "20"),
    ("DOGE", "4"),
];

/// Currency code to the deposit/withdraw method name Bitfinex expects
const METHODS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("LTC", "litecoin"),
    ("XRP", "ripple"),
    ("EOS", "eos"),
    ("USDT", "tetheruse"),
    ("DOGE", "dogecoin"),
    ("XMR", "monero"),
    ("ZEC", "zcash"),
    ("BCH", "bcash"),
];

pub struct Bitfinex {
    pub base: Base,
    nonce: Nonce,
}

/// Bitfinex spells a few currencies differently
fn to_bitfinex_currency(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "USDT" => "UST".to_string(),
        "DASH" => "DSH".to_string(),
        other => other.to_string(),
    }
}

fn from_bitfinex_currency(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "UST" => "USDT".to_string(),
        "DSH" => "DASH".to_string(),
        other => other.to_string(),
    }
}

fn method_for(currency: &str) -> String {
    METHODS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(currency))
        .map(|(_, method)| method.to_string())
        .unwrap_or_else(|| currency.to_ascii_lowercase())
}

/// `tBTCUSD` / `tDOGE:USD`
pub fn symbol(pair: &Pair) -> Result<String> {
    if pair.is_empty() {
        return Err(ExchangeError::PairIsEmpty);
    }
    let base = to_bitfinex_currency(&pair.base);
    let quote = to_bitfinex_currency(&pair.quote);
    if base.len() > 3 || quote.len() > 3 {
        Ok(format!("t{base}:{quote}"))
    } else {
        Ok(format!("t{base}{quote}"))
    }
}

/// Inverse of [`symbol`]; accepts names with or without the `t` prefix
pub fn pair_from_symbol(symbol: &str) -> Result<Pair> {
    let name = symbol.strip_prefix('t').unwrap_or(symbol);
    let (base, quote) = match name.split_once(':') {
        Some(parts) => parts,
        None if name.len() == 6 && name.is_ascii() => name.split_at(3),
        None => return Err(ExchangeError::InvalidPair(symbol.to_string())),
    };
    Ok(Pair::new(&from_bitfinex_currency(base), &from_bitfinex_currency(quote)))
}

/// Statuses read like `EXECUTED @ 9000.0(0.5)` or `CANCELED was: PARTIALLY FILLED @ ...`
pub fn order_status(status: &str) -> Status {
    let upper = status.to_ascii_uppercase();
    if upper.starts_with("ACTIVE") {
        Status::Active
    } else if upper.starts_with("EXECUTED") {
        Status::Filled
    } else if upper.starts_with("PARTIALLY FILLED") {
        Status::PartiallyFilled
    } else if upper.starts_with("CANCELED") && upper.contains("PARTIALLY FILLED") {
        Status::PartiallyCancelled
    } else if upper.starts_with("CANCELED") || upper.starts_with("POSTONLY CANCELED") {
        Status::Cancelled
    } else if upper.starts_with("INSUFFICIENT") {
        Status::InsufficientBalance
    } else if upper.starts_with("RSN_") {
        Status::Rejected
    } else {
        Status::Unknown
    }
}

fn order_type_name(order: &Submit) -> Result<&'static str> {
    Ok(match order.order_type {
        OrderType::Limit | OrderType::PostOnly => "EXCHANGE LIMIT",
        OrderType::Market => "EXCHANGE MARKET",
        OrderType::Stop => "EXCHANGE STOP",
        OrderType::StopLimit => "EXCHANGE STOP LIMIT",
        OrderType::ImmediateOrCancel => "EXCHANGE IOC",
        OrderType::FillOrKill => "EXCHANGE FOK",
        other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
    })
}

fn ticker_from_row(pair: &Pair, asset: Asset, row: &TickerRow) -> Ticker {
    Ticker {
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset: Some(asset),
        last: row.last,
        high: row.high,
        low: row.low,
        bid: row.bid,
        ask: row.ask,
        volume: row.volume,
        open: row.open(),
        last_updated: Timestamp::now(),
        ..Default::default()
    }
}

fn trade_from_row(pair: &Pair, asset: Asset, row: TradeRow) -> TradeData {
    TradeData {
        tid: row.id.to_string(),
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset,
        side: if row.amount.is_negative() { Side::Sell } else { Side::Buy },
        price: row.price,
        amount: row.amount.abs(),
        timestamp: Timestamp::from_millis(row.mts),
    }
}

impl Bitfinex {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, BITFINEX_PUBLIC_URL),
            (UrlKind::RestSpotSupplementary, BITFINEX_AUTH_URL),
            (UrlKind::WebsocketSpot, "wss://api-pub.bitfinex.com/ws/2"),
        ])?;

        base.pairs = PairsManager::new(PairFormat::new(true, ""), PairFormat::new(true, "-"));
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
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION
                | WithdrawPermissions::AUTO_WITHDRAW_FIAT_WITH_API_PERMISSION,
        );

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::new(90, Duration::from_secs(60))),
            (PRIVATE, RateLimit::new(90, Duration::from_secs(60))),
        ]);

        Ok(Self {
            base,
            nonce: Nonce::new(NonceUnit::Micros),
        })
    }

    /// Refresh the batch ticker pairs in one request
    pub async fn update_tickers(&self, asset: Asset) -> Result<Vec<Ticker>> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let symbols = pairs.iter().map(symbol).collect::<Result<Vec<_>>>()?;
        let rows = self.get_tickers(&symbols).await?;

        let mut tickers = Vec::with_capacity(rows.len());
        for (name, row) in rows {
            let Ok(pair) = pair_from_symbol(&name) else {
                debug!("📋 {} skipping ticker for {}", NAME, name);
                continue;
            };
            if !pairs.contains(&pair) {
                continue;
            }
            let ticker = ticker_from_row(&pair, asset, &row);
            self.base.store.process_ticker(ticker.clone(), asset)?;
            tickers.push(ticker);
        }
        Ok(tickers)
    }

    fn detail(order: &OrderRow, asset: Asset) -> Result<Detail> {
        let pair = pair_from_symbol(&order.symbol)?;
        let mut detail = Detail::new(NAME, &order.id.to_string(), pair, asset);
        if order.client_id != 0 {
            detail.client_order_id = order.client_id.to_string();
        }
        detail.side = if order.amount_orig.is_negative() { Side::Sell } else { Side::Buy };
        detail.order_type = OrderType::parse(&order.order_type);
        detail.status = order_status(&order.status);
        detail.price = order.price;
        detail.amount = order.amount_orig.abs();
        detail.executed_amount = order.executed();
        detail.remaining_amount = order.amount.abs();
        detail.average_executed_price = order.price_avg;
        detail.date = Timestamp::from_millis(order.mts_create);
        detail.last_updated = Timestamp::from_millis(order.mts_update);
        Ok(detail)
    }

    fn parse_id(id: &str) -> Result<i64> {
        id.parse().map_err(|_| ExchangeError::OrderNotFound(id.to_string()))
    }

    fn single_symbol(request: &GetOrdersRequest) -> Result<Option<String>> {
        match request.pairs.as_slice() {
            [single] => Ok(Some(symbol(single)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait(?Send)]
impl BotExchange for Bitfinex {
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
        let names = self.get_pairs().await?;
        Ok(names.iter().filter_map(|name| pair_from_symbol(name).ok()).collect())
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let row = self.get_ticker(&symbol(pair)?).await?;
        let ticker = ticker_from_row(pair, asset, &row);
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let rows = self.get_orderbook(&symbol(pair)?, BOOK_DEPTH).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        for row in rows {
            let mut level = Level::new(row.price, row.amount.abs());
            level.count = Some(row.count);
            if row.amount.is_negative() {
                book.asks.push(level);
            } else {
                book.bids.push(level);
            }
        }
        book.last_updated = Timestamp::now();
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let wallets = self.get_wallets().await?;
        let mut accounts: Vec<SubAccount> = Vec::new();
        for wallet in wallets {
            let balance = Balance::from_total_and_hold(
                &from_bitfinex_currency(&wallet.currency),
                wallet.balance,
                wallet.balance - wallet.available,
            );
            match accounts.iter_mut().find(|a| a.id == wallet.wallet_type) {
                Some(account) => account.currencies.push(balance),
                None => accounts.push(SubAccount {
                    id: wallet.wallet_type,
                    asset: Some(asset),
                    currencies: vec![balance],
                }),
            }
        }
        let holdings = Holdings {
            exchange: NAME.to_string(),
            accounts,
        };
        self.base.store.process_holdings(holdings.clone(), asset)?;
        Ok(holdings)
    }

    async fn recent_trades(&self, pair: &Pair, asset: Asset) -> Result<Vec<TradeData>> {
        let rows = self.get_trades(&symbol(pair)?, None, None).await?;
        Ok(rows.into_iter().map(|row| trade_from_row(pair, asset, row)).collect())
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
        let rows = self
            .get_trades(&symbol(pair)?, Some(start.as_millis()), Some(end.as_millis()))
            .await?;
        Ok(rows.into_iter().map(|row| trade_from_row(pair, asset, row)).collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee | FeeType::OfflineTradeFee => Ok(TRADE_FEES.estimate(builder)),
            FeeType::CryptocurrencyWithdrawalFee => Ok(lookup_withdrawal_fee(WITHDRAWAL_FEES, &builder.pair.base)),
            _ => Ok(Fixed::ZERO),
        }
    }

    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let movements = self.get_movements().await?;
        Ok(movements
            .into_iter()
            .map(|m| FundHistory {
                id: m.id.to_string(),
                status: m.status,
                timestamp: Timestamp::from_millis(m.mts_started),
                currency: from_bitfinex_currency(&m.currency),
                transfer_type: if m.amount.is_negative() { "WITHDRAWAL" } else { "DEPOSIT" }.to_string(),
                amount: m.amount.abs(),
                fee: m.fees.abs(),
                crypto_to_address: m.address,
                crypto_tx_id: m.tx_id,
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let amount = if order.side.is_short() { -order.amount } else { order.amount };
        let mut body = json!({
            "type": order_type_name(order)?,
            "symbol": symbol(&order.pair)?,
            "amount": amount.to_string_exact(),
        });
        match order.order_type {
            OrderType::Market => {}
            OrderType::Stop => body["price"] = json!(order.trigger_price.to_string_exact()),
            OrderType::StopLimit => {
                body["price"] = json!(order.trigger_price.to_string_exact());
                body["price_aux_limit"] = json!(order.price.to_string_exact());
            }
            _ => body["price"] = json!(order.price.to_string_exact()),
        }
        if order.post_only || order.order_type == OrderType::PostOnly {
            body["flags"] = json!(FLAG_POST_ONLY);
        }
        if let Ok(cid) = order.client_order_id.parse::<i64>() {
            body["cid"] = json!(cid);
        }

        let placed = self.submit(body).await?;
        log_order!(NAME, "placed", placed.id, order.pair, order.side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: order_status(&placed.status) == Status::Filled,
            order_id: placed.id.to_string(),
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        self.cancel_by_id(Self::parse_id(cancel.require_order_id()?)?).await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, _cancel: &Cancel) -> Result<CancelAllResponse> {
        let cancelled = self.cancel_all().await?;
        info!("🧹 {} cancelled {} orders", NAME, cancelled.len());
        Ok(CancelAllResponse {
            count: cancelled.len(),
            status: cancelled
                .into_iter()
                .map(|o| (o.id.to_string(), o.status))
                .collect(),
        })
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let id = Self::parse_id(order_id)?;
        let mut found = self.get_active_orders(None, &[id]).await?;
        if found.is_empty() {
            found = self.get_order_history(None, &[id]).await?;
        }
        let order = found
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        Self::detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, chain: &str) -> Result<String> {
        let method = if chain.is_empty() { method_for(currency) } else { chain.to_string() };
        self.get_deposit_address(&method, false).await
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let orders = self
            .get_active_orders(Self::single_symbol(request)?.as_deref(), &[])
            .await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn order_history(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let orders = self
            .get_order_history(Self::single_symbol(request)?.as_deref(), &[])
            .await?;
        let details = orders
            .iter()
            .map(|o| Self::detail(o, request.asset))
            .collect::<Result<Vec<_>>>()?;
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let method = if crypto.chain.is_empty() { method_for(&request.currency) } else { crypto.chain.clone() };
        let id = self
            .withdraw(&method, request.amount, &crypto.address, &crypto.address_tag)
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

    fn bitfinex(mock: MockTransport) -> (Bitfinex, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let mut exchange = Bitfinex::new().unwrap();
        exchange.base.set_transport(mock.clone());
        exchange.base.disable_rate_limiter();
        exchange.base.api.authenticated_support = true;
        exchange.base.set_credentials("bfx-key", "bfx-secret", "", "").unwrap();
        (exchange, mock)
    }

    const ORDER: &str = r#"[1185815098,null,1234,"tBTCUSD",1583240000000,1583240000500,-0.5,-1.0,"EXCHANGE LIMIT",null,null,null,0,"PARTIALLY FILLED @ 9000.0(-0.5)",null,null,9000.0,9000.0,0,0,null,null,null,0,0,null,null,null,"API>BFX",null,null,null]"#;

    #[test]
    fn test_symbol_forms() {
        assert_eq!(symbol(&Pair::new("BTC", "USD")).unwrap(), "tBTCUSD");
        assert_eq!(symbol(&Pair::new("DOGE", "USD")).unwrap(), "tDOGE:USD");
        assert_eq!(symbol(&Pair::new("BTC", "USDT")).unwrap(), "tBTCUST");
        assert_eq!(pair_from_symbol("tDOGE:USD").unwrap(), Pair::new("DOGE", "USD"));
        assert_eq!(pair_from_symbol("BTCUST").unwrap(), Pair::new("BTC", "USDT"));
        assert!(pair_from_symbol("tBTCUSDX").is_err());
        assert!(pair_from_symbol("tBT€U").is_err());
        assert!(pair_from_symbol("tÅBUSD").is_err());
    }

    #[test]
    fn test_status_prefixes() {
        assert_eq!(order_status("ACTIVE"), Status::Active);
        assert_eq!(order_status("EXECUTED @ 107.6(-0.2)"), Status::Filled);
        assert_eq!(order_status("PARTIALLY FILLED @ 9000.0(-0.5)"), Status::PartiallyFilled);
        assert_eq!(order_status("CANCELED was: PARTIALLY FILLED @ 9000.0(-0.5)"), Status::PartiallyCancelled);
        assert_eq!(order_status("CANCELED"), Status::Cancelled);
        assert_eq!(order_status("INSUFFICIENT MARGIN was: PARTIALLY FILLED"), Status::InsufficientBalance);
        assert_eq!(order_status("RSN_DUST"), Status::Rejected);
    }

    #[monoio::test]
    async fn test_orderbook_splits_on_sign() {
        let (exchange, mock) = bitfinex(MockTransport::new().route(
            Method::Get,
            "book/tBTCUSD/P0",
            200,
            "[[9000,2,1.5],[8999,1,0.5],[9001,3,-2],[9002,1,-0.25]]",
        ));
        let book = exchange.update_orderbook(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap();
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.asks[0].amount.to_string_exact(), "2");
        assert_eq!(book.asks[0].count, Some(3));
        assert!(mock.last_request().unwrap().url.starts_with(BITFINEX_PUBLIC_URL));
    }

    #[monoio::test]
    async fn test_batch_tickers_skip_funding() {
        let (mut exchange, _) = bitfinex(MockTransport::new().route(
            Method::Get,
            "tickers?symbols=",
            200,
            r#"[["tBTCUSD",9000,1,9001,1,100,0.01,9000.5,1234.5,9100,8800],["fUSD",0.0001,0.0002,2,1,0,0,0,0,0,0,0,0,0,0,0,0]]"#,
        ));
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USD")], Asset::Spot, false)
            .unwrap();
        exchange
            .base
            .set_pairs(vec![Pair::new("BTC", "USD")], Asset::Spot, true)
            .unwrap();
        let tickers = exchange.update_tickers(Asset::Spot).await.unwrap();
        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].open.to_string_exact(), "8900.5");
        assert!(exchange.base.store.get_ticker(&Pair::new("BTC", "USD"), Asset::Spot).is_ok());
    }

    #[monoio::test]
    async fn test_submit_sell_negative_amount() {
        let notification = format!(
            r#"[1567590617442,"on-req",null,null,[{ORDER}],null,"SUCCESS","Submitting 1 orders."]"#
        );
        let (exchange, mock) = bitfinex(MockTransport::new().route(
            Method::Post,
            "auth/w/order/submit",
            200,
            &notification,
        ));
        let mut order = Submit::limit(Pair::new("BTC", "USD"), Side::Sell, Fixed::ONE, Fixed::from_i64(9000));
        order.post_only = true;
        order.client_order_id = "1234".to_string();
        let response = exchange.submit_order(&order).await.unwrap();
        assert_eq!(response.order_id, "1185815098");

        let request = mock.last_request().unwrap();
        assert!(request.url.starts_with(BITFINEX_AUTH_URL));
        assert_eq!(request.header("bfx-apikey"), Some("bfx-key"));
        assert!(request.header("bfx-nonce").is_some());
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["amount"], "-1");
        assert_eq!(body["flags"], 4096);
        assert_eq!(body["cid"], 1234);
        assert_eq!(body["type"], "EXCHANGE LIMIT");
    }

    #[monoio::test]
    async fn test_order_info_falls_back_to_history() {
        let (exchange, mock) = bitfinex(
            MockTransport::new()
                .route(Method::Post, "auth/r/orders/hist", 200, &format!("[{ORDER}]"))
                .route(Method::Post, "auth/r/orders", 200, "[]"),
        );
        let detail = exchange
            .order_info("1185815098", &Pair::new("BTC", "USD"), Asset::Spot)
            .await
            .unwrap();
        assert_eq!(detail.status, Status::PartiallyFilled);
        assert_eq!(detail.side, Side::Sell);
        assert_eq!(detail.executed_amount.to_string_exact(), "0.5");
        assert_eq!(detail.client_order_id, "1234");
        assert_eq!(mock.requests().len(), 2);
    }

    #[monoio::test]
    async fn test_wallets_grouped_by_type() {
        let (exchange, _) = bitfinex(MockTransport::new().route(
            Method::Post,
            "auth/r/wallets",
            200,
            r#"[["exchange","BTC",1.5,0,1.0,null,null],["exchange","UST",100,0,100,null,null],["margin","BTC",0.1,0,0.1,null,null]]"#,
        ));
        let holdings = exchange.update_account_info(Asset::Spot).await.unwrap();
        assert_eq!(holdings.accounts.len(), 2);
        assert_eq!(holdings.accounts[0].currencies[1].currency, "USDT");
        assert_eq!(holdings.accounts[0].currencies[0].hold.to_string_exact(), "0.5");
    }

    #[monoio::test]
    async fn test_error_envelope() {
        let (exchange, _) = bitfinex(MockTransport::new().route(
            Method::Get,
            "ticker/tBTCUSD",
            500,
            r#"["error",10020,"symbol: invalid"]"#,
        ));
        let err = exchange.update_ticker(&Pair::new("BTC", "USD"), Asset::Spot).await.unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 10020, "symbol: invalid"));
    }
}
