//! BTSE spot adapter
//!
//! Symbols are `BTC-USD`. Order results report state as integer codes.

pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::json;
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

use self::rest::BTSE_API_URL;
use self::types::{OpenOrder, OrderResult, Trade};

pub const NAME: &str = "BTSE";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.0005", "0.001");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BTC", "0.0005"),
    ("ETH", "0.01"),
    ("LTC", "0.001"),
    ("USDT", "10"),
    ("XMR", "0.0001"),
];

pub const STATUS_ORDER_INSERTED: i64 = 2;
pub const STATUS_ORDER_FULLY_TRANSACTED: i64 = 4;
pub const STATUS_ORDER_PARTIALLY_TRANSACTED: i64 = 5;
pub const STATUS_ORDER_CANCELLED: i64 = 6;
pub const STATUS_INSUFFICIENT_BALANCE: i64 = 8;
pub const STATUS_TRIGGER_INSERTED: i64 = 9;
pub const STATUS_ORDER_REJECTED: i64 = 15;

pub struct Btse {
    pub base: Base,
}

pub fn order_status(code: i64) -> Status {
    match code {
        STATUS_ORDER_INSERTED => Status::Active,
        STATUS_ORDER_FULLY_TRANSACTED => Status::Filled,
        STATUS_ORDER_PARTIALLY_TRANSACTED => Status::PartiallyFilled,
        STATUS_ORDER_CANCELLED => Status::Cancelled,
        STATUS_INSUFFICIENT_BALANCE => Status::InsufficientBalance,
        STATUS_TRIGGER_INSERTED => Status::New,
        STATUS_ORDER_REJECTED => Status::Rejected,
        _ => Status::Unknown,
    }
}

/// `orderType` code: 76 limit, 77 market, 80 peg
fn order_type(code: i64) -> OrderType {
    match code {
        76 => OrderType::Limit,
        77 => OrderType::Market,
        _ => OrderType::Unknown,
    }
}

/// Open order listings use `STATUS_ACTIVE` style names
fn open_order_status(order: &OpenOrder) -> Status {
    match order.order_state.as_str() {
        "STATUS_ACTIVE" if order.fill_size.is_positive() => Status::PartiallyFilled,
        "STATUS_ACTIVE" => Status::Active,
        "STATUS_INACTIVE" => Status::New,
        other => Status::parse(other.trim_start_matches("STATUS_")),
    }
}

impl Btse {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, BTSE_API_URL),
            (UrlKind::WebsocketSpot, "wss://ws.btse.com/ws/spot"),
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
                crypto_deposit: true,
                crypto_withdrawal: true,
                deposit_history: true,
                withdrawal_history: true,
                trade_fee: true,
                crypto_withdrawal_fee: true,
                ..Default::default()
            },
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO | WithdrawPermissions::NO_FIAT_WITHDRAWALS,
        );

        base.set_rate_limits(&[
            (PUBLIC, RateLimit::per_second(15)),
            (PRIVATE, RateLimit::new(75, Duration::from_secs(1))),
        ]);

        Ok(Self { base })
    }

    fn symbol(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    fn trade(pair: &Pair, asset: Asset, t: Trade) -> TradeData {
        TradeData {
            tid: t.serial_id.to_string(),
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset,
            side: Side::parse(&t.side),
            price: t.price,
            amount: t.size,
            timestamp: Timestamp::from_millis(t.timestamp),
        }
    }

    fn detail_from_result(order: &OrderResult, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.symbol, "-")?;
        let mut detail = Detail::new(NAME, &order.order_id, pair, asset);
        detail.client_order_id = order.client_order_id.clone();
        detail.side = Side::parse(&order.side);
        detail.order_type = order_type(order.order_type);
        detail.status = order_status(order.status);
        detail.price = order.price;
        detail.amount = order.size;
        detail.executed_amount = order.fill_size;
        detail.average_executed_price = order.average_fill_price;
        detail.date = Timestamp::from_millis(order.timestamp);
        detail.last_updated = detail.date;
        detail.infer_remaining();
        Ok(detail)
    }

    fn detail_from_open(order: &OpenOrder, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.symbol, "-")?;
        let mut detail = Detail::new(NAME, &order.order_id, pair, asset);
        detail.client_order_id = order.client_order_id.clone();
        detail.side = Side::parse(&order.side);
        detail.order_type = order_type(order.order_type);
        detail.status = open_order_status(order);
        detail.price = order.price;
        detail.amount = order.size;
        detail.executed_amount = order.fill_size;
        detail.average_executed_price = order.average_fill_price;
        detail.date = Timestamp::from_millis(order.timestamp);
        detail.last_updated = detail.date;
        detail.infer_remaining();
        Ok(detail)
    }
}

#[async_trait(?Send)]
impl BotExchange for Btse {
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
        let markets = self.get_market_summary("").await?;
        let mut pairs = Vec::with_capacity(markets.len());
        for market in markets.iter().filter(|m| m.active) {
            if market.base.is_empty() || market.quote.is_empty() {
                pairs.push(Pair::from_delimited(&market.symbol, "-")?);
            } else {
                pairs.push(Pair::new(&market.base, &market.quote));
            }
        }
        Ok(pairs)
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let symbol = self.symbol(pair, asset)?;
        let summary = self
            .get_market_summary(&symbol)
            .await?
            .into_iter()
            .find(|m| m.symbol == symbol)
            .ok_or_else(|| ExchangeError::InvalidPair(symbol.clone()))?;
        let ticker = Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: summary.last,
            high: summary.high_24h,
            low: summary.low_24h,
            bid: summary.highest_bid,
            ask: summary.lowest_ask,
            volume: summary.volume,
            last_updated: Timestamp::now(),
            ..Default::default()
        };
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let raw = self.fetch_orderbook(&self.symbol(pair, asset)?).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = raw.buy_quote.iter().map(|q| Level::new(q.price, q.size)).collect();
        book.asks = raw.sell_quote.iter().map(|q| Level::new(q.price, q.size)).collect();
        // sell quotes arrive highest first
        book.sort();
        book.last_updated = if raw.timestamp > 0 { Timestamp::from_millis(raw.timestamp) } else { Timestamp::now() };
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let wallet = self.get_wallet_information().await?;
        let currencies = wallet
            .iter()
            .map(|w| Balance::from_total_and_hold(&w.currency, w.total, w.total - w.available))
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
        let trades = self.get_trades(&self.symbol(pair, asset)?, None, None).await?;
        Ok(trades.into_iter().map(|t| Self::trade(pair, asset, t)).collect())
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
            .get_trades(&self.symbol(pair, asset)?, Some(start.as_millis()), Some(end.as_millis()))
            .await?;
        Ok(trades.into_iter().map(|t| Self::trade(pair, asset, t)).collect())
    }

    async fn fee_by_type(&self, builder: &FeeBuilder) -> Result<Fixed> {
        match builder.fee_type {
            FeeType::CryptocurrencyTradeFee if self.base.allow_authenticated_request() => {
                let symbol = self.symbol(&builder.pair, Asset::Spot)?;
                let fees = self.get_fees(&symbol).await?;
                match fees.iter().find(|f| f.symbol == symbol) {
                    Some(fee) => {
                        let rate = if builder.is_maker { fee.maker_fee } else { fee.taker_fee };
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
        let history = self.get_wallet_history().await?;
        Ok(history
            .into_iter()
            .filter(|h| {
                let kind = h.history_type.to_ascii_lowercase();
                kind.contains("deposit") || kind.contains("withdraw")
            })
            .map(|h| FundHistory {
                id: h.order_id,
                status: h.status,
                timestamp: Timestamp::from_millis(h.timestamp),
                currency: h.currency.to_ascii_uppercase(),
                amount: h.amount.abs(),
                fee: h.fees,
                transfer_type: h.history_type,
                crypto_to_address: h.address,
                crypto_tx_id: h.txid,
            })
            .collect())
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        let side = if order.side.is_long() { "BUY" } else { "SELL" };
        let mut body = json!({
            "symbol": self.symbol(&order.pair, order.asset)?,
            "side": side,
            "size": order.amount.to_string_exact(),
        });
        match order.order_type {
            OrderType::Market => {
                body["type"] = json!("MARKET");
                body["txType"] = json!("LIMIT");
            }
            OrderType::Limit | OrderType::PostOnly | OrderType::ImmediateOrCancel | OrderType::FillOrKill => {
                body["type"] = json!("LIMIT");
                body["txType"] = json!("LIMIT");
                body["price"] = json!(order.price.to_string_exact());
            }
            OrderType::Stop | OrderType::StopLimit => {
                body["type"] = json!("LIMIT");
                body["txType"] = json!("STOP");
                body["price"] = json!(order.price.to_string_exact());
                body["triggerPrice"] = json!(order.trigger_price.to_string_exact());
            }
            other => return Err(ExchangeError::TypeIsInvalid(other.to_string())),
        }
        let tif = match order.order_type {
            OrderType::ImmediateOrCancel => "IOC",
            OrderType::FillOrKill => "FOK",
            _ if order.immediate_or_cancel => "IOC",
            _ => "GTC",
        };
        body["time_in_force"] = json!(tif);
        if order.post_only || order.order_type == OrderType::PostOnly {
            body["postOnly"] = json!(true);
        }
        if !order.client_order_id.is_empty() {
            body["clOrderID"] = json!(order.client_order_id);
        }

        let results = self.create_order(body).await?;
        let placed = results
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} order response was empty")))?;
        let status = order_status(placed.status);
        if matches!(status, Status::Rejected | Status::InsufficientBalance) {
            return Err(ExchangeError::api(NAME, placed.status, placed.message));
        }
        log_order!(NAME, "placed", placed.order_id, order.pair, side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: status == Status::Filled,
            order_id: placed.order_id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        cancel.validate()?;
        let symbol = self.symbol(&cancel.pair, cancel.asset)?;
        let results = self
            .cancel_existing_order(&cancel.order_id, &symbol, &cancel.client_order_id)
            .await?;
        match results.first() {
            Some(result) if result.status == STATUS_ORDER_CANCELLED => Ok(()),
            Some(result) => Err(ExchangeError::api(NAME, result.status, result.message.clone())),
            None => Err(ExchangeError::OrderNotFound(cancel.order_id.clone())),
        }
    }

    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let symbol = self.symbol(&cancel.pair, cancel.asset)?;
        let results = self.cancel_existing_order("", &symbol, "").await?;
        let mut response = CancelAllResponse::default();
        for result in results {
            if result.status == STATUS_ORDER_CANCELLED {
                response.count += 1;
            } else {
                warn!("⚠️ {} order {} not cancelled: status {}", NAME, result.order_id, result.status);
            }
            response.status.insert(result.order_id, order_status(result.status).to_string());
        }
        info!("🧹 {} cancelled {} orders on {}", NAME, response.count, symbol);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, _pair: &Pair, asset: Asset) -> Result<Detail> {
        let order = self.get_order(order_id).await?;
        if order.order_id.is_empty() {
            return Err(ExchangeError::OrderNotFound(order_id.to_string()));
        }
        Self::detail_from_result(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, _chain: &str) -> Result<String> {
        let currency = currency.to_ascii_uppercase();
        let mut addresses = self.get_wallet_address(&currency).await?;
        if addresses.is_empty() {
            addresses = self.create_wallet_address(&currency).await?;
        }
        addresses
            .into_iter()
            .next()
            .map(|a| a.address)
            .ok_or_else(|| ExchangeError::EndpointError(format!("{NAME} returned no {currency} address")))
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        let mut details = Vec::new();
        if request.pairs.is_empty() {
            for order in self.get_open_orders("").await? {
                details.push(Self::detail_from_open(&order, request.asset)?);
            }
        } else {
            for pair in &request.pairs {
                for order in self.get_open_orders(&self.symbol(pair, request.asset)?).await? {
                    details.push(Self::detail_from_open(&order, request.asset)?);
                }
            }
        }
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        let result = self
            .withdraw(&request.currency, &crypto.address, &crypto.address_tag, request.amount)
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, result.withdraw_id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: result.withdraw_id,
            status: String::new(),
        })
    }
}
