//! ZB spot adapter
//!
//! Market symbols are lowercase and underscore delimited (`btc_usdt`) while
//! `allTicker` keys drop the delimiter. Trading happens on a second host.

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

use self::rest::{ZB_API_URL, ZB_TRADE_URL};
use self::types::{Order, TickerData};

pub const NAME: &str = "ZB";

pub(crate) const PUBLIC: EndpointLimit = EndpointLimit::DEFAULT;
pub(crate) const PRIVATE: EndpointLimit = EndpointLimit(1);

const TRADE_FEES: TradeFeeSchedule = TradeFeeSchedule::new("0.002", "0.002");

const WITHDRAWAL_FEES: &[(&str, &str)] = &[
    ("BCH", "0.0002"),
    ("BTC", "0.001"),
    ("EOS", "0.1"),
    ("ETC", "0.01"),
    ("ETH", "0.01"),
    ("LTC", "0.005"),
    ("QTUM", "0.01"),
    ("USDT", "5"),
    ("XRP", "0.1"),
    ("ZB", "5"),
];

const DEPTH_SIZE: u32 = 50;
const PAGE_SIZE: u32 = 10;
const BUY: u8 = 1;
const SELL: u8 = 0;

pub struct Zb {
    pub base: Base,
}

pub fn order_status(code: i64) -> Status {
    match code {
        0 => Status::Active,
        1 => Status::Cancelled,
        2 => Status::Filled,
        3 => Status::PartiallyFilled,
        _ => Status::Unknown,
    }
}

impl Zb {
    pub fn new() -> Result<Self> {
        let mut base = Base::new(NAME);
        base.enabled = true;
        base.api.validator = CredentialsValidator::key_and_secret();
        base.api.endpoints.set_defaults(&[
            (UrlKind::RestSpot, ZB_API_URL),
            (UrlKind::RestSpotSupplementary, ZB_TRADE_URL),
        ])?;

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
            (PUBLIC, RateLimit::new(60, Duration::from_secs(1))),
            (PRIVATE, RateLimit::new(10, Duration::from_secs(1))),
        ]);

        Ok(Self { base })
    }

    fn symbol(&self, pair: &Pair, asset: Asset) -> Result<String> {
        self.base.format_exchange_currency(pair, asset)
    }

    /// Refresh the batch ticker pairs from `allTicker`
    pub async fn update_tickers(&self, asset: Asset) -> Result<()> {
        let pairs = self.base.ticker_pairs(asset)?;
        if pairs.is_empty() {
            return Ok(());
        }
        let tickers = self.get_all_tickers().await?;
        for pair in pairs {
            let key = format!("{}{}", pair.base, pair.quote).to_ascii_lowercase();
            if let Some(t) = tickers.get(&key) {
                self.base.store.process_ticker(Self::ticker(&pair, asset, t), asset)?;
            }
        }
        Ok(())
    }

    fn ticker(pair: &Pair, asset: Asset, t: &TickerData) -> Ticker {
        Ticker {
            exchange: NAME.to_string(),
            pair: pair.clone(),
            asset: Some(asset),
            last: t.last,
            high: t.high,
            low: t.low,
            bid: t.buy,
            ask: t.sell,
            volume: t.vol,
            close: t.last,
            last_updated: Timestamp::now(),
            ..Default::default()
        }
    }

    fn detail(order: &Order, asset: Asset) -> Result<Detail> {
        let pair = Pair::from_delimited(&order.currency, "_")?;
        let mut detail = Detail::new(NAME, &order.id, pair, asset);
        detail.side = if order.trade_type == i64::from(BUY) { Side::Buy } else { Side::Sell };
        detail.order_type = OrderType::Limit;
        detail.status = order_status(order.status);
        detail.price = order.price;
        detail.amount = order.total_amount;
        detail.executed_amount = order.trade_amount;
        if order.trade_amount.is_positive() {
            detail.average_executed_price = order.trade_money.checked_div(order.trade_amount)?;
        }
        detail.date = Timestamp::from_millis(order.trade_date);
        detail.last_updated = detail.date;
        detail.infer_remaining();
        Ok(detail)
    }

    /// Currencies that appear in enabled pairs, lowercase
    fn enabled_currencies(&self) -> Result<Vec<String>> {
        let mut currencies: Vec<String> = self
            .base
            .enabled_pairs(Asset::Spot)?
            .iter()
            .flat_map(|p| [p.base.to_ascii_lowercase(), p.quote.to_ascii_lowercase()])
            .collect();
        currencies.sort();
        currencies.dedup();
        Ok(currencies)
    }
}

#[async_trait(?Send)]
impl BotExchange for Zb {
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
        self.get_markets()
            .await?
            .keys()
            .map(|symbol| Pair::from_delimited(symbol, "_"))
            .collect()
    }

    async fn update_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        let response = self.get_ticker(&self.symbol(pair, asset)?).await?;
        let ticker = Self::ticker(pair, asset, &response.ticker);
        self.base.store.process_ticker(ticker.clone(), asset)?;
        Ok(ticker)
    }

    async fn update_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        let depth = self.get_depth(&self.symbol(pair, asset)?, DEPTH_SIZE).await?;
        let mut book = Orderbook::new(NAME, pair.clone(), asset);
        book.bids = depth.bids.iter().map(Level::from_pair_value).collect::<Result<_>>()?;
        book.asks = depth
            .asks
            .iter()
            .rev()
            .map(Level::from_pair_value)
            .collect::<Result<_>>()?;
        book.last_updated = if depth.timestamp > 0 {
            Timestamp::from_secs(depth.timestamp)
        } else {
            Timestamp::now()
        };
        self.base.store.process_orderbook(book)?;
        self.base.store.get_orderbook(pair, asset)
    }

    async fn update_account_info(&self, asset: Asset) -> Result<Holdings> {
        let info = self.get_account_info().await?;
        let currencies = info
            .result
            .coins
            .iter()
            .filter(|c| !c.available.is_zero() || !c.frozen.is_zero())
            .map(|c| Balance::from_free_and_hold(&c.en_name.to_ascii_uppercase(), c.available, c.frozen))
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
        let trades = self.get_trades(&self.symbol(pair, asset)?).await?;
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
                timestamp: Timestamp::from_secs(t.date),
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

    /// Deposits and withdrawals for each currency in the enabled pairs
    async fn funding_history(&self) -> Result<Vec<FundHistory>> {
        let mut history = Vec::new();
        for currency in self.enabled_currencies()? {
            for w in self.get_withdraw_records(&currency).await? {
                history.push(FundHistory {
                    id: w.id.to_string(),
                    status: w.status.to_string(),
                    timestamp: Timestamp::from_millis(w.submit_time),
                    currency: currency.to_ascii_uppercase(),
                    amount: w.amount,
                    fee: w.fees,
                    transfer_type: "withdrawal".to_string(),
                    crypto_to_address: w.to_address,
                    crypto_tx_id: String::new(),
                });
            }
            for d in self.get_charge_records(&currency).await? {
                history.push(FundHistory {
                    id: d.id.to_string(),
                    status: d.status.to_string(),
                    timestamp: parse_charge_time(&d.submit_time),
                    currency: currency.to_ascii_uppercase(),
                    amount: d.amount,
                    fee: Fixed::ZERO,
                    transfer_type: "deposit".to_string(),
                    crypto_to_address: d.address,
                    crypto_tx_id: d.hash,
                });
            }
        }
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    async fn submit_order(&self, order: &Submit) -> Result<SubmitResponse> {
        order.validate()?;
        if order.order_type != OrderType::Limit {
            return Err(ExchangeError::TypeIsInvalid(order.order_type.to_string()));
        }
        let trade_type = if order.side.is_long() { BUY } else { SELL };
        let result = self
            .place_order(&self.symbol(&order.pair, order.asset)?, order.price, order.amount, trade_type)
            .await?;
        log_order!(NAME, "placed", result.id, order.pair, order.side, order.amount);
        Ok(SubmitResponse {
            is_order_placed: true,
            fully_matched: false,
            order_id: result.id,
        })
    }

    async fn cancel_order(&self, cancel: &Cancel) -> Result<()> {
        let order_id = cancel.require_order_id()?;
        if cancel.pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        self.remove_order(&self.symbol(&cancel.pair, cancel.asset)?, order_id)
            .await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, cancel: &Cancel) -> Result<CancelAllResponse> {
        let pairs = if cancel.pair.is_empty() {
            self.base.enabled_pairs(cancel.asset)?
        } else {
            vec![cancel.pair.clone()]
        };
        let mut response = CancelAllResponse::default();
        for pair in pairs {
            let symbol = self.symbol(&pair, cancel.asset)?;
            let mut page = 1;
            loop {
                let orders = self.get_unfinished_orders(&symbol, page, PAGE_SIZE).await?;
                for order in &orders {
                    match self.remove_order(&symbol, &order.id).await {
                        Ok(_) => response.count += 1,
                        Err(e) => {
                            warn!("⚠️ {} failed to cancel {}: {}", NAME, order.id, e);
                            response.status.insert(order.id.clone(), e.to_string());
                        }
                    }
                }
                if orders.len() < PAGE_SIZE as usize {
                    break;
                }
                page += 1;
            }
        }
        info!("🧹 {} cancelled {} orders", NAME, response.count);
        Ok(response)
    }

    async fn order_info(&self, order_id: &str, pair: &Pair, asset: Asset) -> Result<Detail> {
        if pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let order = self.get_order(&self.symbol(pair, asset)?, order_id).await?;
        Self::detail(&order, asset)
    }

    async fn deposit_address(&self, currency: &str, _account_id: &str, _chain: &str) -> Result<String> {
        self.get_user_address(&currency.to_ascii_lowercase()).await
    }

    async fn active_orders(&self, request: &GetOrdersRequest) -> Result<Vec<Detail>> {
        request.validate()?;
        if request.pairs.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let mut details = Vec::new();
        for pair in &request.pairs {
            let symbol = self.symbol(pair, request.asset)?;
            let mut page = 1;
            loop {
                let orders = self.get_unfinished_orders(&symbol, page, PAGE_SIZE).await?;
                for order in &orders {
                    details.push(Self::detail(order, request.asset)?);
                }
                if orders.len() < PAGE_SIZE as usize {
                    break;
                }
                page += 1;
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
            for order in self.get_orders(&self.symbol(pair, request.asset)?, 1, PAGE_SIZE).await? {
                let detail = Self::detail(&order, request.asset)?;
                let after_start = request.start.is_none_or(|start| detail.date >= start);
                let before_end = request.end.is_none_or(|end| detail.date <= end);
                if after_start && before_end && detail.status != Status::Active {
                    details.push(detail);
                }
            }
        }
        Ok(request.filter(details))
    }

    async fn withdraw_crypto(&self, request: &WithdrawRequest) -> Result<WithdrawResponse> {
        let crypto = request.validate_crypto()?;
        if request.trade_password.is_empty() {
            return Err(ExchangeError::InvalidWithdrawRequest(
                "fund password must be set".to_string(),
            ));
        }
        let result = self
            .withdraw(
                &request.currency.to_ascii_lowercase(),
                &crypto.address,
                &request.trade_password,
                request.amount,
                crypto.fee_amount,
            )
            .await?;
        info!("💸 {} withdrawal {} of {} {}", NAME, result.id, request.amount, request.currency);
        Ok(WithdrawResponse {
            id: result.id,
            status: String::new(),
        })
    }
}

/// Deposit records carry `YYYY-MM-DD hh:mm:ss` in UTC+8
fn parse_charge_time(value: &str) -> Timestamp {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|at| {
            let millis = at.and_utc().timestamp_millis() - 8 * 3_600_000;
            Timestamp::from_millis(u64::try_from(millis).unwrap_or_default())
        })
        .unwrap_or_default()
}
