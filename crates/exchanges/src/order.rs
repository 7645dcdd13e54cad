//! Order model shared by all adapters
//!
//! Venues spell statuses in dozens of ways; [`Status::parse`] folds the
//! common spellings into one enum and adapters add venue tables on top.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::currency::Pair;
use crate::errors::{ExchangeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    Bid,
    Ask,
    AnySide,
}

impl Side {
    /// Buy and Bid open long exposure
    pub fn is_long(&self) -> bool {
        matches!(self, Side::Buy | Side::Bid)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Side::Sell | Side::Ask)
    }

    /// Lenient parse of venue side strings (`buy`, `BID`, `b`, ...)
    pub fn parse(value: &str) -> Side {
        match value.to_ascii_lowercase().as_str() {
            "buy" | "b" => Side::Buy,
            "sell" | "s" => Side::Sell,
            "bid" => Side::Bid,
            "ask" => Side::Ask,
            _ => Side::AnySide,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Bid => "BID",
            Side::Ask => "ASK",
            Side::AnySide => "ANY",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
    Stop,
    StopLimit,
    TrailingStop,
    ImmediateOrCancel,
    FillOrKill,
    PostOnly,
    AnyType,
    Unknown,
}

impl OrderType {
    pub fn parse(value: &str) -> OrderType {
        match value.to_ascii_uppercase().replace(['-', '_'], " ").as_str() {
            "LIMIT" | "EXCHANGE LIMIT" => OrderType::Limit,
            "MARKET" | "EXCHANGE MARKET" => OrderType::Market,
            "STOP" | "STOP LOSS" | "EXCHANGE STOP" => OrderType::Stop,
            "STOP LIMIT" | "EXCHANGE STOP LIMIT" => OrderType::StopLimit,
            "TRAILING STOP" | "EXCHANGE TRAILING STOP" => OrderType::TrailingStop,
            "IOC" | "IMMEDIATE OR CANCEL" | "EXCHANGE IOC" => OrderType::ImmediateOrCancel,
            "FOK" | "FILL OR KILL" | "EXCHANGE FOK" => OrderType::FillOrKill,
            "POST ONLY" => OrderType::PostOnly,
            "ANY" => OrderType::AnyType,
            _ => OrderType::Unknown,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::Stop => "STOP",
            OrderType::StopLimit => "STOP LIMIT",
            OrderType::TrailingStop => "TRAILING STOP",
            OrderType::ImmediateOrCancel => "IMMEDIATE OR CANCEL",
            OrderType::FillOrKill => "FILL OR KILL",
            OrderType::PostOnly => "POST ONLY",
            OrderType::AnyType => "ANY",
            OrderType::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    AnyStatus,
    New,
    Active,
    PartiallyCancelled,
    PartiallyFilled,
    Filled,
    Cancelled,
    PendingCancel,
    InsufficientBalance,
    MarketUnavailable,
    Rejected,
    Expired,
    Hidden,
    Unknown,
}

impl Status {
    /// Map the common venue spellings of order states
    pub fn parse(value: &str) -> Status {
        let normalised = value.trim().to_ascii_uppercase().replace(['_', '-'], " ");
        match normalised.as_str() {
            "ANY" => Status::AnyStatus,
            "NEW" | "PLACED" | "ACCEPTED" | "RECEIVED" | "PENDING" | "SUBMITTED" | "CREATED" => {
                Status::New
            }
            "ACTIVE" | "OPEN" | "LIVE" => Status::Active,
            "PARTIALLY FILLED" | "PARTIALLY MATCHED" | "PARTIAL FILLED" => Status::PartiallyFilled,
            "FILLED" | "FULLY MATCHED" | "FULLY FILLED" | "CLOSED" | "DONE" | "EXECUTED" => {
                Status::Filled
            }
            "PARTIALLY CANCELLED" | "PARTIALLY CANCELED" | "PARTIAL CANCELED" => {
                Status::PartiallyCancelled
            }
            "CANCELLED" | "CANCELED" => Status::Cancelled,
            "PENDING CANCEL" | "PENDING CANCELLATION" | "CANCELLING" => Status::PendingCancel,
            "INSUFFICIENT BALANCE" | "INSUFFICIENT MARGIN" => Status::InsufficientBalance,
            "MARKET UNAVAILABLE" => Status::MarketUnavailable,
            "REJECTED" | "FAILED" => Status::Rejected,
            "EXPIRED" => Status::Expired,
            "HIDDEN" => Status::Hidden,
            _ => Status::Unknown,
        }
    }

    /// No further fills can happen
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Status::Filled
                | Status::Cancelled
                | Status::PartiallyCancelled
                | Status::Rejected
                | Status::Expired
                | Status::InsufficientBalance
                | Status::MarketUnavailable
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

fn validate_side(side: Side) -> Result<()> {
    if side == Side::AnySide {
        return Err(ExchangeError::SideIsInvalid(side.to_string()));
    }
    Ok(())
}

/// New order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submit {
    pub exchange: String,
    pub pair: Pair,
    pub asset: Asset,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Fixed,
    pub price: Fixed,
    pub trigger_price: Fixed,
    pub client_order_id: String,
    pub immediate_or_cancel: bool,
    pub post_only: bool,
    pub reduce_only: bool,
}

impl Submit {
    /// Limit order skeleton; callers adjust fields as needed
    pub fn limit(pair: Pair, side: Side, amount: Fixed, price: Fixed) -> Self {
        Self {
            exchange: String::new(),
            pair,
            asset: Asset::Spot,
            side,
            order_type: OrderType::Limit,
            amount,
            price,
            trigger_price: Fixed::ZERO,
            client_order_id: String::new(),
            immediate_or_cancel: false,
            post_only: false,
            reduce_only: false,
        }
    }

    pub fn market(pair: Pair, side: Side, amount: Fixed) -> Self {
        Self {
            order_type: OrderType::Market,
            ..Self::limit(pair, side, amount, Fixed::ZERO)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        validate_side(self.side)?;
        if matches!(self.order_type, OrderType::AnyType | OrderType::Unknown) {
            return Err(ExchangeError::TypeIsInvalid(self.order_type.to_string()));
        }
        if !self.amount.is_positive() {
            return Err(ExchangeError::AmountIsInvalid);
        }
        if self.order_type == OrderType::Limit && !self.price.is_positive() {
            return Err(ExchangeError::PriceMustBeSetIfLimitOrder);
        }
        if matches!(self.order_type, OrderType::Stop | OrderType::StopLimit)
            && !self.trigger_price.is_positive()
        {
            return Err(ExchangeError::InvalidOrder("trigger price must be set".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub is_order_placed: bool,
    pub fully_matched: bool,
    pub order_id: String,
}

/// Amend an existing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modify {
    pub order_id: String,
    pub pair: Pair,
    pub asset: Asset,
    pub side: Side,
    pub amount: Fixed,
    pub price: Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyResponse {
    pub order_id: String,
}

/// Cancel request for one order (or all orders on a pair)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub order_id: String,
    pub client_order_id: String,
    pub pair: Pair,
    pub asset: Asset,
    pub side: Side,
    pub account_id: String,
}

impl Cancel {
    pub fn new(order_id: &str, pair: Pair, asset: Asset) -> Self {
        Self {
            order_id: order_id.to_string(),
            client_order_id: String::new(),
            pair,
            asset,
            side: Side::AnySide,
            account_id: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.order_id.is_empty() && self.client_order_id.is_empty() {
            return Err(ExchangeError::OrderIdNotSet);
        }
        Ok(())
    }

    /// Venue order id for venues that cannot cancel by client order id
    pub fn require_order_id(&self) -> Result<&str> {
        if self.order_id.is_empty() {
            return Err(ExchangeError::OrderIdNotSet);
        }
        Ok(&self.order_id)
    }
}

/// Outcome per order id of a cancel-all request; empty value means success
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelAllResponse {
    pub status: std::collections::BTreeMap<String, String>,
    pub count: usize,
}

/// Full order state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub exchange: String,
    pub id: String,
    pub client_order_id: String,
    pub pair: Pair,
    pub asset: Asset,
    pub side: Side,
    pub order_type: OrderType,
    pub status: Status,
    pub price: Fixed,
    pub amount: Fixed,
    pub executed_amount: Fixed,
    pub remaining_amount: Fixed,
    pub average_executed_price: Fixed,
    pub fee: Fixed,
    pub date: Timestamp,
    pub last_updated: Timestamp,
}

impl Detail {
    pub fn new(exchange: &str, id: &str, pair: Pair, asset: Asset) -> Self {
        Self {
            exchange: exchange.to_string(),
            id: id.to_string(),
            client_order_id: String::new(),
            pair,
            asset,
            side: Side::AnySide,
            order_type: OrderType::Unknown,
            status: Status::Unknown,
            price: Fixed::ZERO,
            amount: Fixed::ZERO,
            executed_amount: Fixed::ZERO,
            remaining_amount: Fixed::ZERO,
            average_executed_price: Fixed::ZERO,
            fee: Fixed::ZERO,
            date: Timestamp::default(),
            last_updated: Timestamp::default(),
        }
    }

    /// Fill in `remaining_amount` from amount and executed amount
    pub fn infer_remaining(&mut self) {
        if self.remaining_amount.is_zero() && self.amount > self.executed_amount {
            self.remaining_amount = self.amount - self.executed_amount;
        }
    }
}

/// Filters for active orders and order history queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOrdersRequest {
    pub pairs: Vec<Pair>,
    pub asset: Asset,
    pub side: Side,
    pub order_type: OrderType,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl GetOrdersRequest {
    pub fn new(asset: Asset, pairs: Vec<Pair>) -> Self {
        Self {
            pairs,
            asset,
            side: Side::AnySide,
            order_type: OrderType::AnyType,
            start: None,
            end: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ExchangeError::InvalidOrder(
                    "start time is after end time".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Apply every filter in this request to `orders`
    pub fn filter(&self, orders: Vec<Detail>) -> Vec<Detail> {
        let mut orders = filter_by_side(orders, self.side);
        orders = filter_by_type(orders, self.order_type);
        orders = filter_by_pairs(orders, &self.pairs);
        orders = filter_by_time_range(orders, self.start, self.end);
        sort_by_date(&mut orders, false);
        orders
    }
}

pub fn filter_by_side(orders: Vec<Detail>, side: Side) -> Vec<Detail> {
    if side == Side::AnySide {
        return orders;
    }
    orders
        .into_iter()
        .filter(|o| o.side == side || (o.side.is_long() && side.is_long()) || (o.side.is_short() && side.is_short()))
        .collect()
}

pub fn filter_by_type(orders: Vec<Detail>, order_type: OrderType) -> Vec<Detail> {
    if order_type == OrderType::AnyType {
        return orders;
    }
    orders.into_iter().filter(|o| o.order_type == order_type).collect()
}

pub fn filter_by_pairs(orders: Vec<Detail>, pairs: &[Pair]) -> Vec<Detail> {
    if pairs.is_empty() {
        return orders;
    }
    orders.into_iter().filter(|o| pairs.contains(&o.pair)).collect()
}

pub fn filter_by_time_range(
    orders: Vec<Detail>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) -> Vec<Detail> {
    orders
        .into_iter()
        .filter(|o| start.is_none_or(|s| o.date >= s) && end.is_none_or(|e| o.date <= e))
        .collect()
}

/// Oldest first unless `reverse`
pub fn sort_by_date(orders: &mut [Detail], reverse: bool) {
    orders.sort_by(|a, b| if reverse { b.date.cmp(&a.date) } else { a.date.cmp(&b.date) });
}
