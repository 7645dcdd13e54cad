//! Order book snapshots and incremental updates
//!
//! Bids are kept in descending price order, asks ascending. REST adapters
//! build full snapshots; websocket feeds apply [`OrderbookUpdate`] deltas
//! where a zero amount removes the level.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::currency::Pair;
use crate::errors::{ExchangeError, Result};

/// One price level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Fixed,
    pub amount: Fixed,
    /// Venue order id for order-level books (Bitfinex raw books)
    pub id: Option<i64>,
    /// Number of orders at this level when the venue reports it
    pub count: Option<i64>,
}

impl Level {
    pub fn new(price: Fixed, amount: Fixed) -> Self {
        Self {
            price,
            amount,
            id: None,
            count: None,
        }
    }

    /// Parse a `[price, amount, ...]` JSON array of strings or numbers
    pub fn from_pair_value(value: &serde_json::Value) -> Result<Self> {
        let entry = value
            .as_array()
            .filter(|a| a.len() >= 2)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("bad book level {value}")))?;
        Ok(Self::new(Fixed::from_json(&entry[0])?, Fixed::from_json(&entry[1])?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub exchange: String,
    pub pair: Pair,
    pub asset: Asset,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub last_updated: Timestamp,
    pub update_id: i64,
    /// Venue may publish several levels at one price (order-level books)
    pub price_duplication: bool,
    /// Funding books quote rates, so zero prices are legal
    pub is_funding_rate: bool,
}

impl Orderbook {
    pub fn new(exchange: &str, pair: Pair, asset: Asset) -> Self {
        Self {
            exchange: exchange.to_string(),
            pair,
            asset,
            bids: Vec::new(),
            asks: Vec::new(),
            last_updated: Timestamp::now(),
            update_id: 0,
            price_duplication: false,
            is_funding_rate: false,
        }
    }

    /// Sort both sides into canonical order
    pub fn sort(&mut self) {
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
    }

    /// Reject books that are unsorted, contain empty levels or are crossed
    pub fn verify(&self) -> Result<()> {
        let context = |msg: String| {
            ExchangeError::OrderbookInvalid(format!(
                "{} {} {}: {msg}",
                self.exchange, self.pair, self.asset
            ))
        };

        self.verify_side(&self.bids, Ordering::Greater, "bid").map_err(context)?;
        self.verify_side(&self.asks, Ordering::Less, "ask").map_err(context)?;

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if !self.is_funding_rate && bid >= ask {
                return Err(context(format!("crossed book bid {bid} >= ask {ask}")));
            }
        }
        Ok(())
    }

    /// `expected` is how each price must compare with the next one
    fn verify_side(&self, levels: &[Level], expected: Ordering, side: &str) -> std::result::Result<(), String> {
        for level in levels {
            if level.price.is_zero() && !self.is_funding_rate {
                return Err(format!("{side} price is zero"));
            }
            if !level.amount.is_positive() {
                return Err(format!("{side} amount {} at {} is not positive", level.amount, level.price));
            }
        }
        for window in levels.windows(2) {
            let ordering = window[0].price.cmp(&window[1].price);
            let duplicate_allowed = self.price_duplication && ordering == Ordering::Equal;
            if ordering != expected && !duplicate_allowed {
                return Err(format!(
                    "{side} levels out of order at {} then {}",
                    window[0].price, window[1].price
                ));
            }
        }
        Ok(())
    }

    pub fn best_bid(&self) -> Option<Fixed> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Fixed> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<Fixed> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<Fixed> {
        Some((self.best_ask()? + self.best_bid()?) / Fixed::from_i64(2))
    }

    /// Merge a delta. Stale updates (id not newer) are skipped.
    pub fn apply_update(&mut self, update: &OrderbookUpdate) -> Result<()> {
        if update.update_id != 0 && self.update_id != 0 && update.update_id <= self.update_id {
            tracing::debug!(
                "📘 {} {} skipping stale book update {} <= {}",
                self.exchange,
                self.pair,
                update.update_id,
                self.update_id
            );
            return Ok(());
        }

        for level in &update.bids {
            merge_level(&mut self.bids, *level, |a, b| b.cmp(a));
        }
        for level in &update.asks {
            merge_level(&mut self.asks, *level, |a, b| a.cmp(b));
        }

        if update.update_id != 0 {
            self.update_id = update.update_id;
        }
        self.last_updated = if update.update_time.is_zero() {
            Timestamp::now()
        } else {
            update.update_time
        };
        Ok(())
    }
}

/// Insert, replace or delete (`amount == 0`) one level, keeping `cmp` order
fn merge_level(levels: &mut Vec<Level>, level: Level, cmp: impl Fn(&Fixed, &Fixed) -> Ordering) {
    match levels.binary_search_by(|entry| cmp(&entry.price, &level.price)) {
        Ok(index) if level.amount.is_zero() => {
            levels.remove(index);
        }
        Ok(index) => levels[index] = level,
        Err(_) if level.amount.is_zero() => {}
        Err(index) => levels.insert(index, level),
    }
}

/// Incremental book change from a websocket feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderbookUpdate {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub update_id: i64,
    pub update_time: Timestamp,
}
