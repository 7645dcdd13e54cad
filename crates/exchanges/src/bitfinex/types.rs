//! Bitfinex v2 payloads
//!
//! v2 answers with positional arrays rather than objects; each type here
//! decodes one row by index.

use serde_json::Value;
use tradebridge_core::prelude::*;

use crate::errors::{ExchangeError, Result};

fn fixed_at(row: &[Value], index: usize) -> Result<Fixed> {
    Ok(Fixed::from_json(row.get(index).unwrap_or(&Value::Null))?)
}

fn i64_at(row: &[Value], index: usize) -> i64 {
    row.get(index).and_then(Value::as_i64).unwrap_or_default()
}

fn u64_at(row: &[Value], index: usize) -> u64 {
    row.get(index).and_then(Value::as_u64).unwrap_or_default()
}

fn str_at(row: &[Value], index: usize) -> String {
    row.get(index).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn as_row<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ExchangeError::InvalidResponse(format!("Bitfinex {what} is not an array: {value}")))
}

/// `[BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE, DAILY_CHANGE_RELATIVE, LAST_PRICE, VOLUME, HIGH, LOW]`
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRow {
    pub bid: Fixed,
    pub ask: Fixed,
    pub daily_change: Fixed,
    pub last: Fixed,
    pub volume: Fixed,
    pub high: Fixed,
    pub low: Fixed,
}

impl TickerRow {
    /// `offset` is 1 for rows from the batch endpoint, which lead with the symbol
    pub fn from_row(row: &[Value], offset: usize) -> Result<Self> {
        if row.len() < offset + 10 {
            return Err(ExchangeError::InvalidResponse(format!("Bitfinex ticker row too short: {row:?}")));
        }
        Ok(Self {
            bid: fixed_at(row, offset)?,
            ask: fixed_at(row, offset + 2)?,
            daily_change: fixed_at(row, offset + 4)?,
            last: fixed_at(row, offset + 6)?,
            volume: fixed_at(row, offset + 7)?,
            high: fixed_at(row, offset + 8)?,
            low: fixed_at(row, offset + 9)?,
        })
    }

    /// Price 24h ago
    pub fn open(&self) -> Fixed {
        self.last - self.daily_change
    }
}

/// `[PRICE, COUNT, AMOUNT]`; positive amounts are bids
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub price: Fixed,
    pub count: i64,
    pub amount: Fixed,
}

impl BookRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "book row")?;
        Ok(Self {
            price: fixed_at(row, 0)?,
            count: i64_at(row, 1),
            amount: fixed_at(row, 2)?,
        })
    }
}

/// `[ID, MTS, AMOUNT, PRICE]`; negative amounts are sells
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub id: i64,
    pub mts: u64,
    pub amount: Fixed,
    pub price: Fixed,
}

impl TradeRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "trade row")?;
        Ok(Self {
            id: i64_at(row, 0),
            mts: u64_at(row, 1),
            amount: fixed_at(row, 2)?,
            price: fixed_at(row, 3)?,
        })
    }
}

/// `[WALLET_TYPE, CURRENCY, BALANCE, UNSETTLED_INTEREST, AVAILABLE_BALANCE, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WalletRow {
    pub wallet_type: String,
    pub currency: String,
    pub balance: Fixed,
    pub available: Fixed,
}

impl WalletRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "wallet row")?;
        Ok(Self {
            wallet_type: str_at(row, 0),
            currency: str_at(row, 1),
            balance: fixed_at(row, 2)?,
            // null until the wallet has been recalculated
            available: match row.get(4) {
                Some(Value::Null) | None => fixed_at(row, 2)?,
                Some(_) => fixed_at(row, 4)?,
            },
        })
    }
}

/// Order array shared by the submit, cancel and listing endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub id: i64,
    pub client_id: i64,
    pub symbol: String,
    pub mts_create: u64,
    pub mts_update: u64,
    /// Remaining; negative for sells
    pub amount: Fixed,
    pub amount_orig: Fixed,
    pub order_type: String,
    pub flags: i64,
    pub status: String,
    pub price: Fixed,
    pub price_avg: Fixed,
}

impl OrderRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "order row")?;
        Ok(Self {
            id: i64_at(row, 0),
            client_id: i64_at(row, 2),
            symbol: str_at(row, 3),
            mts_create: u64_at(row, 4),
            mts_update: u64_at(row, 5),
            amount: fixed_at(row, 6)?,
            amount_orig: fixed_at(row, 7)?,
            order_type: str_at(row, 8),
            flags: i64_at(row, 12),
            status: str_at(row, 13),
            price: fixed_at(row, 16)?,
            price_avg: fixed_at(row, 17)?,
        })
    }

    pub fn executed(&self) -> Fixed {
        (self.amount_orig - self.amount).abs()
    }
}

/// `[MTS, TYPE, MESSAGE_ID, null, DATA, CODE, STATUS, TEXT]` returned by writes
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub mts: u64,
    pub kind: String,
    pub data: Value,
    pub status: String,
    pub text: String,
}

impl Notification {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "notification")?;
        Ok(Self {
            mts: u64_at(row, 0),
            kind: str_at(row, 1),
            data: row.get(4).cloned().unwrap_or(Value::Null),
            status: str_at(row, 6),
            text: str_at(row, 7),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == "SUCCESS"
    }
}

/// `[ID, CURRENCY, CURRENCY_NAME, _, _, MTS_STARTED, MTS_UPDATED, _, _, STATUS, _, _, AMOUNT, FEES, _, _, DESTINATION_ADDRESS, _, _, _, TRANSACTION_ID]`
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRow {
    pub id: i64,
    pub currency: String,
    pub mts_started: u64,
    pub status: String,
    /// Negative for withdrawals
    pub amount: Fixed,
    pub fees: Fixed,
    pub address: String,
    pub tx_id: String,
}

impl MovementRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let row = as_row(value, "movement row")?;
        Ok(Self {
            id: i64_at(row, 0),
            currency: str_at(row, 1),
            mts_started: u64_at(row, 5),
            status: str_at(row, 9),
            amount: fixed_at(row, 12)?,
            fees: fixed_at(row, 13)?,
            address: str_at(row, 16),
            tx_id: str_at(row, 20),
        })
    }
}

/// Decode every element of an array response with `decode`
pub fn rows<T>(value: &Value, decode: impl Fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    as_row(value, "response")?.iter().map(decode).collect()
}
