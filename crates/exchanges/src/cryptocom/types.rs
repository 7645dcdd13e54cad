use serde::Deserialize;
use serde_json::Value;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

use crate::errors::Result;
use crate::orderbook::Level;

/// `{id, method, code, message, result}` wrapper shared by REST and websocket
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub struct InstrumentList {
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    pub instrument_name: String,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub price_decimals: u32,
    #[serde(default)]
    pub quantity_decimals: u32,
}

/// Ticker rows use single letter keys
#[derive(Debug, Clone, Deserialize)]
pub struct TickerData {
    #[serde(rename = "i")]
    pub instrument_name: String,
    #[serde(rename = "b", default, deserialize_with = "flexible::deserialize")]
    pub bid: Fixed,
    #[serde(rename = "k", default, deserialize_with = "flexible::deserialize")]
    pub ask: Fixed,
    #[serde(rename = "a", default, deserialize_with = "flexible::deserialize")]
    pub last: Fixed,
    #[serde(rename = "h", default, deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(rename = "l", default, deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    #[serde(rename = "v", default, deserialize_with = "flexible::deserialize")]
    pub volume: Fixed,
    #[serde(rename = "c", default, deserialize_with = "flexible::deserialize")]
    pub change: Fixed,
    #[serde(rename = "t", default)]
    pub timestamp: u64,
}

/// `get-ticker` returns one object for an instrument query and a list otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TickerPayload {
    One(TickerData),
    Many(Vec<TickerData>),
}

impl TickerPayload {
    pub fn into_vec(self) -> Vec<TickerData> {
        match self {
            TickerPayload::One(t) => vec![t],
            TickerPayload::Many(list) => list,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TickerResult {
    pub data: TickerPayload,
}

/// Book levels are `[price, quantity, order_count]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookData {
    #[serde(default)]
    pub bids: Vec<Value>,
    #[serde(default)]
    pub asks: Vec<Value>,
    #[serde(rename = "t", default)]
    pub timestamp: u64,
    #[serde(rename = "u", default)]
    pub update_id: i64,
}

impl BookData {
    pub fn levels(raw: &[Value]) -> Result<Vec<Level>> {
        raw.iter()
            .map(|entry| {
                let mut level = Level::from_pair_value(entry)?;
                level.count = entry.get(2).and_then(Value::as_i64);
                Ok(level)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct BookResult {
    #[serde(default)]
    pub instrument_name: String,
    pub data: Vec<BookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeData {
    #[serde(rename = "d", deserialize_with = "trade_id")]
    pub trade_id: String,
    #[serde(rename = "s")]
    pub side: String,
    #[serde(rename = "p", deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(rename = "q", deserialize_with = "flexible::deserialize")]
    pub quantity: Fixed,
    #[serde(rename = "t")]
    pub timestamp: u64,
    #[serde(rename = "i", default)]
    pub instrument_name: String,
}

/// Trade ids overflow i64 on some feeds and arrive as either type
fn trade_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct TradeResult {
    pub data: Vec<TradeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub balance: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub order: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub stake: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct AccountSummary {
    pub accounts: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderResult {
    pub order_id: String,
    #[serde(default)]
    pub client_oid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    #[serde(default)]
    pub client_oid: String,
    pub status: String,
    pub side: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    pub instrument_name: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub quantity: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub cumulative_quantity: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub avg_price: Fixed,
    #[serde(default)]
    pub fee_currency: String,
    #[serde(default)]
    pub time_in_force: String,
    #[serde(default)]
    pub create_time: u64,
    #[serde(default)]
    pub update_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrderDetail {
    pub order_info: OrderInfo,
}

#[derive(Debug, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub order_list: Vec<OrderInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DepositAddress {
    pub currency: String,
    pub address: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositAddressList {
    pub deposit_address_list: Vec<DepositAddress>,
}

#[derive(Debug, Deserialize)]
pub struct Withdrawal {
    #[serde(deserialize_with = "trade_id")]
    pub id: String,
    #[serde(default)]
    pub client_wid: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub create_time: u64,
}

/// Deposit and withdrawal history rows share this shape
#[derive(Debug, Deserialize)]
pub struct Transfer {
    #[serde(deserialize_with = "trade_id")]
    pub id: String,
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub create_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalHistory {
    #[serde(default)]
    pub withdrawal_list: Vec<Transfer>,
}

#[derive(Debug, Deserialize)]
pub struct DepositHistory {
    #[serde(default)]
    pub deposit_list: Vec<Transfer>,
}

/// Websocket push: `result` of a `subscribe` method
#[derive(Debug, Deserialize)]
pub struct ChannelPush {
    pub channel: String,
    #[serde(default)]
    pub subscription: String,
    #[serde(default)]
    pub instrument_name: String,
    #[serde(default)]
    pub data: Value,
}

/// `book.update` rows wrap the delta in an `update` object
#[derive(Debug, Deserialize)]
pub struct BookUpdateData {
    pub update: BookData,
    #[serde(rename = "t", default)]
    pub timestamp: u64,
    #[serde(rename = "u", default)]
    pub update_id: i64,
}
