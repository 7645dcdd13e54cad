use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

/// `{code, message}` status block on trade endpoints; `message` is a string
/// or a nested `{des, isSuc, datas}` object
#[derive(Debug, Deserialize)]
pub struct Ack {
    pub code: i64,
    #[serde(default)]
    pub message: Value,
}

impl Ack {
    pub fn text(&self) -> String {
        match &self.message {
            Value::String(s) => s.clone(),
            Value::Object(o) => o.get("des").and_then(Value::as_str).unwrap_or_default().to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Nested payload of address and record queries
#[derive(Debug, Deserialize)]
pub struct Message<T> {
    #[serde(default)]
    pub des: String,
    #[serde(rename = "isSuc", default)]
    pub is_success: bool,
    pub datas: T,
}

#[derive(Debug, Deserialize)]
pub struct Wrapped<T> {
    pub message: Message<T>,
}

/// `markets` value per `btc_usdt` style key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    #[serde(default)]
    pub amount_scale: u32,
    #[serde(default)]
    pub price_scale: u32,
}

pub type Markets = BTreeMap<String, MarketInfo>;

#[derive(Debug, Clone, Deserialize)]
pub struct TickerData {
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub vol: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub last: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub buy: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub sell: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    pub ticker: TickerData,
    #[serde(default)]
    pub date: Value,
}

/// `allTicker`, keyed by undelimited symbol (`btcusdt`)
pub type AllTickers = BTreeMap<String, TickerData>;

/// Asks come highest first
#[derive(Debug, Deserialize)]
pub struct Depth {
    #[serde(default)]
    pub asks: Vec<Value>,
    #[serde(default)]
    pub bids: Vec<Value>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct Trade {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    /// Seconds
    pub date: u64,
    pub tid: i64,
    #[serde(rename = "type")]
    pub side: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub result: AccountResult,
}

#[derive(Debug, Deserialize)]
pub struct AccountResult {
    #[serde(default)]
    pub coins: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub en_name: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
    #[serde(rename = "freez", deserialize_with = "flexible::deserialize")]
    pub frozen: Fixed,
}

/// `order` and `withdraw` acknowledgements
#[derive(Debug, Deserialize)]
pub struct IdResult {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub currency: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    pub status: i64,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub total_amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub trade_amount: Fixed,
    /// Milliseconds
    #[serde(default)]
    pub trade_date: u64,
    /// Quote value filled so far
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub trade_money: Fixed,
    /// 1 buy, 0 sell
    #[serde(rename = "type")]
    pub trade_type: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddressData {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRecord {
    pub id: i64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fees: Fixed,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub submit_time: u64,
    #[serde(default)]
    pub to_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ChargeRecord {
    pub id: i64,
    #[serde(default)]
    pub address: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default, rename = "submit_time")]
    pub submit_time: String,
}
