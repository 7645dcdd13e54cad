use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

/// `{result, data, error_code, ts}`; `result` is `"true"`/`"false"` or a bool
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub ts: u64,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        match &self.result {
            Value::Bool(ok) => *ok,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => self.error_code == 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TickerRow {
    pub symbol: String,
    pub ticker: TickerData,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct TickerData {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub latest: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub vol: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub turnover: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub change: Fixed,
}

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
    pub date_ms: u64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(rename = "type")]
    pub side: String,
    pub tid: String,
}

/// Per-currency maps of lowercase code to amount
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub free: BTreeMap<String, Value>,
    #[serde(default)]
    pub freeze: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderResult {
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub avg_price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub deal_amount: Fixed,
    pub status: i64,
    #[serde(default)]
    pub create_time: u64,
    #[serde(default)]
    pub custom_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderPage {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_length: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResult {
    pub withdraw_id: i64,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub id: i64,
    pub asset_code: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub time: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalPage {
    #[serde(default)]
    pub list: Vec<WithdrawalRecord>,
}
