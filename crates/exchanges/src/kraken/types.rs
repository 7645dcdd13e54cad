//! Kraken wire types

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

/// Every Kraken response: `{"error": [...], "result": ...}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub error: Vec<String>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPairInfo {
    pub altname: String,
    #[serde(default)]
    pub wsname: String,
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub pair_decimals: u32,
    #[serde(default)]
    pub lot_decimals: u32,
}

/// Ticker arrays: `a`/`b` = [price, whole lot volume, lot volume],
/// `c` = [price, lot volume], the rest = [today, last 24h]
#[derive(Debug, Deserialize)]
pub struct TickerInfo {
    pub a: Vec<Value>,
    pub b: Vec<Value>,
    pub c: Vec<Value>,
    pub v: Vec<Value>,
    pub l: Vec<Value>,
    pub h: Vec<Value>,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub o: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct DepthInfo {
    #[serde(default)]
    pub asks: Vec<Vec<Value>>,
    #[serde(default)]
    pub bids: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct AddOrderResult {
    #[serde(default)]
    pub txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountResult {
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderDescription {
    pub pair: String,
    #[serde(rename = "type")]
    pub side: String,
    pub ordertype: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    pub status: String,
    #[serde(default)]
    pub opentm: f64,
    #[serde(default)]
    pub closetm: f64,
    pub descr: OrderDescription,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub vol: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub vol_exec: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    /// Average fill price
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default)]
    pub userref: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OpenOrders {
    #[serde(default)]
    pub open: HashMap<String, OrderInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ClosedOrders {
    #[serde(default)]
    pub closed: HashMap<String, OrderInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DepositMethod {
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositAddress {
    pub address: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawResult {
    pub refid: String,
}

#[derive(Debug, Deserialize)]
pub struct LedgerEntry {
    pub refid: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub asset: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct Ledgers {
    #[serde(default)]
    pub ledger: HashMap<String, LedgerEntry>,
}
