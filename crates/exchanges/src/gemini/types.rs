//! Gemini wire types

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

/// Error body: `{"result":"error","reason":"InvalidNonce","message":"..."}`
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PubTicker {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub bid: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub ask: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub last: Fixed,
    /// Keyed by currency plus `timestamp`
    #[serde(default)]
    pub volume: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct BookEntry {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub bids: Vec<BookEntry>,
    #[serde(default)]
    pub asks: Vec<BookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct Trade {
    pub timestampms: u64,
    pub tid: i64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(rename = "type")]
    pub side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
    #[serde(default)]
    #[serde(rename = "type")]
    pub account_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub timestampms: u64,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub avg_execution_price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub executed_amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub remaining_amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub original_amount: Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllDetails {
    #[serde(default)]
    pub cancelled_orders: Vec<i64>,
    #[serde(default)]
    pub cancel_rejects: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelAllResult {
    pub result: String,
    pub details: CancelAllDetails,
}

#[derive(Debug, Deserialize)]
pub struct DepositAddress {
    pub address: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResult {
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub withdrawal_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Transfer {
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub status: String,
    pub timestampms: u64,
    pub eid: i64,
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, rename = "txHash")]
    pub tx_hash: String,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct NotionalVolume {
    #[serde(default)]
    pub api_maker_fee_bps: i64,
    #[serde(default)]
    pub api_taker_fee_bps: i64,
}
