use serde::Deserialize;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub symbol: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub last: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub lowest_ask: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub highest_bid: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub volume: Fixed,
    #[serde(default, rename = "high24Hr", deserialize_with = "flexible::deserialize")]
    pub high_24h: Fixed,
    #[serde(default, rename = "low24Hr", deserialize_with = "flexible::deserialize")]
    pub low_24h: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct QuoteLevel {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookL2 {
    #[serde(default)]
    pub buy_quote: Vec<QuoteLevel>,
    #[serde(default)]
    pub sell_quote: Vec<QuoteLevel>,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
    pub side: String,
    #[serde(default)]
    pub serial_id: i64,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct WalletBalance {
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub total: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
}

/// Returned by place, cancel and status queries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, rename = "orderID")]
    pub order_id: String,
    #[serde(default, rename = "clOrderID")]
    pub client_order_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub order_type: i64,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fill_size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub average_fill_price: Fixed,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(default, rename = "clOrderID")]
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub order_type: i64,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fill_size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub average_fill_price: Fixed,
    #[serde(default)]
    pub order_state: String,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct WalletAddress {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawResult {
    #[serde(default)]
    pub withdraw_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletHistory {
    #[serde(default)]
    pub order_id: String,
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fees: Fixed,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type")]
    pub history_type: String,
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRate {
    pub symbol: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub maker_fee: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub taker_fee: Fixed,
}
