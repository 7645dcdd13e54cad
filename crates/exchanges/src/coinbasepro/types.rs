use serde::Deserialize;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub trading_disabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProductTicker {
    #[serde(default)]
    pub trade_id: i64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub bid: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub ask: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub volume: Fixed,
    #[serde(default)]
    pub time: String,
}

/// 24h stats
#[derive(Debug, Deserialize)]
pub struct ProductStats {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub open: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub volume: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub last: Fixed,
}

/// Level 2 book; rows are `[price, size, num_orders]`
#[derive(Debug, Deserialize)]
pub struct ProductBook {
    #[serde(default)]
    pub sequence: i64,
    pub bids: Vec<serde_json::Value>,
    pub asks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Trade {
    pub time: String,
    pub trade_id: i64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
    pub side: String,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: String,
    pub currency: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub balance: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub hold: Fixed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub client_oid: String,
    pub product_id: String,
    pub side: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub filled_size: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub executed_value: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fill_fees: Fixed,
    pub status: String,
    #[serde(default)]
    pub done_reason: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub done_at: String,
    #[serde(default)]
    pub post_only: bool,
    #[serde(default)]
    pub settled: bool,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalResult {
    pub id: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub id: String,
    #[serde(rename = "type")]
    pub transfer_type: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<String>,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default)]
    pub details: TransferDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferDetails {
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub crypto_address: String,
    #[serde(default)]
    pub crypto_transaction_hash: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct FeeRates {
    #[serde(deserialize_with = "flexible::deserialize")]
    pub maker_fee_rate: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub taker_fee_rate: Fixed,
}
