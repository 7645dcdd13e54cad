use serde::Deserialize;
use serde_json::Value;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

/// v1 wrapper: `{status, data | tick, err-code, err-msg}`
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub tick: Value,
    #[serde(default)]
    pub ts: u64,
    #[serde(default, rename = "err-code")]
    pub err_code: String,
    #[serde(default, rename = "err-msg")]
    pub err_msg: String,
}

/// v2 wrapper: `{code, message, data}` with 200 meaning success
#[derive(Debug, Deserialize)]
pub struct ResponseV2 {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Symbol {
    pub base_currency: String,
    pub quote_currency: String,
    pub symbol: String,
    #[serde(default)]
    pub state: String,
}

/// `market/detail/merged` tick; `bid`/`ask` are `[price, size]`
#[derive(Debug, Deserialize)]
pub struct MergedDetail {
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub open: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub close: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    /// Base currency volume
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    /// Quote currency volume
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub vol: Fixed,
    #[serde(default)]
    pub bid: Vec<Value>,
    #[serde(default)]
    pub ask: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTicker {
    pub symbol: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub open: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub close: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub high: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub low: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub vol: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub bid: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub ask: Fixed,
}

#[derive(Debug, Deserialize)]
pub struct Depth {
    #[serde(default)]
    pub bids: Vec<Value>,
    #[serde(default)]
    pub asks: Vec<Value>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub ts: u64,
}

#[derive(Debug, Deserialize)]
pub struct TradeBatch {
    pub data: Vec<Trade>,
}

#[derive(Debug, Deserialize)]
pub struct Trade {
    #[serde(default, rename = "trade-id")]
    pub trade_id: i64,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    pub direction: String,
    pub ts: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountBalance {
    pub id: i64,
    pub list: Vec<BalanceEntry>,
}

/// One row per currency and type (`trade` or `frozen`)
#[derive(Debug, Deserialize)]
pub struct BalanceEntry {
    pub currency: String,
    #[serde(rename = "type")]
    pub balance_type: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub balance: Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchCancelResult {
    #[serde(default)]
    pub success_count: i64,
    #[serde(default)]
    pub failed_count: i64,
}

/// Order rows from detail, open and history queries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Order {
    pub id: i64,
    pub symbol: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, alias = "field-amount", deserialize_with = "flexible::deserialize")]
    pub filled_amount: Fixed,
    #[serde(default, alias = "field-cash-amount", deserialize_with = "flexible::deserialize")]
    pub filled_cash_amount: Fixed,
    #[serde(default, alias = "field-fees", deserialize_with = "flexible::deserialize")]
    pub filled_fees: Fixed,
    pub state: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub finished_at: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    pub currency: String,
    pub address: String,
    #[serde(default)]
    pub address_tag: String,
    #[serde(default)]
    pub chain: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Transfer {
    pub id: i64,
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub currency: String,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRate {
    pub symbol: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub maker_fee_rate: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub taker_fee_rate: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize_option")]
    pub actual_maker_rate: Option<Fixed>,
    #[serde(default, deserialize_with = "flexible::deserialize_option")]
    pub actual_taker_rate: Option<Fixed>,
}
