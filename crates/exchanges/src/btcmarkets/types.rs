use serde::Deserialize;
use serde_json::Value;
use tradebridge_core::fixed::flexible;
use tradebridge_core::prelude::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub market_id: String,
    pub base_asset_name: String,
    pub quote_asset_name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTicker {
    pub market_id: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub best_bid: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub best_ask: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub last_price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub volume24h: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub volume_qte24h: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price24h: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub low24h: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub high24h: Fixed,
    #[serde(default)]
    pub timestamp: String,
}

/// Rows are `[price, amount]` or `[price, amount, count]`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrderbook {
    #[serde(default)]
    pub snapshot_id: i64,
    pub bids: Vec<Value>,
    pub asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MarketTrade {
    pub id: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    pub timestamp: String,
    pub side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset_name: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub balance: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub available: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub locked: Fixed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub market_id: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub price: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub open_amount: Fixed,
    pub status: String,
    #[serde(default)]
    pub client_order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledOrder {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    pub address: String,
    #[serde(default)]
    pub asset_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tx_id: String,
}

/// Deposits and withdrawals share this shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub asset_name: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub amount: Fixed,
    #[serde(rename = "type")]
    pub transfer_type: String,
    #[serde(default)]
    pub creation_time: String,
    pub status: String,
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub fee: Fixed,
    #[serde(default)]
    pub payment_detail: PaymentDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFee {
    pub market_id: String,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub maker_fee_rate: Fixed,
    #[serde(deserialize_with = "flexible::deserialize")]
    pub taker_fee_rate: Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingFees {
    #[serde(default, deserialize_with = "flexible::deserialize")]
    pub volume30_day: Fixed,
    #[serde(default)]
    pub fee_by_markets: Vec<MarketFee>,
}
