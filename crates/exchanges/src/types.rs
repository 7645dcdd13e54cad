//! Common market and account data shared by every adapter
//!
//! Venue DTOs stay private to each adapter; these are the shapes the bot
//! framework consumes.

use serde::{Deserialize, Serialize};
use tradebridge_core::prelude::*;

use crate::asset::Asset;
use crate::currency::Pair;
use crate::order::Side;

/// Ticker snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub exchange: String,
    pub pair: Pair,
    pub asset: Option<Asset>,
    pub last: Fixed,
    pub high: Fixed,
    pub low: Fixed,
    pub bid: Fixed,
    pub ask: Fixed,
    pub volume: Fixed,
    pub quote_volume: Fixed,
    pub open: Fixed,
    pub close: Fixed,
    pub price_ath: Fixed,
    pub last_updated: Timestamp,
}

/// Public trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    pub tid: String,
    pub exchange: String,
    pub pair: Pair,
    pub asset: Asset,
    pub side: Side,
    pub price: Fixed,
    pub amount: Fixed,
    pub timestamp: Timestamp,
}

/// Balance of one currency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub total: Fixed,
    pub hold: Fixed,
    pub free: Fixed,
}

impl Balance {
    /// Balance where `free` is derived from total minus hold
    pub fn from_total_and_hold(currency: &str, total: Fixed, hold: Fixed) -> Self {
        Self {
            currency: currency.to_ascii_uppercase(),
            total,
            hold,
            free: total - hold,
        }
    }

    /// Balance where `total` is derived from free plus hold
    pub fn from_free_and_hold(currency: &str, free: Fixed, hold: Fixed) -> Self {
        Self {
            currency: currency.to_ascii_uppercase(),
            total: free + hold,
            hold,
            free,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: String,
    pub asset: Option<Asset>,
    pub currencies: Vec<Balance>,
}

/// Account balances across sub accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub exchange: String,
    pub accounts: Vec<SubAccount>,
}

impl Holdings {
    /// Balance for `currency` summed over every sub account
    pub fn total_for(&self, currency: &str) -> Fixed {
        self.accounts
            .iter()
            .flat_map(|a| a.currencies.iter())
            .filter(|b| b.currency.eq_ignore_ascii_case(currency))
            .map(|b| b.total)
            .sum()
    }
}

/// Funding history entry (deposits and withdrawals)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHistory {
    pub id: String,
    pub status: String,
    pub timestamp: Timestamp,
    pub currency: String,
    pub amount: Fixed,
    pub fee: Fixed,
    pub transfer_type: String,
    pub crypto_to_address: String,
    pub crypto_tx_id: String,
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

/// Websocket channel subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub channel: String,
    pub pair: Option<Pair>,
    pub asset: Asset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_constructors() {
        let balance = Balance::from_total_and_hold(
            "btc",
            Fixed::from_str_exact("1.5").unwrap(),
            Fixed::from_str_exact("0.5").unwrap(),
        );
        assert_eq!(balance.currency, "BTC");
        assert_eq!(balance.free.to_string(), "1.0");

        let balance = Balance::from_free_and_hold("eth", Fixed::ONE, Fixed::ONE);
        assert_eq!(balance.total, Fixed::from_i64(2));
    }

    #[test]
    fn test_holdings_total() {
        let holdings = Holdings {
            exchange: "Kraken".to_string(),
            accounts: vec![
                SubAccount {
                    id: "spot".to_string(),
                    asset: Some(Asset::Spot),
                    currencies: vec![Balance::from_free_and_hold("BTC", Fixed::ONE, Fixed::ZERO)],
                },
                SubAccount {
                    id: "margin".to_string(),
                    asset: Some(Asset::Margin),
                    currencies: vec![Balance::from_free_and_hold("BTC", Fixed::ONE, Fixed::ONE)],
                },
            ],
        };
        assert_eq!(holdings.total_for("btc"), Fixed::from_i64(3));
        assert!(holdings.total_for("eth").is_zero());
    }
}
