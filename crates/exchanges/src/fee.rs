//! Fee estimation inputs and the static fee schedule helpers adapters share

use serde::{Deserialize, Serialize};
use tradebridge_core::prelude::*;

use crate::currency::Pair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeType {
    CryptocurrencyTradeFee,
    CryptocurrencyWithdrawalFee,
    CryptocurrencyDepositFee,
    InternationalBankDepositFee,
    InternationalBankWithdrawalFee,
    /// Estimate from the published schedule without calling the venue
    OfflineTradeFee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBuilder {
    pub fee_type: FeeType,
    pub pair: Pair,
    pub is_maker: bool,
    pub purchase_price: Fixed,
    pub amount: Fixed,
}

impl FeeBuilder {
    pub fn trade(pair: Pair, is_maker: bool, price: Fixed, amount: Fixed) -> Self {
        Self {
            fee_type: FeeType::CryptocurrencyTradeFee,
            pair,
            is_maker,
            purchase_price: price,
            amount,
        }
    }

    pub fn withdrawal(currency: &str, amount: Fixed) -> Self {
        Self {
            fee_type: FeeType::CryptocurrencyWithdrawalFee,
            pair: Pair::new(currency, ""),
            is_maker: false,
            purchase_price: Fixed::ZERO,
            amount,
        }
    }

    /// Notional value of the trade
    pub fn notional(&self) -> Fixed {
        self.purchase_price * self.amount
    }
}

/// Maker/taker rates as fractions (0.001 = 10bps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeFeeSchedule {
    pub maker: &'static str,
    pub taker: &'static str,
}

impl TradeFeeSchedule {
    pub const fn new(maker: &'static str, taker: &'static str) -> Self {
        Self { maker, taker }
    }

    /// Fee for the trade described by `builder`
    pub fn estimate(&self, builder: &FeeBuilder) -> Fixed {
        let rate = if builder.is_maker { self.maker } else { self.taker };
        let rate = Fixed::from_str_exact(rate).unwrap_or(Fixed::ZERO);
        builder.notional() * rate
    }
}

/// Look a currency up in a static `(currency, fee)` table; unknown is zero
pub fn lookup_withdrawal_fee(table: &[(&str, &str)], currency: &str) -> Fixed {
    table
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(currency))
        .and_then(|(_, fee)| Fixed::from_str_exact(fee).ok())
        .unwrap_or(Fixed::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_fee_estimate() {
        let schedule = TradeFeeSchedule::new("0.001", "0.002");
        let taker = FeeBuilder::trade(
            Pair::new("BTC", "USD"),
            false,
            Fixed::from_i64(10_000),
            Fixed::ONE,
        );
        assert_eq!(schedule.estimate(&taker), Fixed::from_i64(20));

        let maker = FeeBuilder { is_maker: true, ..taker };
        assert_eq!(schedule.estimate(&maker), Fixed::from_i64(10));
    }

    #[test]
    fn test_withdrawal_lookup() {
        let table = [("BTC", "0.0005"), ("ETH", "0.01")];
        assert_eq!(lookup_withdrawal_fee(&table, "btc").to_string_exact(), "0.0005");
        assert!(lookup_withdrawal_fee(&table, "DOGE").is_zero());
    }
}
