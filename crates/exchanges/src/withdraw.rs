//! Withdrawal requests and withdrawal permission flags

use serde::{Deserialize, Serialize};
use tradebridge_core::prelude::*;

use crate::errors::{ExchangeError, Result};

/// Destination of a cryptocurrency withdrawal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CryptoWithdraw {
    pub address: String,
    /// Memo / destination tag for XRP, XLM, EOS style chains
    #[serde(default)]
    pub address_tag: String,
    #[serde(default)]
    pub fee_amount: Fixed,
    #[serde(default)]
    pub chain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub exchange: String,
    pub currency: String,
    pub description: String,
    pub amount: Fixed,
    #[serde(default)]
    pub one_time_password: String,
    /// Fund password some venues demand (ZB `safePwd`)
    #[serde(default)]
    pub trade_password: String,
    pub crypto: Option<CryptoWithdraw>,
}

impl WithdrawRequest {
    pub fn crypto(currency: &str, amount: Fixed, address: &str) -> Self {
        Self {
            currency: currency.to_ascii_uppercase(),
            amount,
            crypto: Some(CryptoWithdraw {
                address: address.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        if let Some(crypto) = self.crypto.as_mut() {
            crypto.address_tag = tag.to_string();
        }
        self
    }

    /// Check the request and return its crypto destination
    pub fn validate_crypto(&self) -> Result<&CryptoWithdraw> {
        if self.currency.is_empty() {
            return Err(ExchangeError::InvalidWithdrawRequest("currency not set".to_string()));
        }
        if !self.amount.is_positive() {
            return Err(ExchangeError::InvalidWithdrawRequest(
                "amount must be greater than zero".to_string(),
            ));
        }
        let crypto = self.crypto.as_ref().ok_or_else(|| {
            ExchangeError::InvalidWithdrawRequest("crypto destination not set".to_string())
        })?;
        if crypto.address.is_empty() {
            return Err(ExchangeError::InvalidWithdrawRequest("address not set".to_string()));
        }
        if crypto.fee_amount.is_negative() {
            return Err(ExchangeError::InvalidWithdrawRequest("fee cannot be negative".to_string()));
        }
        Ok(crypto)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub id: String,
    pub status: String,
}

/// Bit set describing how a venue allows withdrawals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WithdrawPermissions(pub u32);

impl WithdrawPermissions {
    pub const NO_API_WITHDRAWAL_METHODS: Self = Self(0);
    pub const AUTO_WITHDRAW_CRYPTO: Self = Self(1 << 0);
    pub const AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION: Self = Self(1 << 1);
    pub const AUTO_WITHDRAW_CRYPTO_WITH_SETUP: Self = Self(1 << 2);
    pub const WITHDRAW_CRYPTO_WITH_2FA: Self = Self(1 << 3);
    pub const WITHDRAW_CRYPTO_WITH_SMS: Self = Self(1 << 4);
    pub const WITHDRAW_CRYPTO_WITH_EMAIL: Self = Self(1 << 5);
    pub const WITHDRAW_CRYPTO_WITH_WEBSITE_APPROVAL: Self = Self(1 << 6);
    pub const WITHDRAW_CRYPTO_WITH_API_PERMISSION: Self = Self(1 << 7);
    pub const AUTO_WITHDRAW_FIAT: Self = Self(1 << 8);
    pub const AUTO_WITHDRAW_FIAT_WITH_API_PERMISSION: Self = Self(1 << 9);
    pub const AUTO_WITHDRAW_FIAT_WITH_SETUP: Self = Self(1 << 10);
    pub const WITHDRAW_FIAT_WITH_2FA: Self = Self(1 << 11);
    pub const WITHDRAW_FIAT_WITH_SMS: Self = Self(1 << 12);
    pub const WITHDRAW_FIAT_WITH_EMAIL: Self = Self(1 << 13);
    pub const WITHDRAW_FIAT_WITH_WEBSITE_APPROVAL: Self = Self(1 << 14);
    pub const WITHDRAW_FIAT_WITH_API_PERMISSION: Self = Self(1 << 15);
    pub const WITHDRAW_CRYPTO_VIA_WEBSITE_ONLY: Self = Self(1 << 16);
    pub const WITHDRAW_FIAT_VIA_WEBSITE_ONLY: Self = Self(1 << 17);
    pub const NO_FIAT_WITHDRAWALS: Self = Self(1 << 18);

    const TEXT: [&'static str; 19] = [
        "AUTO WITHDRAW CRYPTO",
        "AUTO WITHDRAW CRYPTO WITH API PERMISSION",
        "AUTO WITHDRAW CRYPTO WITH SETUP",
        "WITHDRAW CRYPTO WITH 2FA",
        "WITHDRAW CRYPTO WITH SMS",
        "WITHDRAW CRYPTO WITH EMAIL",
        "WITHDRAW CRYPTO WITH WEBSITE APPROVAL",
        "WITHDRAW CRYPTO WITH API PERMISSION",
        "AUTO WITHDRAW FIAT",
        "AUTO WITHDRAW FIAT WITH API PERMISSION",
        "AUTO WITHDRAW FIAT WITH SETUP",
        "WITHDRAW FIAT WITH 2FA",
        "WITHDRAW FIAT WITH SMS",
        "WITHDRAW FIAT WITH EMAIL",
        "WITHDRAW FIAT WITH WEBSITE APPROVAL",
        "WITHDRAW FIAT WITH API PERMISSION",
        "WITHDRAW CRYPTO VIA WEBSITE ONLY",
        "WITHDRAW FIAT VIA WEBSITE ONLY",
        "NO FIAT WITHDRAWAL",
    ];

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// All bits of `other` are set
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Human readable list joined with ` & `
    pub fn format(&self) -> String {
        if self.0 == 0 {
            return "NONE, WITHDRAW".to_string();
        }
        (0..32)
            .filter(|bit| self.0 & (1 << bit) != 0)
            .map(|bit| match Self::TEXT.get(bit as usize) {
                Some(text) => text.to_string(),
                None => format!("UNKNOWN[{}]", 1u32 << bit),
            })
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

impl std::ops::BitOr for WithdrawPermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_permissions() {
        let perms = WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION
            | WithdrawPermissions::AUTO_WITHDRAW_FIAT_WITH_API_PERMISSION;
        assert_eq!(
            perms.format(),
            "AUTO WITHDRAW CRYPTO WITH API PERMISSION & AUTO WITHDRAW FIAT WITH API PERMISSION"
        );
        assert_eq!(WithdrawPermissions::NO_API_WITHDRAWAL_METHODS.format(), "NONE, WITHDRAW");
        assert_eq!(WithdrawPermissions(1 << 20).format(), "UNKNOWN[1048576]");
        assert!(perms.contains(WithdrawPermissions::AUTO_WITHDRAW_FIAT_WITH_API_PERMISSION));
        assert!(!perms.contains(WithdrawPermissions::WITHDRAW_CRYPTO_WITH_SMS));
    }

    #[test]
    fn test_validate_crypto() {
        let ok = WithdrawRequest::crypto("btc", Fixed::ONE, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
        assert_eq!(ok.validate_crypto().unwrap().address, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
        assert_eq!(ok.currency, "BTC");

        let no_amount = WithdrawRequest::crypto("btc", Fixed::ZERO, "addr");
        assert!(no_amount.validate_crypto().is_err());

        let no_address = WithdrawRequest::crypto("btc", Fixed::ONE, "");
        assert!(no_address.validate_crypto().is_err());

        let fiat = WithdrawRequest {
            currency: "USD".to_string(),
            amount: Fixed::ONE,
            ..Default::default()
        };
        assert!(fiat.validate_crypto().is_err());
    }
}
