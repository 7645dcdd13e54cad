//! Asset classes an exchange can trade

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ExchangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Spot,
    Margin,
    #[serde(rename = "marginfunding")]
    MarginFunding,
    Futures,
    #[serde(rename = "perpetualswap")]
    PerpetualSwap,
    #[serde(rename = "perpetualcontract")]
    PerpetualContract,
    #[serde(rename = "coinmarginedfutures")]
    CoinMarginedFutures,
    #[serde(rename = "usdtmarginedfutures")]
    UsdtMarginedFutures,
    Index,
}

impl Asset {
    pub const ALL: [Asset; 9] = [
        Asset::Spot,
        Asset::Margin,
        Asset::MarginFunding,
        Asset::Futures,
        Asset::PerpetualSwap,
        Asset::PerpetualContract,
        Asset::CoinMarginedFutures,
        Asset::UsdtMarginedFutures,
        Asset::Index,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Spot => "spot",
            Asset::Margin => "margin",
            Asset::MarginFunding => "marginfunding",
            Asset::Futures => "futures",
            Asset::PerpetualSwap => "perpetualswap",
            Asset::PerpetualContract => "perpetualcontract",
            Asset::CoinMarginedFutures => "coinmarginedfutures",
            Asset::UsdtMarginedFutures => "usdtmarginedfutures",
            Asset::Index => "index",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Asset::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == lowered)
            .ok_or_else(|| ExchangeError::AssetNotSupported(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("SPOT".parse::<Asset>().unwrap(), Asset::Spot);
        assert_eq!("MarginFunding".parse::<Asset>().unwrap(), Asset::MarginFunding);
        assert!("options".parse::<Asset>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for asset in Asset::ALL {
            let json = serde_json::to_string(&asset).unwrap();
            assert_eq!(json, format!("\"{asset}\""));
        }
    }
}
