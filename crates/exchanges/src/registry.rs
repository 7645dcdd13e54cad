//! Construct adapters by name

use tracing::info;

use crate::config::{Config, ExchangeConfig};
use crate::errors::{ExchangeError, Result};
use crate::traits::BotExchange;
use crate::{bitfinex, btcmarkets, btse, coinbasepro, cryptocom, gemini, huobi, kraken, lbank, zb};

const SUPPORTED: [&str; 10] = [
    "bitfinex",
    "btcmarkets",
    "btse",
    "coinbasepro",
    "cryptocom",
    "gemini",
    "huobi",
    "kraken",
    "lbank",
    "zb",
];

/// Lowercase names accepted by [`new_exchange`]
pub fn supported_exchanges() -> Vec<&'static str> {
    SUPPORTED.to_vec()
}

/// Fresh adapter with default settings. Names match case-insensitively.
pub fn new_exchange(name: &str) -> Result<Box<dyn BotExchange>> {
    let exchange: Box<dyn BotExchange> = match name.to_ascii_lowercase().as_str() {
        "bitfinex" => Box::new(bitfinex::Bitfinex::new()?),
        "btcmarkets" => Box::new(btcmarkets::BtcMarkets::new()?),
        "btse" => Box::new(btse::Btse::new()?),
        "coinbasepro" => Box::new(coinbasepro::CoinbasePro::new()?),
        "cryptocom" => Box::new(cryptocom::CryptoCom::new()?),
        "gemini" => Box::new(gemini::Gemini::new()?),
        "huobi" => Box::new(huobi::Huobi::new()?),
        "kraken" => Box::new(kraken::Kraken::new()?),
        "lbank" => Box::new(lbank::Lbank::new()?),
        "zb" => Box::new(zb::Zb::new()?),
        _ => return Err(ExchangeError::ExchangeNotSupported(name.to_string())),
    };
    Ok(exchange)
}

/// Adapter built and set up from its config section
pub fn from_config(config: &ExchangeConfig) -> Result<Box<dyn BotExchange>> {
    let mut exchange = new_exchange(&config.name)?;
    exchange.setup(config)?;
    info!("🔌 {} loaded (enabled: {})", exchange.name(), exchange.is_enabled());
    Ok(exchange)
}

/// Every enabled exchange in the config file
pub fn load_enabled(config: &Config) -> Result<Vec<Box<dyn BotExchange>>> {
    config.enabled_exchanges().map(from_config).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;

    #[test]
    fn test_every_supported_name_constructs() {
        for name in supported_exchanges() {
            let exchange = new_exchange(name).unwrap();
            assert_eq!(exchange.name().to_ascii_lowercase(), name);
            assert!(exchange.supports_asset(Asset::Spot), "{name}");
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(new_exchange("CryptoCom").unwrap().name(), "CryptoCom");
        assert_eq!(new_exchange("ZB").unwrap().name(), "ZB");
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            new_exchange("binance"),
            Err(ExchangeError::ExchangeNotSupported(name)) if name == "binance"
        ));
    }

    #[test]
    fn test_from_config_applies_settings() {
        let config = ExchangeConfig::new("Kraken").with_verbose(true);
        let exchange = from_config(&config).unwrap();
        assert!(exchange.is_enabled());
        assert!(exchange.base().is_verbose());
    }
}
