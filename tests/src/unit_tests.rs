//! Unit tests for the shared building blocks every adapter leans on
//!
//! Fixed-point parsing, pair formatting, order book merging, nonces,
//! credential gating and config loading. Venue behaviour lives in
//! `venue_rest_tests.rs`.

use proptest::prelude::*;
use rstest::*;
use serial_test::serial;
use tradebridge_exchanges::orderbook::OrderbookUpdate;
use tradebridge_exchanges::prelude::*;
use tradebridge_exchanges::registry;

// ============================================================================
// FIXED POINT
// ============================================================================

#[cfg(test)]
mod fixed_point {
    use super::*;

    #[rstest]
    #[case("1.0", "2.0", "3")]
    #[case("0.1", "0.2", "0.3")]
    #[case("999.999", "0.001", "1000")]
    #[case("-50", "50", "0")]
    fn test_exact_addition(#[case] a: &str, #[case] b: &str, #[case] expected: &str) {
        let sum = Fixed::from_str_exact(a).unwrap() + Fixed::from_str_exact(b).unwrap();
        assert_eq!(sum.to_string_exact(), expected);
    }

    #[rstest]
    #[case(serde_json::json!("13990.84"), "13990.84")]
    #[case(serde_json::json!(51174.5), "51174.5")]
    #[case(serde_json::json!(10645), "10645")]
    fn test_json_strings_and_numbers(#[case] value: serde_json::Value, #[case] expected: &str) {
        assert_eq!(Fixed::from_json(&value).unwrap().to_string_exact(), expected);
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        assert!(Fixed::from_str_exact("invalid_number").is_err());
        assert!(Fixed::ONE.checked_div(Fixed::ZERO).is_err());
    }

    proptest! {
        #[test]
        fn test_addition_commutative(a in 0..10_000i64, b in 0..10_000i64) {
            let (a, b) = (Fixed::from_i64(a), Fixed::from_i64(b));
            prop_assert_eq!(a + b, b + a);
        }
    }
}

// ============================================================================
// CURRENCY PAIRS
// ============================================================================

#[cfg(test)]
mod pairs {
    use super::*;

    #[rstest]
    #[case("btc_usdt", "_", "BTC", "USDT")]
    #[case("ETH-BTC", "-", "ETH", "BTC")]
    #[case("XBT/EUR", "/", "XBT", "EUR")]
    fn test_from_delimited(#[case] symbol: &str, #[case] delimiter: &str, #[case] base: &str, #[case] quote: &str) {
        let pair = Pair::from_delimited(symbol, delimiter).unwrap();
        assert_eq!(pair.base, base);
        assert_eq!(pair.quote, quote);
    }

    #[rstest]
    #[case("btcusdt", "_")]
    #[case("a_b_c", "_")]
    #[case("_usdt", "_")]
    fn test_from_delimited_rejects(#[case] symbol: &str, #[case] delimiter: &str) {
        assert!(matches!(
            Pair::from_delimited(symbol, delimiter),
            Err(ExchangeError::InvalidPair(_))
        ));
    }

    #[rstest]
    #[case(PairFormat::new(false, "_"), "btc_usdt")]
    #[case(PairFormat::new(true, "-"), "BTC-USDT")]
    #[case(PairFormat::new(true, ""), "BTCUSDT")]
    fn test_format(#[case] format: PairFormat, #[case] expected: &str) {
        assert_eq!(Pair::new("btc", "usdt").format(&format), expected);
    }

    #[test]
    fn test_equality_ignores_delimiter_and_case() {
        let a = Pair::from_delimited("btc_usdt", "_").unwrap();
        assert_eq!(a, Pair::new("BTC", "USDT"));
        assert!(!a.is_empty());
        assert!(Pair::default().is_empty());
    }
}

// ============================================================================
// ORDER BOOK MERGING
// ============================================================================

#[cfg(test)]
mod orderbook_merge {
    use super::*;

    fn level(price: i64, amount: i64) -> Level {
        Level::new(Fixed::from_i64(price), Fixed::from_i64(amount))
    }

    fn book() -> Orderbook {
        Orderbook::new("CryptoCom", Pair::new("BTC", "USDT"), Asset::Spot)
    }

    #[test]
    fn test_zero_amount_deletes_level() {
        let mut book = book();
        book.apply_update(&OrderbookUpdate {
            bids: vec![level(100, 1), level(99, 2)],
            asks: vec![level(101, 1)],
            update_id: 1,
            ..Default::default()
        })
        .unwrap();
        book.apply_update(&OrderbookUpdate {
            bids: vec![level(100, 0)],
            update_id: 2,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(book.best_bid(), Some(Fixed::from_i64(99)));
        assert_eq!(book.spread(), Some(Fixed::from_i64(2)));
    }

    #[test]
    fn test_stale_update_skipped() {
        let mut book = book();
        book.apply_update(&OrderbookUpdate {
            asks: vec![level(101, 1)],
            update_id: 5,
            ..Default::default()
        })
        .unwrap();
        book.apply_update(&OrderbookUpdate {
            asks: vec![level(101, 0)],
            update_id: 4,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(book.best_ask(), Some(Fixed::from_i64(101)));
        assert_eq!(book.update_id, 5);
    }

    #[test]
    fn test_crossed_book_rejected() {
        let mut book = book();
        book.bids = vec![level(102, 1)];
        book.asks = vec![level(101, 1)];
        assert!(matches!(book.verify(), Err(ExchangeError::OrderbookInvalid(_))));
    }

    proptest! {
        #[test]
        fn test_merged_book_stays_valid(
            bids in prop::collection::vec((1..1000i64, 0..50i64), 0..60),
            asks in prop::collection::vec((1001..2000i64, 0..50i64), 0..60),
        ) {
            let mut book = book();
            for (id, (bid, ask)) in bids.iter().zip(asks.iter()).enumerate() {
                let update = OrderbookUpdate {
                    bids: vec![level(bid.0, bid.1)],
                    asks: vec![level(ask.0, ask.1)],
                    update_id: id as i64 + 1,
                    ..Default::default()
                };
                prop_assert!(book.apply_update(&update).is_ok());
            }

            prop_assert!(book.verify().is_ok());
            prop_assert!(book.bids.iter().chain(book.asks.iter()).all(|l| l.amount.is_positive()));
            prop_assert!(book.bids.windows(2).all(|w| w[0].price > w[1].price));
            prop_assert!(book.asks.windows(2).all(|w| w[0].price < w[1].price));
        }
    }
}

// ============================================================================
// IDS AND NONCES
// ============================================================================

#[cfg(test)]
mod ids {
    use super::*;

    #[rstest]
    #[case(NonceUnit::Millis)]
    #[case(NonceUnit::Micros)]
    #[case(NonceUnit::Nanos)]
    fn test_nonce_strictly_increasing(#[case] unit: NonceUnit) {
        let nonce = Nonce::new(unit);
        let mut last = 0;
        for _ in 0..1_000 {
            let next = nonce.next();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_client_order_id_prefix() {
        let id = generate_client_order_id("tb");
        assert!(id.starts_with("tb-"));
        assert_eq!(id.len(), 15);
        assert!(id[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    proptest! {
        #[test]
        fn test_id_generation_uniqueness(count in 1..100usize) {
            let mut ids = std::collections::HashSet::new();
            for _ in 0..count {
                prop_assert!(ids.insert(generate_id()), "Generated duplicate ID");
            }
        }
    }
}

// ============================================================================
// CREDENTIALS AND CONFIG
// ============================================================================

#[cfg(test)]
mod credentials {
    use super::*;

    #[fixture]
    fn gemini() -> Box<dyn BotExchange> {
        let mut exchange = new_exchange("gemini").unwrap();
        exchange
            .setup(&ExchangeConfig::new("Gemini").with_credentials("key", "secret"))
            .unwrap();
        exchange
    }

    #[rstest]
    fn test_configured_credentials_allow_private_calls(gemini: Box<dyn BotExchange>) {
        assert!(gemini.base().allow_authenticated_request());
        assert!(gemini.base().check_authenticated().is_ok());
    }

    #[rstest]
    #[case("", "secret")]
    #[case("key", "")]
    #[case("Key", "Secret")]
    fn test_placeholder_credentials_rejected(#[case] key: &str, #[case] secret: &str) {
        let mut exchange = new_exchange("gemini").unwrap();
        exchange
            .setup(&ExchangeConfig::new("Gemini").with_credentials(key, secret))
            .unwrap();
        assert_eq!(
            exchange.base().check_authenticated(),
            Err(ExchangeError::AuthenticationSupportNotEnabled("Gemini".to_string()))
        );
    }

    #[test]
    fn test_setup_rejects_foreign_config() {
        let mut exchange = new_exchange("zb").unwrap();
        assert!(exchange.setup(&ExchangeConfig::new("Kraken")).is_err());
    }

    #[test]
    fn test_config_enabled_filter() {
        let config = Config::from_json(
            r#"{"exchanges":[{"name":"Kraken","enabled":true},{"name":"Lbank","enabled":false},{"name":"ZB","enabled":true}]}"#,
        )
        .unwrap();
        let loaded = registry::load_enabled(&config).unwrap();
        let names: Vec<&str> = loaded.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Kraken", "ZB"]);
    }
}

// ============================================================================
// SEQUENTIAL TESTS (process environment)
// ============================================================================

#[cfg(test)]
mod env_credentials {
    use super::*;

    #[test]
    #[serial]
    fn test_env_credentials_enable_private_calls() {
        std::env::set_var("KRAKEN_API_KEY", "env-key");
        std::env::set_var("KRAKEN_API_SECRET", "c2VjcmV0");

        let config = ExchangeConfig::new("Kraken").with_env_credentials().unwrap();
        let exchange = registry::from_config(&config).unwrap();
        assert_eq!(exchange.base().credentials().key, "env-key");
        assert!(exchange.base().allow_authenticated_request());

        std::env::remove_var("KRAKEN_API_KEY");
        std::env::remove_var("KRAKEN_API_SECRET");
    }

    #[test]
    #[serial]
    fn test_missing_env_credentials() {
        std::env::remove_var("KRAKEN_API_KEY");
        std::env::remove_var("KRAKEN_API_SECRET");

        assert!(matches!(
            ExchangeConfig::new("Kraken").with_env_credentials(),
            Err(ExchangeError::MissingCredentials { .. })
        ));
    }
}
