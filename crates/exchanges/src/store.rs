//! Last-known market and account state per adapter
//!
//! `update_*` operations write here; `fetch_*` read here first.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::asset::Asset;
use crate::currency::Pair;
use crate::errors::{ExchangeError, Result};
use crate::orderbook::{Orderbook, OrderbookUpdate};
use crate::types::{Holdings, Ticker};

type Key = (Asset, String);

#[derive(Debug, Default)]
pub struct MarketStore {
    tickers: Mutex<HashMap<Key, Ticker>>,
    orderbooks: Mutex<HashMap<Key, Orderbook>>,
    holdings: Mutex<HashMap<Asset, Holdings>>,
}

fn poisoned<T>(_: T) -> ExchangeError {
    ExchangeError::ConfigurationError("market store lock poisoned".to_string())
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_ticker(&self, ticker: Ticker, asset: Asset) -> Result<()> {
        if ticker.pair.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        let key = (asset, ticker.pair.key());
        self.tickers.lock().map_err(poisoned)?.insert(key, ticker);
        Ok(())
    }

    pub fn get_ticker(&self, pair: &Pair, asset: Asset) -> Result<Ticker> {
        self.tickers
            .lock()
            .map_err(poisoned)?
            .get(&(asset, pair.key()))
            .cloned()
            .ok_or_else(|| ExchangeError::NoDataStored(format!("ticker {pair} {asset}")))
    }

    /// Store a snapshot after verifying it
    pub fn process_orderbook(&self, book: Orderbook) -> Result<()> {
        book.verify()?;
        let key = (book.asset, book.pair.key());
        self.orderbooks.lock().map_err(poisoned)?.insert(key, book);
        Ok(())
    }

    /// Merge a delta into the stored snapshot and return the result.
    /// A delta that leaves the book invalid is rejected and the stored
    /// snapshot is kept as it was.
    pub fn update_orderbook(&self, pair: &Pair, asset: Asset, update: &OrderbookUpdate) -> Result<Orderbook> {
        let mut books = self.orderbooks.lock().map_err(poisoned)?;
        let stored = books
            .get_mut(&(asset, pair.key()))
            .ok_or_else(|| ExchangeError::NoDataStored(format!("orderbook {pair} {asset}")))?;
        let mut book = stored.clone();
        book.apply_update(update)?;
        book.verify()?;
        *stored = book.clone();
        Ok(book)
    }

    pub fn get_orderbook(&self, pair: &Pair, asset: Asset) -> Result<Orderbook> {
        self.orderbooks
            .lock()
            .map_err(poisoned)?
            .get(&(asset, pair.key()))
            .cloned()
            .ok_or_else(|| ExchangeError::NoDataStored(format!("orderbook {pair} {asset}")))
    }

    pub fn process_holdings(&self, holdings: Holdings, asset: Asset) -> Result<()> {
        self.holdings.lock().map_err(poisoned)?.insert(asset, holdings);
        Ok(())
    }

    pub fn get_holdings(&self, asset: Asset) -> Result<Holdings> {
        self.holdings
            .lock()
            .map_err(poisoned)?
            .get(&asset)
            .cloned()
            .ok_or_else(|| ExchangeError::NoDataStored(format!("holdings {asset}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Level;
    use tradebridge_core::prelude::*;

    #[test]
    fn test_ticker_lookup_ignores_format() {
        let store = MarketStore::new();
        let ticker = Ticker {
            exchange: "Test".to_string(),
            pair: Pair::with_delimiter("BTC", "USD", ""),
            last: Fixed::from_i64(100),
            ..Default::default()
        };
        store.process_ticker(ticker, Asset::Spot).unwrap();

        let found = store.get_ticker(&Pair::new("btc", "usd"), Asset::Spot).unwrap();
        assert_eq!(found.last, Fixed::from_i64(100));
        assert!(matches!(
            store.get_ticker(&Pair::new("BTC", "USD"), Asset::Margin),
            Err(ExchangeError::NoDataStored(_))
        ));
    }

    #[test]
    fn test_orderbook_snapshot_and_delta() {
        let store = MarketStore::new();
        let pair = Pair::new("ETH", "USD");
        let mut book = Orderbook::new("Test", pair.clone(), Asset::Spot);
        book.bids = vec![Level::new(Fixed::from_i64(10), Fixed::ONE)];
        book.asks = vec![Level::new(Fixed::from_i64(11), Fixed::ONE)];
        store.process_orderbook(book.clone()).unwrap();

        let update = OrderbookUpdate {
            bids: vec![Level::new(Fixed::from_i64(9), Fixed::ONE)],
            ..Default::default()
        };
        let merged = store.update_orderbook(&pair, Asset::Spot, &update).unwrap();
        assert_eq!(merged.bids.len(), 2);

        let mut crossed = book;
        crossed.bids[0].price = Fixed::from_i64(12);
        assert!(store.process_orderbook(crossed).is_err());
    }

    #[test]
    fn test_crossing_delta_leaves_stored_book_untouched() {
        let store = MarketStore::new();
        let pair = Pair::new("ETH", "USD");
        let mut book = Orderbook::new("Test", pair.clone(), Asset::Spot);
        book.bids = vec![Level::new(Fixed::from_i64(10), Fixed::ONE)];
        book.asks = vec![Level::new(Fixed::from_i64(11), Fixed::ONE)];
        store.process_orderbook(book).unwrap();

        let crossing = OrderbookUpdate {
            bids: vec![Level::new(Fixed::from_i64(12), Fixed::ONE)],
            ..Default::default()
        };
        assert!(matches!(
            store.update_orderbook(&pair, Asset::Spot, &crossing),
            Err(ExchangeError::OrderbookInvalid(_))
        ));

        let stored = store.get_orderbook(&pair, Asset::Spot).unwrap();
        assert_eq!(stored.bids, vec![Level::new(Fixed::from_i64(10), Fixed::ONE)]);
        assert!(stored.verify().is_ok());
    }
}
