//! Per-asset pair bookkeeping
//!
//! The manager keeps two global formats: the `request_format` a venue
//! expects on the wire and the `config_format` pairs are stored and shown
//! in. Either can be overridden per asset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::Asset;
use crate::currency::{Pair, PairFormat, PairList};
use crate::errors::{ExchangeError, Result};

/// Pairs for one asset class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairStore {
    #[serde(default = "default_true")]
    pub asset_enabled: bool,
    #[serde(default)]
    pub available: Vec<Pair>,
    #[serde(default)]
    pub enabled: Vec<Pair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_format: Option<PairFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_format: Option<PairFormat>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairsManager {
    #[serde(default)]
    pub request_format: PairFormat,
    #[serde(default)]
    pub config_format: PairFormat,
    #[serde(default)]
    pub pairs: BTreeMap<Asset, PairStore>,
    /// Unix seconds of the last tradable pair refresh
    #[serde(default)]
    pub last_updated: u64,
}

impl PairsManager {
    pub fn new(request_format: PairFormat, config_format: PairFormat) -> Self {
        Self {
            request_format,
            config_format,
            ..Default::default()
        }
    }

    /// Register an asset class with optional format overrides
    pub fn register(&mut self, asset: Asset, request: Option<PairFormat>, config: Option<PairFormat>) {
        let store = self.pairs.entry(asset).or_insert_with(|| PairStore {
            asset_enabled: true,
            ..Default::default()
        });
        store.request_format = request;
        store.config_format = config;
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.pairs.keys().copied().collect()
    }

    pub fn supports(&self, asset: Asset) -> bool {
        self.pairs.contains_key(&asset)
    }

    pub fn is_asset_enabled(&self, asset: Asset) -> Result<bool> {
        Ok(self.store(asset)?.asset_enabled)
    }

    pub fn set_asset_enabled(&mut self, asset: Asset, enabled: bool) -> Result<()> {
        self.store_mut(asset)?.asset_enabled = enabled;
        Ok(())
    }

    fn store(&self, asset: Asset) -> Result<&PairStore> {
        self.pairs
            .get(&asset)
            .ok_or_else(|| ExchangeError::AssetNotSupported(asset.to_string()))
    }

    fn store_mut(&mut self, asset: Asset) -> Result<&mut PairStore> {
        self.pairs
            .get_mut(&asset)
            .ok_or_else(|| ExchangeError::AssetNotSupported(asset.to_string()))
    }

    /// Effective format for `asset`; `request` selects the wire format
    pub fn format(&self, asset: Asset, request: bool) -> Result<PairFormat> {
        let store = self.store(asset)?;
        let format = if request {
            store.request_format.as_ref().unwrap_or(&self.request_format)
        } else {
            store.config_format.as_ref().unwrap_or(&self.config_format)
        };
        Ok(format.clone())
    }

    /// Pairs for `asset` rendered with the config delimiter
    pub fn get(&self, asset: Asset, enabled: bool) -> Result<Vec<Pair>> {
        let store = self.store(asset)?;
        let format = self.format(asset, false)?;
        let source = if enabled { &store.enabled } else { &store.available };
        Ok(source.iter().map(|p| p.with_format(&format)).collect())
    }

    /// Replace the stored list. Enabled pairs must already be available.
    pub fn store_pairs(&mut self, asset: Asset, pairs: Vec<Pair>, enabled: bool) -> Result<()> {
        let store = self.store_mut(asset)?;
        if enabled {
            if let Some(missing) = pairs.iter().find(|p| !store.available.contains_pair(p, false)) {
                return Err(ExchangeError::InvalidPair(format!(
                    "{missing} is not in the available pairs for {asset}"
                )));
            }
            store.enabled = pairs;
        } else {
            store.available = pairs;
        }
        Ok(())
    }

    pub fn enable_pair(&mut self, asset: Asset, pair: &Pair) -> Result<()> {
        let store = self.store_mut(asset)?;
        if !store.available.contains_pair(pair, false) {
            return Err(ExchangeError::InvalidPair(format!("{pair} is not available")));
        }
        if !store.enabled.contains_pair(pair, false) {
            store.enabled.push(pair.clone());
        }
        Ok(())
    }

    pub fn disable_pair(&mut self, asset: Asset, pair: &Pair) -> Result<()> {
        let store = self.store_mut(asset)?;
        let before = store.enabled.len();
        store.enabled.retain(|p| p != pair);
        if store.enabled.len() == before {
            return Err(ExchangeError::InvalidPair(format!("{pair} is not enabled")));
        }
        Ok(())
    }
}
