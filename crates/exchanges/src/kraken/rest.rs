//! Kraken REST endpoints and request signing

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use tradebridge_core::prelude::*;

use super::types::*;
use super::{Kraken, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::Method;
use crate::request::Item;
use crate::sign::{base64_encode, encode_query, hmac_sha512, sha256};

pub const KRAKEN_API_URL: &str = "https://api.kraken.com";
pub const KRAKEN_API_VERSION: &str = "0";

/// `API-Sign`: base64(HMAC-SHA512(secret, path + SHA256(nonce + body)))
pub fn sign(secret: &[u8], path: &str, nonce: &str, body: &str) -> Result<String> {
    let mut payload = path.as_bytes().to_vec();
    payload.extend_from_slice(&sha256(format!("{nonce}{body}").as_bytes()));
    Ok(base64_encode(&hmac_sha512(secret, &payload)?))
}

/// Kraken spells a few assets differently
pub fn to_kraken_asset(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "BTC" => "XBT".to_string(),
        "DOGE" => "XDG".to_string(),
        other => other.to_string(),
    }
}

/// Asset codes Kraken still reports with an `X` (crypto) or `Z` (fiat) prefix
const LEGACY_ASSETS: &[&str] = &[
    "XETC", "XETH", "XLTC", "XMLN", "XREP", "XXBT", "XXDG", "XXLM", "XXMR", "XXRP", "XZEC",
    "ZAUD", "ZCAD", "ZEUR", "ZGBP", "ZJPY", "ZUSD",
];

/// Undo Kraken's legacy prefixes and renames: `XXBT` → `BTC`, `ZUSD` → `USD`
pub fn from_kraken_asset(code: &str) -> String {
    let upper = code.to_ascii_uppercase();
    let stripped = if LEGACY_ASSETS.contains(&upper.as_str()) {
        &upper[1..]
    } else {
        upper.as_str()
    };
    match stripped {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        other => other.to_string(),
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T> {
    if let Some(first) = envelope.error.first() {
        let (code, message) = first.split_once(':').unwrap_or(("EGeneral", first.as_str()));
        return Err(ExchangeError::api("Kraken", code, message));
    }
    envelope
        .result
        .ok_or_else(|| ExchangeError::InvalidResponse("Kraken response without result".to_string()))
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

impl Kraken {
    async fn public<T: DeserializeOwned>(&self, method: &str, params: &[(String, String)]) -> Result<T> {
        let mut url = format!(
            "{}/{KRAKEN_API_VERSION}/public/{method}",
            self.base.api_url(UrlKind::RestSpot)?
        );
        if !params.is_empty() {
            url.push('?');
            url.push_str(&encode_query(params));
        }
        let envelope: Envelope<T> = self.base.requester.send_json(Item::get(url).limit(PUBLIC)).await?;
        unwrap_envelope(envelope)
    }

    async fn private<T: DeserializeOwned>(&self, method: &str, params: Vec<(String, String)>) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let path = format!("/{KRAKEN_API_VERSION}/private/{method}");
        let nonce = self.nonce.next_string();
        let mut form = vec![param("nonce", &nonce)];
        form.extend(params);
        let body = encode_query(&form);
        let signature = sign(&creds.decoded_secret()?, &path, &nonce, &body)?;

        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        let item = Item::new(Method::Post, url)
            .header("API-Key", creds.key.clone())
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .limit(PRIVATE)
            .authenticated();
        let envelope: Envelope<T> = self.base.requester.send_json(item).await?;
        unwrap_envelope(envelope)
    }

    pub async fn get_server_time(&self) -> Result<u64> {
        let result: Value = self.public("Time", &[]).await?;
        result["unixtime"]
            .as_u64()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("Kraken time {result}")))
    }

    /// Asset pairs keyed by Kraken's canonical name (`XXBTZUSD`). Cached.
    pub async fn get_asset_pairs(&self) -> Result<HashMap<String, AssetPairInfo>> {
        if let Ok(cache) = self.asset_pairs.lock() {
            if !cache.is_empty() {
                return Ok(cache.clone());
            }
        }
        let pairs: HashMap<String, AssetPairInfo> = self.public("AssetPairs", &[]).await?;
        debug!("📋 Kraken listed {} asset pairs", pairs.len());
        if let Ok(mut cache) = self.asset_pairs.lock() {
            *cache = pairs.clone();
        }
        Ok(pairs)
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<TickerInfo> {
        let mut result: HashMap<String, TickerInfo> =
            self.public("Ticker", &[param("pair", symbol)]).await?;
        let key = result.keys().next().cloned().ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("Kraken returned no ticker for {symbol}"))
        })?;
        result
            .remove(&key)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("Kraken ticker {key} vanished")))
    }

    pub async fn get_depth(&self, symbol: &str, count: u32) -> Result<DepthInfo> {
        let mut result: HashMap<String, DepthInfo> = self
            .public("Depth", &[param("pair", symbol), param("count", count)])
            .await?;
        let key = result.keys().next().cloned().ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("Kraken returned no book for {symbol}"))
        })?;
        result
            .remove(&key)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("Kraken book {key} vanished")))
    }

    /// Raw trade rows `[price, volume, time, side, type, misc, trade_id]`
    pub async fn get_trades(&self, symbol: &str, since: Option<u64>) -> Result<Vec<Vec<Value>>> {
        let mut params = vec![param("pair", symbol)];
        if let Some(since) = since {
            params.push(param("since", since));
        }
        let result: HashMap<String, Value> = self.public("Trades", &params).await?;
        let rows = result
            .into_iter()
            .filter(|(key, _)| key != "last")
            .find_map(|(_, value)| serde_json::from_value::<Vec<Vec<Value>>>(value).ok())
            .unwrap_or_default();
        Ok(rows)
    }

    pub async fn get_balance(&self) -> Result<HashMap<String, Value>> {
        self.private("Balance", Vec::new()).await
    }

    pub async fn add_order(&self, params: Vec<(String, String)>) -> Result<AddOrderResult> {
        self.private("AddOrder", params).await
    }

    pub async fn cancel_order_by_id(&self, txid: &str) -> Result<CountResult> {
        self.private("CancelOrder", vec![param("txid", txid)]).await
    }

    pub async fn cancel_all(&self) -> Result<CountResult> {
        self.private("CancelAll", Vec::new()).await
    }

    pub async fn query_orders(&self, txid: &str) -> Result<HashMap<String, OrderInfo>> {
        self.private("QueryOrders", vec![param("txid", txid), param("trades", "false")])
            .await
    }

    pub async fn get_open_orders(&self) -> Result<OpenOrders> {
        self.private("OpenOrders", Vec::new()).await
    }

    pub async fn get_closed_orders(&self, start: Option<u64>, end: Option<u64>) -> Result<ClosedOrders> {
        let mut params = Vec::new();
        if let Some(start) = start {
            params.push(param("start", start));
        }
        if let Some(end) = end {
            params.push(param("end", end));
        }
        self.private("ClosedOrders", params).await
    }

    pub async fn get_deposit_methods(&self, asset: &str) -> Result<Vec<DepositMethod>> {
        self.private("DepositMethods", vec![param("asset", asset)]).await
    }

    pub async fn get_deposit_addresses(&self, asset: &str, method: &str, new: bool) -> Result<Vec<DepositAddress>> {
        self.private(
            "DepositAddresses",
            vec![param("asset", asset), param("method", method), param("new", new)],
        )
        .await
    }

    /// `key` is the name of a withdrawal address set up on the website
    pub async fn withdraw(&self, asset: &str, key: &str, amount: Fixed) -> Result<WithdrawResult> {
        self.private(
            "Withdraw",
            vec![
                param("asset", asset),
                param("key", key),
                param("amount", amount.to_string_exact()),
            ],
        )
        .await
    }

    pub async fn get_ledgers(&self) -> Result<Ledgers> {
        self.private("Ledgers", vec![param("type", "all")]).await
    }

    /// Taker and maker fee percentages for `symbol` at the account's tier
    pub async fn get_trade_volume_fees(&self, symbol: &str) -> Result<(Fixed, Fixed)> {
        let result: Value = self
            .private("TradeVolume", vec![param("pair", symbol), param("fee-info", true)])
            .await?;
        let pick = |section: &str| -> Result<Fixed> {
            let fee = result[section]
                .as_object()
                .and_then(|m| m.values().next())
                .map(|v| v["fee"].clone())
                .unwrap_or(Value::Null);
            Ok(Fixed::from_json(&fee)?)
        };
        Ok((pick("fees")?, pick("fees_maker")?))
    }
}
