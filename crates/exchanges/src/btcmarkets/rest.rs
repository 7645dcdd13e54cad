//! BTCMarkets v3 REST endpoints

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{BtcMarkets, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::Result;
use crate::http::Method;
use crate::request::Item;
use crate::sign::{base64_encode, encode_query, hmac_sha512};

pub const BTCMARKETS_API_URL: &str = "https://api.btcmarkets.net";

/// `BM-AUTH-SIGNATURE`: base64(HMAC-SHA512(secret, METHOD + path + timestamp + body))
pub fn sign(secret: &[u8], method: Method, path: &str, timestamp: &str, body: &str) -> Result<String> {
    let payload = format!("{method}{path}{timestamp}{body}");
    Ok(base64_encode(&hmac_sha512(secret, payload.as_bytes())?))
}

impl BtcMarkets {
    async fn public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        self.base.requester.send_json(Item::get(url).limit(PUBLIC)).await
    }

    /// `path` is signed without its query string
    async fn private<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let timestamp = unix_millis().to_string();
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let signature = sign(&creds.decoded_secret()?, method, path, &timestamp, &body)?;

        let mut url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        let mut item = Item::new(method, url)
            .header("Accept", "application/json")
            .header("Accept-Charset", "UTF-8")
            .header("Content-Type", "application/json")
            .header("BM-AUTH-APIKEY", creds.key.clone())
            .header("BM-AUTH-TIMESTAMP", timestamp)
            .header("BM-AUTH-SIGNATURE", signature)
            .limit(PRIVATE)
            .authenticated();
        if !body.is_empty() {
            item = item.body(body);
        }
        self.base.requester.send_json(item).await
    }

    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        self.public("/v3/markets").await
    }

    pub async fn get_ticker(&self, market_id: &str) -> Result<MarketTicker> {
        self.public(&format!("/v3/markets/{market_id}/ticker")).await
    }

    pub async fn get_tickers(&self, market_ids: &[String]) -> Result<Vec<MarketTicker>> {
        let query: Vec<(String, String)> = market_ids
            .iter()
            .map(|id| ("marketId".to_string(), id.clone()))
            .collect();
        self.public(&format!("/v3/markets/tickers?{}", encode_query(&query))).await
    }

    pub async fn get_orderbook(&self, market_id: &str) -> Result<MarketOrderbook> {
        self.public(&format!("/v3/markets/{market_id}/orderbook?level=2")).await
    }

    pub async fn get_trades(&self, market_id: &str) -> Result<Vec<MarketTrade>> {
        self.public(&format!("/v3/markets/{market_id}/trades")).await
    }

    pub async fn get_account_balance(&self) -> Result<Vec<AssetBalance>> {
        self.private(Method::Get, "/v3/accounts/me/balances", &[], None).await
    }

    pub async fn new_order(&self, body: Value) -> Result<Order> {
        self.private(Method::Post, "/v3/orders", &[], Some(body)).await
    }

    pub async fn remove_order(&self, order_id: &str) -> Result<CancelledOrder> {
        self.private(Method::Delete, &format!("/v3/orders/{order_id}"), &[], None).await
    }

    pub async fn remove_all_orders(&self, market_ids: &[String]) -> Result<Vec<CancelledOrder>> {
        let query: Vec<(String, String)> = market_ids
            .iter()
            .map(|id| ("marketId".to_string(), id.clone()))
            .collect();
        self.private(Method::Delete, "/v3/orders", &query, None).await
    }

    /// Amend price and amount; the venue issues a new order id
    pub async fn replace_order(&self, order_id: &str, price: Fixed, amount: Fixed) -> Result<Order> {
        let body = json!({
            "price": price.to_string_exact(),
            "amount": amount.to_string_exact(),
        });
        self.private(Method::Put, &format!("/v3/orders/{order_id}"), &[], Some(body)).await
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        self.private(Method::Get, &format!("/v3/orders/{order_id}"), &[], None).await
    }

    /// `status` is `open` or `all`
    pub async fn get_orders(&self, market_id: Option<&str>, status: &str) -> Result<Vec<Order>> {
        let mut query = vec![("status".to_string(), status.to_string())];
        if let Some(id) = market_id {
            query.push(("marketId".to_string(), id.to_string()));
        }
        self.private(Method::Get, "/v3/orders", &query, None).await
    }

    pub async fn fetch_deposit_address(&self, asset: &str) -> Result<DepositAddress> {
        let query = vec![("assetName".to_string(), asset.to_string())];
        self.private(Method::Get, "/v3/addresses", &query, None).await
    }

    pub async fn request_withdraw(&self, asset: &str, amount: Fixed, address: &str) -> Result<Transfer> {
        let body = json!({
            "assetName": asset,
            "amount": amount.to_string_exact(),
            "toAddress": address,
        });
        self.private(Method::Post, "/v3/withdrawals", &[], Some(body)).await
    }

    pub async fn get_transfers(&self) -> Result<Vec<Transfer>> {
        self.private(Method::Get, "/v3/transfers", &[], None).await
    }

    pub async fn get_trading_fees(&self) -> Result<TradingFees> {
        self.private(Method::Get, "/v3/accounts/me/trading-fees", &[], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_covers_method_and_body() {
        let base = sign(b"secret", Method::Post, "/v3/orders", "1600000000000", "{}").unwrap();
        // base64 of a 64 byte digest
        assert_eq!(base.len(), 88);
        assert_ne!(base, sign(b"secret", Method::Get, "/v3/orders", "1600000000000", "{}").unwrap());
        assert_ne!(base, sign(b"secret", Method::Post, "/v3/orders", "1600000000000", "").unwrap());
    }
}
