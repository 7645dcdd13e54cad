//! Coinbase Pro REST endpoints

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{CoinbasePro, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::Result;
use crate::http::Method;
use crate::request::Item;
use crate::sign::{base64_encode, encode_query, hmac_sha256};

pub const COINBASE_API_URL: &str = "https://api.pro.coinbase.com";
pub const COINBASE_SANDBOX_URL: &str = "https://api-public.sandbox.pro.coinbase.com";

/// `CB-ACCESS-SIGN`: base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))
pub fn sign(secret: &[u8], timestamp: &str, method: Method, path: &str, body: &str) -> Result<String> {
    let payload = format!("{timestamp}{method}{path}{body}");
    Ok(base64_encode(&hmac_sha256(secret, payload.as_bytes())?))
}

fn with_query(path: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", encode_query(params))
    }
}

impl CoinbasePro {
    async fn public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        self.base.requester.send_json(Item::get(url).limit(PUBLIC)).await
    }

    async fn private<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let timestamp = unix_secs().to_string();
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let signature = sign(&creds.decoded_secret()?, &timestamp, method, path, &body)?;

        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        let mut item = Item::new(method, url)
            .header("CB-ACCESS-KEY", creds.key.clone())
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", creds.client_id.clone())
            .header("Content-Type", "application/json")
            .limit(PRIVATE)
            .authenticated();
        if !body.is_empty() {
            item = item.body(body);
        }
        self.base.requester.send_json(item).await
    }

    pub async fn get_products(&self) -> Result<Vec<Product>> {
        self.public("/products").await
    }

    pub async fn get_ticker(&self, product_id: &str) -> Result<ProductTicker> {
        self.public(&format!("/products/{product_id}/ticker")).await
    }

    pub async fn get_stats(&self, product_id: &str) -> Result<ProductStats> {
        self.public(&format!("/products/{product_id}/stats")).await
    }

    /// Level 2: aggregated top 50 levels
    pub async fn get_orderbook(&self, product_id: &str) -> Result<ProductBook> {
        self.public(&format!("/products/{product_id}/book?level=2")).await
    }

    pub async fn get_trades(&self, product_id: &str) -> Result<Vec<Trade>> {
        self.public(&format!("/products/{product_id}/trades")).await
    }

    pub async fn get_accounts(&self) -> Result<Vec<Account>> {
        self.private(Method::Get, "/accounts", None).await
    }

    pub async fn place_order(&self, body: Value) -> Result<Order> {
        self.private(Method::Post, "/orders", Some(body)).await
    }

    pub async fn cancel_existing_order(&self, order_id: &str) -> Result<Value> {
        self.private(Method::Delete, &format!("/orders/{order_id}"), None).await
    }

    /// Cancelled order ids
    pub async fn cancel_all_existing_orders(&self, product_id: Option<&str>) -> Result<Vec<String>> {
        let params: Vec<(String, String)> = product_id
            .map(|id| vec![("product_id".to_string(), id.to_string())])
            .unwrap_or_default();
        self.private(Method::Delete, &with_query("/orders", &params), None).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.private(Method::Get, &format!("/orders/{order_id}"), None).await
    }

    /// `statuses` among open, pending, active, done, all
    pub async fn get_orders(&self, statuses: &[&str], product_id: Option<&str>) -> Result<Vec<Order>> {
        let mut params: Vec<(String, String)> = statuses
            .iter()
            .map(|s| ("status".to_string(), s.to_string()))
            .collect();
        if let Some(id) = product_id {
            params.push(("product_id".to_string(), id.to_string()));
        }
        self.private(Method::Get, &with_query("/orders", &params), None).await
    }

    pub async fn withdraw_to_crypto_address(
        &self,
        currency: &str,
        amount: Fixed,
        address: &str,
        tag: &str,
    ) -> Result<WithdrawalResult> {
        let mut body = json!({
            "amount": amount.to_string_exact(),
            "currency": currency,
            "crypto_address": address,
        });
        if !tag.is_empty() {
            body["destination_tag"] = json!(tag);
        }
        self.private(Method::Post, "/withdrawals/crypto", Some(body)).await
    }

    pub async fn get_transfers(&self) -> Result<Vec<Transfer>> {
        self.private(Method::Get, "/transfers", None).await
    }

    pub async fn get_fees(&self) -> Result<FeeRates> {
        self.private(Method::Get, "/fees", None).await
    }
}
