//! BTSE spot v3.2 REST endpoints

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{Btse, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::Result;
use crate::http::Method;
use crate::request::Item;
use crate::sign::{encode_query, hex_encode, hmac_sha384};

pub const BTSE_API_URL: &str = "https://api.btse.com/spot";
pub const BTSE_API_PATH: &str = "/api/v3.2/";

/// `request-sign`: hex HMAC-SHA384 over `path + nonce + body`
pub fn sign(secret: &[u8], path: &str, nonce: &str, body: &str) -> Result<String> {
    let payload = format!("{path}{nonce}{body}");
    Ok(hex_encode(&hmac_sha384(secret, payload.as_bytes())?))
}

fn query_string(query: &[(String, String)]) -> String {
    if query.is_empty() {
        String::new()
    } else {
        format!("?{}", encode_query(query))
    }
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Btse {
    async fn public<T: DeserializeOwned>(&self, endpoint: &str, query: &[(String, String)]) -> Result<T> {
        let url = format!(
            "{}{BTSE_API_PATH}{endpoint}{}",
            self.base.api_url(UrlKind::RestSpot)?,
            query_string(query)
        );
        self.base.requester.send_json(Item::get(url).limit(PUBLIC)).await
    }

    async fn private<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let path = format!("{BTSE_API_PATH}{endpoint}");
        let nonce = unix_millis().to_string();
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let signature = sign(creds.secret.as_bytes(), &path, &nonce, &body)?;

        let url = format!("{}{path}{}", self.base.api_url(UrlKind::RestSpot)?, query_string(query));
        let mut item = Item::new(method, url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("request-api", creds.key.clone())
            .header("request-nonce", nonce)
            .header("request-sign", signature)
            .limit(PRIVATE)
            .authenticated();
        if !body.is_empty() {
            item = item.body(body);
        }
        self.base.requester.send_json(item).await
    }

    pub async fn get_market_summary(&self, symbol: &str) -> Result<Vec<MarketSummary>> {
        self.public("market_summary", &params(&[("symbol", symbol)])).await
    }

    pub async fn fetch_orderbook(&self, symbol: &str) -> Result<OrderbookL2> {
        self.public("orderbook/L2", &params(&[("symbol", symbol), ("depth", "100")])).await
    }

    pub async fn get_trades(&self, symbol: &str, start_ms: Option<u64>, end_ms: Option<u64>) -> Result<Vec<Trade>> {
        let start = start_ms.map(|s| s.to_string()).unwrap_or_default();
        let end = end_ms.map(|e| e.to_string()).unwrap_or_default();
        let query = params(&[("symbol", symbol), ("count", "500"), ("startTime", &start), ("endTime", &end)]);
        self.public("trades", &query).await
    }

    pub async fn get_wallet_information(&self) -> Result<Vec<WalletBalance>> {
        self.private(Method::Get, "user/wallet", &[], None).await
    }

    pub async fn create_order(&self, body: Value) -> Result<Vec<OrderResult>> {
        self.private(Method::Post, "order", &[], Some(body)).await
    }

    /// Empty `order_id` cancels every order on the symbol
    pub async fn cancel_existing_order(&self, order_id: &str, symbol: &str, client_order_id: &str) -> Result<Vec<OrderResult>> {
        let query = params(&[("orderID", order_id), ("symbol", symbol), ("clOrderID", client_order_id)]);
        self.private(Method::Delete, "order", &query, None).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<OrderResult> {
        self.private(Method::Get, "order", &params(&[("orderID", order_id)]), None).await
    }

    pub async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        self.private(Method::Get, "user/open_orders", &params(&[("symbol", symbol)]), None).await
    }

    pub async fn get_wallet_address(&self, currency: &str) -> Result<Vec<WalletAddress>> {
        self.private(Method::Get, "user/wallet/address", &params(&[("currency", currency)]), None).await
    }

    pub async fn create_wallet_address(&self, currency: &str) -> Result<Vec<WalletAddress>> {
        self.private(Method::Post, "user/wallet/address", &[], Some(json!({ "currency": currency })))
            .await
    }

    pub async fn withdraw(&self, currency: &str, address: &str, tag: &str, amount: Fixed) -> Result<WithdrawResult> {
        let mut body = json!({
            "currency": currency,
            "address": address,
            "amount": amount.to_string_exact(),
        });
        if !tag.is_empty() {
            body["tag"] = json!(tag);
        }
        self.private(Method::Post, "user/wallet/withdraw", &[], Some(body)).await
    }

    pub async fn get_wallet_history(&self) -> Result<Vec<WalletHistory>> {
        self.private(Method::Get, "user/wallet_history", &[], None).await
    }

    pub async fn get_fees(&self, symbol: &str) -> Result<Vec<FeeRate>> {
        self.private(Method::Get, "user/fees", &params(&[("symbol", symbol)]), None).await
    }
}
