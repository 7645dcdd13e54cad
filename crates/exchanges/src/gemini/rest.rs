//! Gemini REST endpoints
//!
//! Private calls carry no body: the JSON payload (request path, nonce and
//! parameters) travels base64-encoded in `X-GEMINI-PAYLOAD` and is signed
//! with HMAC-SHA384.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{Gemini, NAME, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, Method};
use crate::request::{Item, decode_body};
use crate::sign::{base64_encode, hex_encode, hmac_sha384};

pub const GEMINI_API_URL: &str = "https://api.gemini.com";
pub const GEMINI_SANDBOX_URL: &str = "https://api.sandbox.gemini.com";

/// Returns `(payload_b64, signature_hex)`
pub fn sign(secret: &[u8], payload: &Value) -> Result<(String, String)> {
    let encoded = base64_encode(payload.to_string().as_bytes());
    let signature = hex_encode(&hmac_sha384(secret, encoded.as_bytes())?);
    Ok((encoded, signature))
}

fn check_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(&response.body) {
        if error.result == "error" {
            return Err(ExchangeError::api(NAME, error.reason, error.message));
        }
    }
    if !response.is_success() {
        return Err(ExchangeError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    decode_body(NAME, &response.body)
}

impl Gemini {
    async fn public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        let response = self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await?;
        check_response(response)
    }

    async fn private<T: DeserializeOwned>(&self, path: &str, params: Value) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let mut payload = json!({
            "request": path,
            "nonce": self.nonce.next(),
        });
        if let (Some(target), Value::Object(extra)) = (payload.as_object_mut(), params) {
            target.extend(extra);
        }
        let (encoded, signature) = sign(creds.secret.as_bytes(), &payload)?;

        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        let item = Item::new(Method::Post, url)
            .header("Content-Type", "text/plain")
            .header("Content-Length", "0")
            .header("Cache-Control", "no-cache")
            .header("X-GEMINI-APIKEY", creds.key.clone())
            .header("X-GEMINI-PAYLOAD", encoded)
            .header("X-GEMINI-SIGNATURE", signature)
            .limit(PRIVATE)
            .authenticated();
        let response = self.base.requester.send_raw(item).await?;
        check_response(response)
    }

    pub async fn get_symbols(&self) -> Result<Vec<String>> {
        self.public("/v1/symbols").await
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<PubTicker> {
        self.public(&format!("/v1/pubticker/{symbol}")).await
    }

    /// 24h open/high/low from the v2 ticker
    pub async fn get_ticker_v2(&self, symbol: &str) -> Result<Value> {
        self.public(&format!("/v2/ticker/{symbol}")).await
    }

    pub async fn get_orderbook(&self, symbol: &str) -> Result<Book> {
        self.public(&format!("/v1/book/{symbol}?limit_bids=0&limit_asks=0")).await
    }

    pub async fn get_trades(&self, symbol: &str, since_ms: Option<u64>) -> Result<Vec<Trade>> {
        let mut path = format!("/v1/trades/{symbol}?limit_trades=500");
        if let Some(since) = since_ms {
            path.push_str(&format!("&timestamp={since}"));
        }
        self.public(&path).await
    }

    pub async fn get_balances(&self) -> Result<Vec<AccountBalance>> {
        self.private("/v1/balances", json!({})).await
    }

    pub async fn new_order(&self, params: Value) -> Result<Order> {
        self.private("/v1/order/new", params).await
    }

    pub async fn cancel_existing_order(&self, order_id: i64) -> Result<Order> {
        self.private("/v1/order/cancel", json!({ "order_id": order_id })).await
    }

    pub async fn cancel_existing_orders(&self, session_only: bool) -> Result<CancelAllResult> {
        let path = if session_only { "/v1/order/cancel/session" } else { "/v1/order/cancel/all" };
        self.private(path, json!({})).await
    }

    pub async fn get_order_status(&self, order_id: i64) -> Result<Order> {
        self.private("/v1/order/status", json!({ "order_id": order_id })).await
    }

    pub async fn get_orders(&self) -> Result<Vec<Order>> {
        self.private("/v1/orders", json!({})).await
    }

    pub async fn get_orders_history(&self, since_ms: Option<u64>) -> Result<Vec<Order>> {
        let mut params = json!({ "limit_orders": 500 });
        if let Some(since) = since_ms {
            params["timestamp"] = json!(since);
        }
        self.private("/v1/orders/history", params).await
    }

    pub async fn get_new_deposit_address(&self, currency: &str, label: &str) -> Result<DepositAddress> {
        let path = format!("/v1/deposit/{}/newAddress", currency.to_ascii_lowercase());
        self.private(&path, json!({ "label": label })).await
    }

    pub async fn withdraw(&self, currency: &str, address: &str, amount: Fixed) -> Result<WithdrawalResult> {
        let path = format!("/v1/withdraw/{}", currency.to_ascii_lowercase());
        self.private(&path, json!({ "address": address, "amount": amount.to_string_exact() }))
            .await
    }

    pub async fn get_transfers(&self) -> Result<Vec<Transfer>> {
        self.private("/v1/transfers", json!({})).await
    }

    pub async fn get_notional_volume(&self) -> Result<NotionalVolume> {
        self.private("/v1/notionalvolume", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_payload_round_trips() {
        let payload = json!({"request": "/v1/balances", "nonce": 123});
        let (encoded, signature) = sign(b"secret", &payload).unwrap();
        let decoded: Value = serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded["request"], "/v1/balances");
        assert_eq!(signature.len(), 96);
    }

    #[test]
    fn test_error_body() {
        let response = HttpResponse {
            status: 400,
            headers: Vec::new(),
            body: r#"{"result":"error","reason":"InvalidNonce","message":"Nonce '1' has not increased"}"#.to_string(),
        };
        let err = check_response::<Value>(response).unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "InvalidNonce", "Nonce '1' has not increased"));
    }
}
