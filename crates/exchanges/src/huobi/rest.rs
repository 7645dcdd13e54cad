//! Huobi spot REST endpoints
//!
//! Authenticated calls put `AccessKeyId`, `SignatureMethod`,
//! `SignatureVersion` and `Timestamp` in the query string and sign
//! `METHOD\nhost\npath\nsorted_query` with HMAC-SHA256.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tradebridge_core::prelude::*;
use url::Url;

use super::types::*;
use super::{Huobi, NAME, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, Method};
use crate::request::{Item, decode_body};
use crate::sign::{base64_encode, encode_query, hmac_sha256, sorted_query};

pub const HUOBI_API_URL: &str = "https://api.huobi.pro";

const SIGNATURE_METHOD: &str = "HmacSHA256";
const SIGNATURE_VERSION: &str = "2";

/// `Signature` query value, base64 before URL encoding
pub fn sign(secret: &[u8], method: Method, host: &str, path: &str, sorted: &str) -> Result<String> {
    let payload = format!("{method}\n{host}\n{path}\n{sorted}");
    Ok(base64_encode(&hmac_sha256(secret, payload.as_bytes())?))
}

/// UTC `YYYY-MM-DDThh:mm:ss`
pub fn signature_timestamp(at: Timestamp) -> String {
    at.to_datetime().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn v1<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let body: Response = match decode_body(NAME, &response.body) {
        Ok(body) => body,
        Err(_) if !response.is_success() => {
            return Err(ExchangeError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        Err(e) => return Err(e),
    };
    if body.status != "ok" {
        return Err(ExchangeError::api(NAME, body.err_code, body.err_msg));
    }
    let payload = if body.data.is_null() { body.tick } else { body.data };
    serde_json::from_value(payload).map_err(|e| ExchangeError::InvalidResponse(format!("{NAME}: {e}")))
}

fn v2<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let body: ResponseV2 = match decode_body(NAME, &response.body) {
        Ok(body) => body,
        Err(_) if !response.is_success() => {
            return Err(ExchangeError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        Err(e) => return Err(e),
    };
    if body.code != 200 {
        return Err(ExchangeError::api(NAME, body.code, body.message));
    }
    serde_json::from_value(body.data).map_err(|e| ExchangeError::InvalidResponse(format!("{NAME}: {e}")))
}

fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Huobi {
    async fn public_raw(&self, path: &str, params: &[(String, String)]) -> Result<HttpResponse> {
        let mut url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&encode_query(params));
        }
        self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await
    }

    /// GET parameters are signed with the auth fields; POST parameters
    /// travel as a JSON body and are not signed
    async fn private_raw(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let endpoint = self.base.api_url(UrlKind::RestSpot)?;
        let host = Url::parse(&endpoint)?
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| ExchangeError::InvalidUrl(endpoint.clone()))?;

        let mut signed = vec![
            ("AccessKeyId".to_string(), creds.key.clone()),
            ("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string()),
            ("SignatureVersion".to_string(), SIGNATURE_VERSION.to_string()),
            ("Timestamp".to_string(), signature_timestamp(Timestamp::now())),
        ];
        signed.extend_from_slice(params);
        let sorted = sorted_query(&signed, true);
        let signature = sign(creds.secret.as_bytes(), method, &host, path, &sorted)?;

        let url = format!("{endpoint}{path}?{sorted}&Signature={}", urlencoding::encode(&signature));
        let item = Item::new(method, url).limit(PRIVATE).authenticated();
        let item = match body {
            Some(body) => item.json(&body),
            None => item.header("Content-Type", "application/json"),
        };
        self.base.requester.send_raw(item).await
    }

    pub async fn get_symbols(&self) -> Result<Vec<Symbol>> {
        v1(self.public_raw("/v1/common/symbols", &[]).await?)
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<MergedDetail> {
        v1(self.public_raw("/market/detail/merged", &query(&[("symbol", symbol)])).await?)
    }

    pub async fn get_tickers(&self) -> Result<Vec<MarketTicker>> {
        v1(self.public_raw("/market/tickers", &[]).await?)
    }

    pub async fn get_depth(&self, symbol: &str) -> Result<Depth> {
        v1(self.public_raw("/market/depth", &query(&[("symbol", symbol), ("type", "step0")])).await?)
    }

    pub async fn get_trade_history(&self, symbol: &str, size: u32) -> Result<Vec<TradeBatch>> {
        let size = size.to_string();
        v1(self.public_raw("/market/history/trade", &query(&[("symbol", symbol), ("size", &size)])).await?)
    }

    pub async fn get_accounts(&self) -> Result<Vec<Account>> {
        v1(self.private_raw(Method::Get, "/v1/account/accounts", &[], None).await?)
    }

    pub async fn get_account_balance(&self, account_id: i64) -> Result<AccountBalance> {
        let path = format!("/v1/account/accounts/{account_id}/balance");
        v1(self.private_raw(Method::Get, &path, &[], None).await?)
    }

    /// Returns the new order id
    pub async fn place_order(&self, body: Value) -> Result<String> {
        v1(self.private_raw(Method::Post, "/v1/order/orders/place", &[], Some(body)).await?)
    }

    pub async fn cancel_existing_order(&self, order_id: &str) -> Result<String> {
        let path = format!("/v1/order/orders/{order_id}/submitcancel");
        v1(self.private_raw(Method::Post, &path, &[], Some(json!({}))).await?)
    }

    /// Returns the venue's order state code for the cancelled order
    pub async fn cancel_order_by_client_id(&self, client_order_id: &str) -> Result<i64> {
        let body = json!({ "client-order-id": client_order_id });
        v1(self
            .private_raw(Method::Post, "/v1/order/orders/submitCancelClientOrder", &[], Some(body))
            .await?)
    }

    pub async fn cancel_open_orders(&self, account_id: i64, symbol: &str) -> Result<BatchCancelResult> {
        let mut body = json!({ "account-id": account_id.to_string() });
        if !symbol.is_empty() {
            body["symbol"] = json!(symbol);
        }
        v1(self
            .private_raw(Method::Post, "/v1/order/orders/batchCancelOpenOrders", &[], Some(body))
            .await?)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let path = format!("/v1/order/orders/{order_id}");
        v1(self.private_raw(Method::Get, &path, &[], None).await?)
    }

    pub async fn get_open_orders(&self, account_id: i64, symbol: &str) -> Result<Vec<Order>> {
        let account = account_id.to_string();
        let params = query(&[("account-id", &account), ("symbol", symbol), ("size", "500")]);
        v1(self.private_raw(Method::Get, "/v1/order/openOrders", &params, None).await?)
    }

    /// `states` is a comma list such as `filled,canceled,partial-canceled`
    pub async fn get_orders(&self, symbol: &str, states: &str, start_ms: Option<u64>, end_ms: Option<u64>) -> Result<Vec<Order>> {
        let start = start_ms.map(|t| t.to_string()).unwrap_or_default();
        let end = end_ms.map(|t| t.to_string()).unwrap_or_default();
        let params = query(&[("symbol", symbol), ("states", states), ("start-time", &start), ("end-time", &end)]);
        v1(self.private_raw(Method::Get, "/v1/order/orders", &params, None).await?)
    }

    pub async fn get_deposit_addresses(&self, currency: &str) -> Result<Vec<DepositAddress>> {
        let params = query(&[("currency", currency)]);
        v2(self.private_raw(Method::Get, "/v2/account/deposit/address", &params, None).await?)
    }

    /// Returns the withdrawal id
    pub async fn create_withdrawal(
        &self,
        currency: &str,
        address: &str,
        address_tag: &str,
        chain: &str,
        amount: Fixed,
        fee: Fixed,
    ) -> Result<i64> {
        let mut body = json!({
            "currency": currency,
            "address": address,
            "amount": amount.to_string_exact(),
        });
        if !address_tag.is_empty() {
            body["addr-tag"] = json!(address_tag);
        }
        if !chain.is_empty() {
            body["chain"] = json!(chain);
        }
        if !fee.is_zero() {
            body["fee"] = json!(fee.to_string_exact());
        }
        v1(self
            .private_raw(Method::Post, "/v1/dw/withdraw/api/create", &[], Some(body))
            .await?)
    }

    /// `kind` is `deposit` or `withdraw`
    pub async fn get_transfers(&self, kind: &str) -> Result<Vec<Transfer>> {
        let params = query(&[("type", kind), ("size", "500")]);
        v1(self.private_raw(Method::Get, "/v1/query/deposit-withdraw", &params, None).await?)
    }

    pub async fn get_fee_rates(&self, symbols: &str) -> Result<Vec<FeeRate>> {
        let params = query(&[("symbols", symbols)]);
        v2(self.private_raw(Method::Get, "/v2/reference/transact-fee-rate", &params, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_timestamp_format() {
        let at = Timestamp::from_secs(1_577_836_800);
        assert_eq!(signature_timestamp(at), "2020-01-01T00:00:00");
    }

    #[test]
    fn test_sign_payload_layout() {
        let sorted = "AccessKeyId=key&SignatureMethod=HmacSHA256&SignatureVersion=2&Timestamp=2020-01-01T00%3A00%3A00";
        let get = sign(b"secret", Method::Get, "api.huobi.pro", "/v1/account/accounts", sorted).unwrap();
        let post = sign(b"secret", Method::Post, "api.huobi.pro", "/v1/account/accounts", sorted).unwrap();
        assert_ne!(get, post);
        // base64 of 32 bytes
        assert_eq!(get.len(), 44);
    }

    #[test]
    fn test_v2_error_code() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"code":1002,"message":"unauthorized","data":null}"#.to_string(),
        };
        let err = v2::<Vec<DepositAddress>>(response).unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 1002, "unauthorized"));
    }
}
