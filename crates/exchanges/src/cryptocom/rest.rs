//! Crypto.com exchange v2 REST endpoints
//!
//! Public methods are plain GETs. Private methods are POSTs whose JSON body
//! carries `id`, `method`, `api_key`, `params`, `nonce` and `sig`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{CryptoCom, NAME, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, Method};
use crate::request::{Item, decode_body};
use crate::sign::{encode_query, hex_encode, hmac_sha256};

pub const CRYPTOCOM_API_URL: &str = "https://api.crypto.com/v2";
pub const CRYPTOCOM_SANDBOX_URL: &str = "https://uat-api.3ona.co/v2";
pub const CRYPTOCOM_WS_MARKET_URL: &str = "wss://stream.crypto.com/v2/market";
pub const CRYPTOCOM_WS_USER_URL: &str = "wss://stream.crypto.com/v2/user";

pub const METHOD_AUTH: &str = "public/auth";
pub const METHOD_HEARTBEAT: &str = "public/heartbeat";
pub const METHOD_RESPOND_HEARTBEAT: &str = "public/respond-heartbeat";
pub const METHOD_SUBSCRIBE: &str = "subscribe";
pub const METHOD_UNSUBSCRIBE: &str = "unsubscribe";

/// Deeper levels are flattened to their JSON text
const MAX_PARAM_DEPTH: usize = 3;

/// Concatenate params as `key + value` with keys sorted at every level
pub fn params_to_string(params: &Value) -> String {
    fn write(value: &Value, depth: usize, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::String(s) => out.push_str(s),
            Value::Object(map) if depth < MAX_PARAM_DEPTH => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    out.push_str(key);
                    write(&map[key], depth + 1, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    write(item, depth + 1, out);
                }
            }
            other => out.push_str(&other.to_string()),
        }
    }

    let mut out = String::new();
    if params.is_object() {
        write(params, 0, &mut out);
    }
    out
}

/// `sig`: hex HMAC-SHA256 over `method + id + api_key + params + nonce`
pub fn sign(secret: &[u8], method: &str, id: u64, api_key: &str, params: &Value, nonce: u64) -> Result<String> {
    let payload = format!("{method}{id}{api_key}{}{nonce}", params_to_string(params));
    Ok(hex_encode(&hmac_sha256(secret, payload.as_bytes())?))
}

/// Full signed request object, used for REST bodies and the websocket login
pub fn signed_request(method: &str, id: u64, api_key: &str, secret: &[u8], params: Value, nonce: u64) -> Result<Value> {
    let sig = sign(secret, method, id, api_key, &params, nonce)?;
    let mut request = json!({
        "id": id,
        "method": method,
        "api_key": api_key,
        "nonce": nonce,
        "sig": sig,
    });
    if params.as_object().is_some_and(|p| !p.is_empty()) {
        request["params"] = params;
    }
    Ok(request)
}

/// Unwrap `result` when `code` is zero
pub fn check_envelope(envelope: Envelope) -> Result<Value> {
    if envelope.code != 0 {
        let message = if envelope.message.is_empty() {
            format!("{} failed", envelope.method)
        } else {
            envelope.message
        };
        return Err(ExchangeError::api(NAME, envelope.code, message));
    }
    Ok(envelope.result)
}

fn decode_result<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope = decode_body(NAME, body)?;
    let result = check_envelope(envelope)?;
    serde_json::from_value(result).map_err(|e| ExchangeError::InvalidResponse(format!("{NAME}: {e}")))
}

/// Error envelopes arrive with 4xx statuses, so the body is checked first
fn finish<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    match decode_result(&response.body) {
        Err(ExchangeError::InvalidResponse(_)) if !response.is_success() => Err(ExchangeError::HttpError {
            status: response.status,
            body: response.body,
        }),
        other => other,
    }
}

fn object(pairs: &[(&str, Value)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .filter(|(_, v)| !v.is_null() && v.as_str() != Some(""))
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Value::Object(map)
}

impl CryptoCom {
    async fn public<T: DeserializeOwned>(&self, method: &str, query: &[(String, String)]) -> Result<T> {
        let mut url = format!("{}/{method}", self.base.api_url(UrlKind::RestSpot)?);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        let response = self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await?;
        finish(response)
    }

    async fn private<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let id = self.request_id.next();
        let request = signed_request(method, id, &creds.key, creds.secret.as_bytes(), params, unix_millis())?;

        let url = format!("{}/{method}", self.base.api_url(UrlKind::RestSpot)?);
        let item = Item::new(Method::Post, url)
            .json(&request)
            .limit(PRIVATE)
            .authenticated();
        let response = self.base.requester.send_raw(item).await?;
        finish(response)
    }

    pub async fn get_instruments(&self) -> Result<Vec<Instrument>> {
        let list: InstrumentList = self.public("public/get-instruments", &[]).await?;
        Ok(list.instruments)
    }

    /// Every instrument when `instrument` is `None`
    pub async fn get_ticker(&self, instrument: Option<&str>) -> Result<Vec<TickerData>> {
        let query: Vec<(String, String)> = instrument
            .map(|i| vec![("instrument_name".to_string(), i.to_string())])
            .unwrap_or_default();
        let result: TickerResult = self.public("public/get-ticker", &query).await?;
        Ok(result.data.into_vec())
    }

    pub async fn get_book(&self, instrument: &str, depth: u32) -> Result<BookResult> {
        let query = vec![
            ("instrument_name".to_string(), instrument.to_string()),
            ("depth".to_string(), depth.to_string()),
        ];
        self.public("public/get-book", &query).await
    }

    pub async fn get_trades(&self, instrument: &str) -> Result<Vec<TradeData>> {
        let query = vec![("instrument_name".to_string(), instrument.to_string())];
        let result: TradeResult = self.public("public/get-trades", &query).await?;
        Ok(result.data)
    }

    pub async fn get_account_summary(&self, currency: &str) -> Result<Vec<AccountBalance>> {
        let summary: AccountSummary = self
            .private("private/get-account-summary", object(&[("currency", json!(currency))]))
            .await?;
        Ok(summary.accounts)
    }

    pub async fn create_order(&self, params: Value) -> Result<CreateOrderResult> {
        self.private("private/create-order", params).await
    }

    pub async fn cancel_existing_order(&self, instrument: &str, order_id: &str) -> Result<()> {
        let params = object(&[("instrument_name", json!(instrument)), ("order_id", json!(order_id))]);
        let _: Value = self.private("private/cancel-order", params).await?;
        Ok(())
    }

    pub async fn cancel_all_orders_by_instrument(&self, instrument: &str) -> Result<()> {
        let _: Value = self
            .private("private/cancel-all-orders", object(&[("instrument_name", json!(instrument))]))
            .await?;
        Ok(())
    }

    pub async fn get_order_detail(&self, order_id: &str) -> Result<OrderInfo> {
        let detail: OrderDetail = self
            .private("private/get-order-detail", object(&[("order_id", json!(order_id))]))
            .await?;
        Ok(detail.order_info)
    }

    pub async fn get_open_orders(&self, instrument: &str) -> Result<Vec<OrderInfo>> {
        let params = object(&[
            ("instrument_name", json!(instrument)),
            ("page_size", json!(200)),
            ("page", json!(0)),
        ]);
        let list: OrderList = self.private("private/get-open-orders", params).await?;
        Ok(list.order_list)
    }

    pub async fn get_order_history(&self, instrument: &str, start_ms: Option<u64>, end_ms: Option<u64>) -> Result<Vec<OrderInfo>> {
        let params = object(&[
            ("instrument_name", json!(instrument)),
            ("start_ts", start_ms.map(Value::from).unwrap_or(Value::Null)),
            ("end_ts", end_ms.map(Value::from).unwrap_or(Value::Null)),
            ("page_size", json!(200)),
        ]);
        let list: OrderList = self.private("private/get-order-history", params).await?;
        Ok(list.order_list)
    }

    pub async fn get_deposit_address(&self, currency: &str) -> Result<Vec<DepositAddress>> {
        let list: DepositAddressList = self
            .private("private/get-deposit-address", object(&[("currency", json!(currency))]))
            .await?;
        Ok(list.deposit_address_list)
    }

    pub async fn create_withdrawal(
        &self,
        currency: &str,
        amount: Fixed,
        address: &str,
        address_tag: &str,
        client_wid: &str,
    ) -> Result<Withdrawal> {
        let params = object(&[
            ("currency", json!(currency)),
            ("amount", json!(amount.to_string_exact())),
            ("address", json!(address)),
            ("address_tag", json!(address_tag)),
            ("client_wid", json!(client_wid)),
        ]);
        self.private("private/create-withdrawal", params).await
    }

    pub async fn get_withdrawal_history(&self) -> Result<Vec<Transfer>> {
        let history: WithdrawalHistory = self
            .private("private/get-withdrawal-history", object(&[("page_size", json!(200))]))
            .await?;
        Ok(history.withdrawal_list)
    }

    pub async fn get_deposit_history(&self) -> Result<Vec<Transfer>> {
        let history: DepositHistory = self
            .private("private/get-deposit-history", object(&[("page_size", json!(200))]))
            .await?;
        Ok(history.deposit_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_sorted_recursively() {
        let params = json!({
            "side": "BUY",
            "instrument_name": "BTC_USDT",
            "price": 10000,
            "nested": {"b": 2, "a": null},
            "list": ["x", {"z": 1, "y": true}],
        });
        assert_eq!(
            params_to_string(&params),
            "instrument_nameBTC_USDTlistxytruez1nestedanullb2price10000sideBUY"
        );
    }

    #[test]
    fn test_empty_params() {
        assert_eq!(params_to_string(&json!({})), "");
        assert_eq!(params_to_string(&Value::Null), "");
    }

    #[test]
    fn test_signed_request_omits_empty_params() {
        let request = signed_request(METHOD_AUTH, 11, "key", b"secret", json!({}), 1587846358253).unwrap();
        assert!(request.get("params").is_none());
        assert_eq!(request["sig"], sign(b"secret", METHOD_AUTH, 11, "key", &json!({}), 1587846358253).unwrap());
        assert_eq!(request["sig"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn test_envelope_error_code() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"id":1,"method":"private/create-order","code":10004,"message":"BAD_REQUEST"}"#).unwrap();
        assert_eq!(check_envelope(envelope).unwrap_err(), ExchangeError::api(NAME, 10004, "BAD_REQUEST"));
    }
}
