//! ZB REST endpoints
//!
//! Market data lives under `/data/v1` on the spot host. Trading calls are
//! GETs on the trade host: the sorted query (with `accesskey` and `method`)
//! is signed with HMAC-MD5 keyed by the hex SHA1 of the secret, then
//! `sign` and `reqTime` are appended.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tradebridge_core::prelude::*;

use super::types::*;
use super::{NAME, PRIVATE, PUBLIC, Zb};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::HttpResponse;
use crate::request::{Item, decode_body};
use crate::sign::{encode_query, hex_encode, hmac_md5, sha1_hex, sorted_query};

pub const ZB_API_URL: &str = "https://api.zb.com";
pub const ZB_TRADE_URL: &str = "https://trade.zb.com";

pub const SUCCESS: i64 = 1000;
/// Returned by order listings when nothing is open
pub const NO_ORDERS: i64 = 3001;

const ERROR_CODES: &[(i64, &str)] = &[
    (1001, "General error"),
    (1002, "Internal error"),
    (1003, "Validation failed"),
    (1004, "Fund security password locked"),
    (1005, "Fund security password incorrect"),
    (1006, "Real-name verification pending"),
    (1009, "Interface under maintenance"),
    (2001, "Insufficient CNY balance"),
    (2002, "Insufficient BTC balance"),
    (2003, "Insufficient LTC balance"),
    (2005, "Insufficient ETH balance"),
    (2006, "Insufficient ETC balance"),
    (2007, "Insufficient BTS balance"),
    (2009, "Insufficient account balance"),
    (3001, "Pending order not found"),
    (3002, "Invalid amount"),
    (3003, "Invalid quantity"),
    (3004, "User does not exist"),
    (3005, "Invalid parameter"),
    (3006, "Invalid IP or not the bound IP"),
    (3007, "Request time has expired"),
    (3008, "Transaction record not found"),
    (3009, "Price exceeds the limit"),
    (3011, "Entrusted price is abnormal"),
    (4001, "API interface is locked or not enabled"),
    (4002, "Request too frequent"),
];

pub fn error_message(code: i64) -> &'static str {
    ERROR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or("Unknown error")
}

/// Hex HMAC-MD5 of the sorted query, keyed with the hex SHA1 of the secret
pub fn sign(secret: &[u8], query: &str) -> Result<String> {
    let key = sha1_hex(secret);
    Ok(hex_encode(&hmac_md5(key.as_bytes(), query.as_bytes())?))
}

/// Trade endpoints answer `{code, message}` on failure and sometimes on
/// success; market endpoints answer `{error}` on failure
fn check<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let value: Value = match decode_body(NAME, &response.body) {
        Ok(value) => value,
        Err(_) if !response.is_success() => {
            return Err(ExchangeError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        Err(e) => return Err(e),
    };
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(ExchangeError::api(NAME, "error", error));
    }
    if value.get("code").is_some() {
        let status: Ack = serde_json::from_value(value.clone())?;
        if status.code != SUCCESS {
            let text = status.text();
            let message = if text.is_empty() { error_message(status.code).to_string() } else { text };
            return Err(ExchangeError::api(NAME, status.code, message));
        }
    }
    serde_json::from_value(value).map_err(|e| ExchangeError::InvalidResponse(format!("{NAME}: {e}")))
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Zb {
    async fn public<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let mut url = format!("{}/data/v1/{path}", self.base.api_url(UrlKind::RestSpot)?);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        check(self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await?)
    }

    async fn private<T: DeserializeOwned>(&self, method: &str, extra: Vec<(String, String)>) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let mut query = vec![
            ("accesskey".to_string(), creds.key.clone()),
            ("method".to_string(), method.to_string()),
        ];
        query.extend(extra);
        let sorted = sorted_query(&query, true);
        let signature = sign(creds.secret.as_bytes(), &sorted)?;

        let url = format!(
            "{}/api/{method}?{sorted}&sign={signature}&reqTime={}",
            self.base.api_url(UrlKind::RestSpotSupplementary)?,
            unix_millis()
        );
        let item = Item::get(url).limit(PRIVATE).authenticated();
        check(self.base.requester.send_raw(item).await?)
    }

    pub async fn get_markets(&self) -> Result<Markets> {
        self.public("markets", &[]).await
    }

    pub async fn get_ticker(&self, market: &str) -> Result<TickerResponse> {
        self.public("ticker", &params(&[("market", market)])).await
    }

    pub async fn get_all_tickers(&self) -> Result<AllTickers> {
        self.public("allTicker", &[]).await
    }

    pub async fn get_depth(&self, market: &str, size: u32) -> Result<Depth> {
        let size = size.to_string();
        self.public("depth", &params(&[("market", market), ("size", &size)])).await
    }

    pub async fn get_trades(&self, market: &str) -> Result<Vec<Trade>> {
        self.public("trades", &params(&[("market", market)])).await
    }

    pub async fn get_account_info(&self) -> Result<AccountInfo> {
        self.private("getAccountInfo", Vec::new()).await
    }

    /// `trade_type` is 1 for buy and 0 for sell
    pub async fn place_order(&self, market: &str, price: Fixed, amount: Fixed, trade_type: u8) -> Result<IdResult> {
        let (price, amount, trade_type) = (price.to_string_exact(), amount.to_string_exact(), trade_type.to_string());
        let extra = params(&[
            ("amount", &amount),
            ("currency", market),
            ("price", &price),
            ("tradeType", &trade_type),
        ]);
        self.private("order", extra).await
    }

    pub async fn remove_order(&self, market: &str, order_id: &str) -> Result<Ack> {
        self.private("cancelOrder", params(&[("currency", market), ("id", order_id)]))
            .await
    }

    pub async fn get_order(&self, market: &str, order_id: &str) -> Result<Order> {
        self.private("getOrder", params(&[("currency", market), ("id", order_id)]))
            .await
    }

    /// An empty book comes back as code 3001 and is reported as no orders
    pub async fn get_unfinished_orders(&self, market: &str, page: u32, page_size: u32) -> Result<Vec<Order>> {
        let (page, size) = (page.to_string(), page_size.to_string());
        let extra = params(&[("currency", market), ("pageIndex", &page), ("pageSize", &size)]);
        match self.private("getUnfinishedOrdersIgnoreTradeType", extra).await {
            Err(ExchangeError::ApiError { code, .. }) if code == NO_ORDERS.to_string() => Ok(Vec::new()),
            other => other,
        }
    }

    pub async fn get_orders(&self, market: &str, page: u32, page_size: u32) -> Result<Vec<Order>> {
        let (page, size) = (page.to_string(), page_size.to_string());
        let extra = params(&[("currency", market), ("pageIndex", &page), ("pageSize", &size)]);
        match self.private("getOrdersIgnoreTradeType", extra).await {
            Err(ExchangeError::ApiError { code, .. }) if code == NO_ORDERS.to_string() => Ok(Vec::new()),
            other => other,
        }
    }

    pub async fn get_user_address(&self, currency: &str) -> Result<String> {
        let wrapped: Wrapped<AddressData> = self
            .private("getUserAddress", params(&[("currency", currency)]))
            .await?;
        Ok(wrapped.message.datas.key)
    }

    pub async fn withdraw(&self, currency: &str, address: &str, safe_password: &str, amount: Fixed, fees: Fixed) -> Result<IdResult> {
        let (amount, fees) = (amount.to_string_exact(), fees.to_string_exact());
        let extra = params(&[
            ("amount", &amount),
            ("currency", currency),
            ("fees", &fees),
            ("itransfer", "0"),
            ("receiveAddr", address),
            ("safePwd", safe_password),
        ]);
        self.private("withdraw", extra).await
    }

    pub async fn get_withdraw_records(&self, currency: &str) -> Result<Vec<WithdrawRecord>> {
        let extra = params(&[("currency", currency), ("pageIndex", "1"), ("pageSize", "50")]);
        let wrapped: Wrapped<RecordList<WithdrawRecord>> = self.private("getWithdrawRecord", extra).await?;
        Ok(wrapped.message.datas.list)
    }

    pub async fn get_charge_records(&self, currency: &str) -> Result<Vec<ChargeRecord>> {
        let extra = params(&[("currency", currency), ("pageIndex", "1"), ("pageSize", "50")]);
        let wrapped: Wrapped<RecordList<ChargeRecord>> = self.private("getChargeRecord", extra).await?;
        Ok(wrapped.message.datas.list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_keyed_with_sha1_of_secret() {
        let query = "accesskey=key&method=getAccountInfo";
        let signature = sign(b"secret", query).unwrap();
        assert_eq!(signature.len(), 32);
        let direct = hex_encode(&hmac_md5(b"secret", query.as_bytes()).unwrap());
        assert_ne!(signature, direct);
    }

    #[test]
    fn test_check_maps_codes() {
        let response = |body: &str| HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        };
        let err = check::<IdResult>(response(r#"{"code":2009,"message":""}"#)).unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, 2009, "Insufficient account balance"));

        let err = check::<Depth>(response(r#"{"error":"market not exist"}"#)).unwrap_err();
        assert_eq!(err, ExchangeError::api(NAME, "error", "market not exist"));

        let ok = check::<IdResult>(response(r#"{"code":1000,"message":"ok","id":"201805"}"#)).unwrap();
        assert_eq!(ok.id, "201805");
    }
}
