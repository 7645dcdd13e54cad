//! LBank v2 REST endpoints
//!
//! Private calls are form POSTs. The sorted parameter string (including
//! `api_key`, `timestamp`, `signature_method` and a random `echostr`) is
//! MD5 hashed, uppercased and then signed with HMAC-SHA256.

use serde::de::DeserializeOwned;
use tradebridge_core::prelude::*;

use super::types::*;
use super::{Lbank, NAME, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, Method};
use crate::request::{Item, decode_body};
use crate::sign::{encode_query, hex_encode, hmac_sha256, md5_hex, sorted_query};

pub const LBANK_API_URL: &str = "https://api.lbkex.com";

const SIGNATURE_METHOD: &str = "HmacSHA256";
/// The venue accepts 30 to 40 characters
const ECHOSTR_LENGTH: usize = 35;

/// Error codes documented for the v2 API
const ERROR_CODES: &[(i64, &str)] = &[
    (10000, "Internal error"),
    (10001, "The required parameters can not be empty"),
    (10002, "Validation failed"),
    (10003, "Invalid parameter"),
    (10004, "Request too frequent"),
    (10005, "Secret key does not exist"),
    (10006, "User does not exist"),
    (10007, "Invalid signature"),
    (10008, "Invalid trading pair"),
    (10009, "Price and/or amount are required for limit order"),
    (10010, "Price and/or amount must be more than the minimum requirement"),
    (10013, "The amount is too small"),
    (10014, "Insufficient amount of money in account"),
    (10015, "Invalid order type"),
    (10016, "Insufficient account balance"),
    (10017, "Server error"),
    (10018, "Page size should be between 1 and 50"),
    (10019, "Cancel no more than 3 orders in one request"),
    (10020, "Volume < 0.001"),
    (10021, "Price < 0.01"),
    (10022, "Access denied"),
    (10023, "Market order is not supported yet"),
    (10024, "User cannot trade on this pair"),
    (10025, "Order has been filled"),
    (10026, "Order has been cancelled"),
    (10027, "Order is cancelling"),
    (10028, "Wrong query time"),
    (10029, "'from' is not in the query time"),
    (10030, "'from' does not match the transaction type of inquiry"),
    (10031, "echostr length must be from 30 to 40"),
    (10033, "Failed to create order"),
    (10036, "customID duplicated"),
    (10100, "Has no privilege to withdraw"),
    (10101, "Invalid fee rate to withdraw"),
    (10102, "Too little to withdraw"),
    (10103, "Exceeded daily withdrawal limit"),
    (10104, "Cancel was rejected"),
    (10105, "Request has been cancelled"),
    (10106, "None trade time"),
    (10107, "Start price exception"),
    (10108, "Can not create order"),
    (10109, "Wallet address is not mapping"),
    (10110, "Transfer fee is not mapping"),
    (10111, "Amount must be greater than zero"),
    (10112, "Fee is too low"),
    (10113, "Transfer fee is 0"),
    (10600, "Intercepted by replay attacks filter, check timestamp"),
    (10601, "Interface closed unavailable"),
    (10701, "Invalid asset code"),
    (10702, "Not allowed deposit"),
];

pub fn error_message(code: i64) -> &'static str {
    ERROR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or("Unknown error")
}

/// Hex HMAC-SHA256 of the uppercase MD5 of the sorted parameter string
pub fn sign(secret: &[u8], params: &[(String, String)]) -> Result<String> {
    let digest = md5_hex(sorted_query(params, false).as_bytes()).to_ascii_uppercase();
    Ok(hex_encode(&hmac_sha256(secret, digest.as_bytes())?))
}

fn check_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
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
    if !body.is_ok() {
        return Err(ExchangeError::api(NAME, body.error_code, error_message(body.error_code)));
    }
    serde_json::from_value(body.data).map_err(|e| ExchangeError::InvalidResponse(format!("{NAME}: {e}")))
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Lbank {
    async fn public<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let mut url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        check_response(self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await?)
    }

    async fn private<T: DeserializeOwned>(&self, path: &str, extra: Vec<(String, String)>) -> Result<T> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let timestamp = unix_millis().to_string();
        let echostr = generate_alphanumeric(ECHOSTR_LENGTH);
        let mut signed = vec![
            ("api_key".to_string(), creds.key.clone()),
            ("timestamp".to_string(), timestamp.clone()),
            ("signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("echostr".to_string(), echostr.clone()),
        ];
        signed.extend(extra);
        let signature = sign(creds.secret.as_bytes(), &signed)?;
        signed.push(("sign".to_string(), signature));

        let url = format!("{}{path}", self.base.api_url(UrlKind::RestSpot)?);
        let item = Item::new(Method::Post, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("timestamp", timestamp)
            .header("signature_method", SIGNATURE_METHOD)
            .header("echostr", echostr)
            .body(sorted_query(&signed, true))
            .limit(PRIVATE)
            .authenticated();
        check_response(self.base.requester.send_raw(item).await?)
    }

    pub async fn get_currency_pairs(&self) -> Result<Vec<String>> {
        self.public("/v2/currencyPairs.do", &[]).await
    }

    /// `symbol` may be `all`
    pub async fn get_ticker(&self, symbol: &str) -> Result<Vec<TickerRow>> {
        self.public("/v2/ticker.do", &params(&[("symbol", symbol)])).await
    }

    pub async fn get_depth(&self, symbol: &str, size: u32) -> Result<Depth> {
        let size = size.to_string();
        self.public("/v2/depth.do", &params(&[("symbol", symbol), ("size", &size)])).await
    }

    pub async fn get_trades(&self, symbol: &str, size: u32, since_ms: Option<u64>) -> Result<Vec<Trade>> {
        let size = size.to_string();
        let time = since_ms.map(|t| t.to_string()).unwrap_or_default();
        self.public("/v2/trades.do", &params(&[("symbol", symbol), ("size", &size), ("time", &time)]))
            .await
    }

    pub async fn get_user_info(&self) -> Result<UserInfo> {
        self.private("/v2/user_info.do", Vec::new()).await
    }

    /// `order_type` is `buy`, `sell`, `buy_market`, `sell_maker`, ...
    pub async fn create_order(&self, symbol: &str, order_type: &str, price: &str, amount: &str, custom_id: &str) -> Result<CreateOrderResult> {
        let extra = params(&[
            ("symbol", symbol),
            ("type", order_type),
            ("price", price),
            ("amount", amount),
            ("custom_id", custom_id),
        ]);
        self.private("/v2/create_order.do", extra).await
    }

    pub async fn remove_order(&self, symbol: &str, order_id: &str) -> Result<serde_json::Value> {
        self.private("/v2/cancel_order.do", params(&[("symbol", symbol), ("order_id", order_id)]))
            .await
    }

    pub async fn query_order(&self, symbol: &str, order_id: &str) -> Result<Vec<Order>> {
        self.private("/v2/orders_info.do", params(&[("symbol", symbol), ("order_id", order_id)]))
            .await
    }

    pub async fn get_open_orders(&self, symbol: &str, page: u32, page_length: u32) -> Result<OrderPage> {
        let (page, length) = (page.to_string(), page_length.to_string());
        let extra = params(&[("symbol", symbol), ("current_page", &page), ("page_length", &length)]);
        self.private("/v2/orders_info_no_deal.do", extra).await
    }

    pub async fn get_order_history(&self, symbol: &str, page: u32, page_length: u32) -> Result<OrderPage> {
        let (page, length) = (page.to_string(), page_length.to_string());
        let extra = params(&[("symbol", symbol), ("current_page", &page), ("page_length", &length)]);
        self.private("/v2/orders_info_history.do", extra).await
    }

    pub async fn withdraw(&self, coin: &str, address: &str, memo: &str, amount: Fixed, fee: Fixed) -> Result<WithdrawResult> {
        let amount = amount.to_string_exact();
        let fee = if fee.is_zero() { String::new() } else { fee.to_string_exact() };
        let extra = params(&[
            ("address", address),
            ("coin", coin),
            ("amount", &amount),
            ("memo", memo),
            ("fee", &fee),
        ]);
        self.private("/v2/withdraw.do", extra).await
    }

    pub async fn get_withdrawals(&self, asset_code: &str, page: u32) -> Result<WithdrawalPage> {
        let page = page.to_string();
        let extra = params(&[("assetCode", asset_code), ("pageNo", &page), ("pageSize", "100")]);
        self.private("/v2/withdraws.do", extra).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_uses_sorted_params() {
        let a = vec![
            ("symbol".to_string(), "eth_btc".to_string()),
            ("api_key".to_string(), "key".to_string()),
        ];
        let b = vec![
            ("api_key".to_string(), "key".to_string()),
            ("symbol".to_string(), "eth_btc".to_string()),
        ];
        let signature = sign(b"secret", &a).unwrap();
        assert_eq!(signature, sign(b"secret", &b).unwrap());
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_error_table() {
        assert_eq!(error_message(10008), "Invalid trading pair");
        assert_eq!(error_message(1), "Unknown error");
    }
}
