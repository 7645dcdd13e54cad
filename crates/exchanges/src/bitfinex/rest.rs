//! Bitfinex v2 REST endpoints

use serde_json::{Value, json};
use tradebridge_core::prelude::*;

use super::types::*;
use super::{Bitfinex, NAME, PRIVATE, PUBLIC};
use crate::endpoints::UrlKind;
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpResponse, Method};
use crate::request::{Item, decode_body};
use crate::sign::{hex_encode, hmac_sha384};

pub const BITFINEX_PUBLIC_URL: &str = "https://api-pub.bitfinex.com/v2";
pub const BITFINEX_AUTH_URL: &str = "https://api.bitfinex.com/v2";

/// `bfx-signature`: hex HMAC-SHA384 over `/api/v2/<path><nonce><body>`
pub fn sign(secret: &[u8], path: &str, nonce: &str, body: &str) -> Result<String> {
    let payload = format!("/api/v2/{path}{nonce}{body}");
    Ok(hex_encode(&hmac_sha384(secret, payload.as_bytes())?))
}

/// Errors come back as `["error", CODE, "message"]`
fn check_response(response: HttpResponse) -> Result<Value> {
    let value: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) if !response.is_success() => {
            return Err(ExchangeError::HttpError {
                status: response.status,
                body: response.body,
            });
        }
        Err(_) => return decode_body(NAME, &response.body),
    };
    if let Some(row) = value.as_array() {
        if row.first().and_then(Value::as_str) == Some("error") {
            let code = row.get(1).map(Value::to_string).unwrap_or_default();
            let message = row.get(2).and_then(Value::as_str).unwrap_or_default();
            return Err(ExchangeError::api(NAME, code, message));
        }
    }
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Err(ExchangeError::api(NAME, response.status, message));
    }
    if !response.is_success() {
        return Err(ExchangeError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    Ok(value)
}

/// Write endpoints wrap their result in a notification; reject anything but SUCCESS
fn notification(value: &Value) -> Result<Notification> {
    let note = Notification::from_value(value)?;
    if !note.is_success() {
        return Err(ExchangeError::api(NAME, note.status, note.text));
    }
    Ok(note)
}

impl Bitfinex {
    async fn public(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{path}", self.base.api_url(UrlKind::RestSpot)?);
        let response = self.base.requester.send_raw(Item::get(url).limit(PUBLIC)).await?;
        check_response(response)
    }

    async fn private(&self, path: &str, body: Value) -> Result<Value> {
        self.base.check_authenticated()?;
        let creds = self.base.credentials();

        let nonce = self.nonce.next_string();
        let body = body.to_string();
        let signature = sign(creds.secret.as_bytes(), path, &nonce, &body)?;

        let url = format!("{}/{path}", self.base.api_url(UrlKind::RestSpotSupplementary)?);
        let item = Item::new(Method::Post, url)
            .header("Content-Type", "application/json")
            .header("bfx-nonce", nonce)
            .header("bfx-apikey", creds.key.clone())
            .header("bfx-signature", signature)
            .body(body)
            .limit(PRIVATE)
            .authenticated();
        let response = self.base.requester.send_raw(item).await?;
        check_response(response)
    }

    /// Exchange pair names without the `t` prefix
    pub async fn get_pairs(&self) -> Result<Vec<String>> {
        let value = self.public("conf/pub:list:pair:exchange").await?;
        let names = value
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} pair listing: {value}")))?;
        Ok(names.iter().filter_map(Value::as_str).map(str::to_string).collect())
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<TickerRow> {
        let value = self.public(&format!("ticker/{symbol}")).await?;
        let row = value
            .as_array()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} ticker: {value}")))?;
        TickerRow::from_row(row, 0)
    }

    /// `(symbol, ticker)` for every trading pair; funding tickers are skipped
    pub async fn get_tickers(&self, symbols: &[String]) -> Result<Vec<(String, TickerRow)>> {
        let filter = if symbols.is_empty() { "ALL".to_string() } else { symbols.join(",") };
        let value = self.public(&format!("tickers?symbols={filter}")).await?;
        let mut out = Vec::new();
        for entry in value.as_array().into_iter().flatten() {
            let Some(row) = entry.as_array() else { continue };
            let symbol = row.first().and_then(Value::as_str).unwrap_or_default();
            if !symbol.starts_with('t') {
                continue;
            }
            out.push((symbol.to_string(), TickerRow::from_row(row, 1)?));
        }
        Ok(out)
    }

    pub async fn get_orderbook(&self, symbol: &str, len: u32) -> Result<Vec<BookRow>> {
        let value = self.public(&format!("book/{symbol}/P0?len={len}")).await?;
        rows(&value, BookRow::from_value)
    }

    pub async fn get_trades(&self, symbol: &str, start_ms: Option<u64>, end_ms: Option<u64>) -> Result<Vec<TradeRow>> {
        let mut path = format!("trades/{symbol}/hist?limit=10000&sort=-1");
        if let Some(start) = start_ms {
            path.push_str(&format!("&start={start}"));
        }
        if let Some(end) = end_ms {
            path.push_str(&format!("&end={end}"));
        }
        let value = self.public(&path).await?;
        rows(&value, TradeRow::from_value)
    }

    pub async fn get_wallets(&self) -> Result<Vec<WalletRow>> {
        let value = self.private("auth/r/wallets", json!({})).await?;
        rows(&value, WalletRow::from_value)
    }

    pub async fn submit(&self, body: Value) -> Result<OrderRow> {
        let value = self.private("auth/w/order/submit", body).await?;
        let note = notification(&value)?;
        note.data
            .get(0)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{NAME} submit returned no order")))
            .and_then(OrderRow::from_value)
    }

    pub async fn cancel_by_id(&self, id: i64) -> Result<OrderRow> {
        let value = self.private("auth/w/order/cancel", json!({ "id": id })).await?;
        OrderRow::from_value(&notification(&value)?.data)
    }

    /// Cancelled orders
    pub async fn cancel_all(&self) -> Result<Vec<OrderRow>> {
        let value = self.private("auth/w/order/cancel/multi", json!({ "all": 1 })).await?;
        rows(&notification(&value)?.data, OrderRow::from_value)
    }

    pub async fn get_active_orders(&self, symbol: Option<&str>, ids: &[i64]) -> Result<Vec<OrderRow>> {
        let path = match symbol {
            Some(symbol) => format!("auth/r/orders/{symbol}"),
            None => "auth/r/orders".to_string(),
        };
        let body = if ids.is_empty() { json!({}) } else { json!({ "id": ids }) };
        let value = self.private(&path, body).await?;
        rows(&value, OrderRow::from_value)
    }

    pub async fn get_order_history(&self, symbol: Option<&str>, ids: &[i64]) -> Result<Vec<OrderRow>> {
        let path = match symbol {
            Some(symbol) => format!("auth/r/orders/{symbol}/hist"),
            None => "auth/r/orders/hist".to_string(),
        };
        let body = if ids.is_empty() { json!({}) } else { json!({ "id": ids }) };
        let value = self.private(&path, body).await?;
        rows(&value, OrderRow::from_value)
    }

    pub async fn get_deposit_address(&self, method: &str, renew: bool) -> Result<String> {
        let body = json!({ "wallet": "exchange", "method": method, "op_renew": i32::from(renew) });
        let value = self.private("auth/w/deposit/address", body).await?;
        let note = notification(&value)?;
        note.data
            .get(4)
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ExchangeError::EndpointError(format!("{NAME} returned no {method} address")))
    }

    /// Withdrawal id
    pub async fn withdraw(&self, method: &str, amount: Fixed, address: &str, payment_id: &str) -> Result<i64> {
        let mut body = json!({
            "wallet": "exchange",
            "method": method,
            "amount": amount.to_string_exact(),
            "address": address,
        });
        if !payment_id.is_empty() {
            body["payment_id"] = json!(payment_id);
        }
        let value = self.private("auth/w/withdraw", body).await?;
        let note = notification(&value)?;
        Ok(note.data.get(0).and_then(Value::as_i64).unwrap_or_default())
    }

    pub async fn get_movements(&self) -> Result<Vec<MovementRow>> {
        let value = self.private("auth/r/movements/hist", json!({})).await?;
        rows(&value, MovementRow::from_value)
    }
}
