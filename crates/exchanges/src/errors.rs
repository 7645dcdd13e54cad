//! Exchange error types
//!
//! One error enum for every adapter. Venue-reported failures surface as
//! [`ExchangeError::ApiError`] carrying the venue's own code and message;
//! no adapter retries on its own.

use thiserror::Error;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Exchange operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{exchange} API error {code}: {message}")]
    ApiError {
        exchange: String,
        code: String,
        message: String,
    },

    #[error("{0} authenticated HTTP request called but not supported due to unset/default API keys")]
    AuthenticationSupportNotEnabled(String),

    #[error("{exchange} missing credential: {field}")]
    MissingCredentials { exchange: String, field: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Currency pair is empty")]
    PairIsEmpty,

    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("Pair format error: {0}")]
    PairFormatError(String),

    #[error("Asset type {0} not supported")]
    AssetNotSupported(String),

    #[error("Order side is invalid: {0}")]
    SideIsInvalid(String),

    #[error("Order type is invalid: {0}")]
    TypeIsInvalid(String),

    #[error("Order amount must be greater than zero")]
    AmountIsInvalid,

    #[error("Order price must be set if limit order type is desired")]
    PriceMustBeSetIfLimitOrder,

    #[error("Order id not set")]
    OrderIdNotSet,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid withdrawal request: {0}")]
    InvalidWithdrawRequest(String),

    #[error("Endpoint error: {0}")]
    EndpointError(String),

    #[error("Orderbook verification failed: {0}")]
    OrderbookInvalid(String),

    #[error("No data stored for {0}")]
    NoDataStored(String),

    #[error("Exchange not supported: {0}")]
    ExchangeNotSupported(String),

    #[error("Websocket not connected: {0}")]
    WebsocketNotConnected(String),

    #[error("{0} websocket API is not enabled")]
    WebsocketNotEnabled(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Fixed point error: {0}")]
    FixedPointError(String),

    #[error("not yet implemented")]
    NotYetImplemented,

    #[error("unsupported")]
    FunctionNotSupported,
}

impl ExchangeError {
    /// Build a venue API error
    pub fn api(exchange: &str, code: impl ToString, message: impl Into<String>) -> Self {
        Self::ApiError {
            exchange: exchange.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn missing_credential(exchange: &str, field: &str) -> Self {
        Self::MissingCredentials {
            exchange: exchange.to_string(),
            field: field.to_string(),
        }
    }
}

impl From<tradebridge_core::fixed::FixedError> for ExchangeError {
    fn from(err: tradebridge_core::fixed::FixedError) -> Self {
        Self::FixedPointError(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ExchangeError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<base64::DecodeError> for ExchangeError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidCredentials(format!("secret is not valid base64: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_messages() {
        assert_eq!(ExchangeError::NotYetImplemented.to_string(), "not yet implemented");
        assert_eq!(ExchangeError::FunctionNotSupported.to_string(), "unsupported");
    }

    #[test]
    fn test_api_error_display() {
        let err = ExchangeError::api("Bitfinex", 10020, "symbol: invalid");
        assert_eq!(err.to_string(), "Bitfinex API error 10020: symbol: invalid");
    }
}
