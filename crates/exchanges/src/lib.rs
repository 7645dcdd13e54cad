//! # TradeBridge Exchange Adapters
//!
//! REST (and, for Crypto.com, websocket) adapters for ten venues behind one
//! [`BotExchange`] trait.
//!
//! ## Architecture
//!
//! - **monoio-based HTTPS client** behind the [`HttpTransport`] trait, so
//!   tests swap in [`mock::MockTransport`]
//! - **governor rate limiting** per endpoint class in [`Requester`]
//! - **[`Base`]** holds credentials, endpoints, pair formats and features
//! - **Fixed-point arithmetic** for every price and amount
//! - **Managed websocket streams** with fixed-delay reconnect

pub mod asset;
pub mod config;
pub mod credentials;
pub mod currency;
pub mod endpoints;
pub mod errors;
pub mod exchange;
pub mod fee;
pub mod http;
pub mod order;
pub mod orderbook;
pub mod pairs;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod sign;
pub mod store;
pub mod stream;
pub mod traits;
pub mod types;
pub mod websocket;
pub mod withdraw;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub mod bitfinex;
pub mod btcmarkets;
pub mod btse;
pub mod coinbasepro;
pub mod cryptocom;
pub mod gemini;
pub mod huobi;
pub mod kraken;
pub mod lbank;
pub mod zb;

pub use asset::Asset;
pub use config::{Config, ExchangeConfig};
pub use currency::{Pair, PairFormat};
pub use errors::{ExchangeError, Result};
pub use exchange::Base;
pub use http::{HttpTransport, MonoioHttpsClient};
pub use registry::{new_exchange, supported_exchanges};
pub use request::Requester;
pub use traits::BotExchange;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::asset::Asset;
    pub use crate::config::{Config, ExchangeConfig};
    pub use crate::currency::{Pair, PairFormat, PairList};
    pub use crate::errors::{ExchangeError, Result};
    pub use crate::exchange::Base;
    pub use crate::fee::{FeeBuilder, FeeType};
    pub use crate::order::{
        Cancel, CancelAllResponse, Detail, GetOrdersRequest, OrderType, Side, Status, Submit,
        SubmitResponse,
    };
    pub use crate::orderbook::{Level, Orderbook};
    pub use crate::registry::{new_exchange, supported_exchanges};
    pub use crate::traits::BotExchange;
    pub use crate::types::{Balance, Holdings, Ticker, TradeData};
    pub use crate::withdraw::{WithdrawPermissions, WithdrawRequest, WithdrawResponse};
    pub use tradebridge_core::prelude::*;
}
