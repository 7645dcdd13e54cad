//! Capability flags an adapter advertises

use serde::{Deserialize, Serialize};

use crate::withdraw::WithdrawPermissions;

/// What a transport (REST or websocket) can do for this venue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolFeatures {
    pub ticker_fetching: bool,
    pub ticker_batching: bool,
    pub orderbook_fetching: bool,
    pub trade_fetching: bool,
    pub account_info: bool,
    pub submit_order: bool,
    pub cancel_order: bool,
    pub cancel_orders: bool,
    pub get_order: bool,
    pub get_orders: bool,
    pub user_trade_history: bool,
    pub crypto_deposit: bool,
    pub crypto_withdrawal: bool,
    pub fiat_withdraw: bool,
    pub deposit_history: bool,
    pub withdrawal_history: bool,
    pub trade_fee: bool,
    pub crypto_withdrawal_fee: bool,
    pub subscribe: bool,
    pub unsubscribe: bool,
    pub authenticated_endpoints: bool,
    pub message_correlation: bool,
    pub modify_order: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSupport {
    pub rest: bool,
    pub websocket: bool,
    pub rest_capabilities: ProtocolFeatures,
    pub websocket_capabilities: ProtocolFeatures,
    pub withdraw_permissions: WithdrawPermissions,
}

/// Features the user may toggle in config. Both default on; setup turns
/// the websocket toggle off for adapters without a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub auto_pair_updates: bool,
    pub websocket_api: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            auto_pair_updates: true,
            websocket_api: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub supports: FeatureSupport,
    pub enabled: FeatureToggles,
}

impl Features {
    /// REST-only adapter with the given capabilities
    pub fn rest(capabilities: ProtocolFeatures, withdraw_permissions: WithdrawPermissions) -> Self {
        Self {
            supports: FeatureSupport {
                rest: true,
                rest_capabilities: capabilities,
                withdraw_permissions,
                ..Default::default()
            },
            enabled: FeatureToggles {
                auto_pair_updates: true,
                websocket_api: false,
            },
        }
    }

    pub fn with_websocket(mut self, capabilities: ProtocolFeatures) -> Self {
        self.supports.websocket = true;
        self.supports.websocket_capabilities = capabilities;
        self
    }
}
