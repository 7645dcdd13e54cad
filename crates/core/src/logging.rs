//! Logging initialisation
//!
//! All crates log through `tracing`. Binaries and tests call
//! [`init_logging`] once; `RUST_LOG` controls the filter (default `info`).

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .finish();

        // Another subscriber may already be installed by the host application
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::info!("📝 Initialized tracing logging");
        }
    });
}

/// Log an order lifecycle event, with side and amount when known
#[macro_export]
macro_rules! log_order {
    ($exchange:expr, $action:expr, $order_id:expr, $pair:expr) => {
        tracing::info!("📝 {} order {} {} ({})", $exchange, $order_id, $action, $pair)
    };
    ($exchange:expr, $action:expr, $order_id:expr, $pair:expr, $side:expr, $amount:expr) => {
        tracing::info!("📝 {} order {} {}: {} {} {}", $exchange, $order_id, $action, $side, $amount, $pair)
    };
}
