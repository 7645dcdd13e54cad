//! # TradeBridge Core
//!
//! Shared building blocks for the exchange adapters.
//!
//! ## Contents
//!
//! 1. **Timing** - nanosecond timestamps and request latency timers
//! 2. **Fixed-point arithmetic** - exact decimals for prices and amounts
//! 3. **Logging** - `tracing` subscriber setup and helper macros
//! 4. **ID generation** - nanoid client ids and monotonic request nonces

pub mod fixed;
pub mod id_gen;
pub mod logging;
pub mod timing;

// Re-export commonly used items
pub use fixed::{Fixed, FixedError};
pub use id_gen::{Nonce, NonceUnit, generate_alphanumeric, generate_client_order_id, generate_id};
pub use logging::init_logging;
pub use timing::{PerfTimer, Timestamp, nanos, unix_millis, unix_secs};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixed::{Fixed, FixedError};
    pub use crate::id_gen::{Nonce, NonceUnit, generate_alphanumeric, generate_client_order_id, generate_id};
    pub use crate::log_order;
    pub use crate::logging::init_logging;
    pub use crate::timing::{PerfTimer, Timestamp, nanos, unix_millis, unix_secs};

    // Common external types
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
