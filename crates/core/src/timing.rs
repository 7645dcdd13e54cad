//! Timestamps and request timing
//!
//! Exchange APIs disagree on time units: Coinbase Pro signs with seconds,
//! BTCMarkets and BTSE with milliseconds, Bitfinex nonces are microseconds.
//! [`Timestamp`] keeps nanoseconds internally and converts at the edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanosecond timestamp since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since Unix epoch
    pub nanos: u64,
}

impl Timestamp {
    /// Create a new timestamp from nanoseconds since Unix epoch
    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create a timestamp from milliseconds since Unix epoch
    pub fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Create a timestamp from seconds since Unix epoch
    pub fn from_secs(secs: u64) -> Self {
        Self {
            nanos: secs.saturating_mul(1_000_000_000),
        }
    }

    /// Create a timestamp from fractional seconds, as used by Kraken and Gemini
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_sign_negative() || !secs.is_finite() {
            return Self::default();
        }
        Self {
            nanos: (secs * 1_000_000_000.0) as u64,
        }
    }

    /// Parse an RFC 3339 timestamp such as `2020-05-01T10:22:43.123Z`
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self::from(dt.with_timezone(&Utc)))
    }

    /// Create a timestamp from the current time
    pub fn now() -> Self {
        Self { nanos: nanos() }
    }

    pub fn as_millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    pub fn as_secs(&self) -> u64 {
        self.nanos / 1_000_000_000
    }

    /// Whether the timestamp has never been set
    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    /// Convert to chrono DateTime<Utc>
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.nanos / 1_000_000_000;
        let nsecs = (self.nanos % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs as i64, nsecs).unwrap_or_default()
    }

    /// Get elapsed time since this timestamp in nanoseconds
    pub fn elapsed_nanos(&self) -> u64 {
        nanos().saturating_sub(self.nanos)
    }

    /// Get elapsed time since this timestamp in microseconds
    pub fn elapsed_micros(&self) -> u64 {
        self.elapsed_nanos() / 1_000
    }

    /// Get elapsed time since this timestamp in milliseconds
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed_nanos() / 1_000_000
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp().max(0) as u64;
        Self {
            nanos: secs * 1_000_000_000 + dt.timestamp_subsec_nanos() as u64,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.9f UTC"))
    }
}

/// Current time in nanoseconds since the Unix epoch
#[inline]
pub fn nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Current time in milliseconds since the Unix epoch
#[inline]
pub fn unix_millis() -> u64 {
    nanos() / 1_000_000
}

/// Current time in whole seconds since the Unix epoch
#[inline]
pub fn unix_secs() -> u64 {
    nanos() / 1_000_000_000
}

/// Performance measurement utilities
pub struct PerfTimer {
    start: Timestamp,
    name: String,
}

impl PerfTimer {
    /// Start a new performance timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Timestamp::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in microseconds
    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed_micros()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> u64 {
        self.start.elapsed_millis()
    }

    /// Log the elapsed time
    pub fn log_elapsed(&self) {
        let micros = self.elapsed_micros();
        if micros < 1000 {
            tracing::debug!("⏱️  {} took {}μs", self.name, micros);
        } else {
            tracing::debug!("⏱️  {} took {:.3}ms", self.name, micros as f64 / 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timestamp_creation() {
        let ts1 = Timestamp::now();
        thread::sleep(Duration::from_millis(1));
        let ts2 = Timestamp::now();

        assert!(ts2.nanos > ts1.nanos);
    }

    #[test]
    fn test_unit_conversions() {
        let ts = Timestamp::from_millis(1_588_328_563_123);
        assert_eq!(ts.as_secs(), 1_588_328_563);
        assert_eq!(ts.as_millis(), 1_588_328_563_123);

        let ts = Timestamp::from_secs_f64(1_588_328_563.5);
        assert_eq!(ts.as_millis(), 1_588_328_563_500);

        assert!(Timestamp::from_secs_f64(-1.0).is_zero());
    }

    #[test]
    fn test_rfc3339() {
        let ts = Timestamp::parse_rfc3339("2020-05-01T10:22:43.123Z").unwrap();
        assert_eq!(ts.as_millis(), 1_588_328_563_123);
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn test_timestamp_conversion() {
        let now = Utc::now();
        let ts = Timestamp::from(now);
        let converted = ts.to_datetime();

        let diff = (now.timestamp() - converted.timestamp()).abs();
        assert!(diff <= 1);
    }

    #[test]
    fn test_perf_timer() {
        let timer = PerfTimer::start("test");
        thread::sleep(Duration::from_millis(1));
        let elapsed = timer.elapsed_micros();

        assert!(elapsed > 500);
    }
}
