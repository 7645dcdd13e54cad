//! ID and nonce generation
//!
//! Client order ids come from nanoid; signed requests need a strictly
//! increasing nonce per credential set, which [`Nonce`] provides.

use nanoid::nanoid;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::timing::nanos;

/// Alphanumeric alphabet; several venues reject `-` and `_` in client ids
const ALPHANUMERIC: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Generate a unique ID using nanoid
pub fn generate_id() -> String {
    nanoid!(12)
}

/// Generate an alphanumeric id of the given length
pub fn generate_alphanumeric(length: usize) -> String {
    nanoid!(length, &ALPHANUMERIC)
}

/// Generate a client order id with a prefix, e.g. `tb-3fK9aQ0LmZ2x`
pub fn generate_client_order_id(prefix: &str) -> String {
    format!("{prefix}-{}", generate_alphanumeric(12))
}

/// Time unit a venue expects its nonce in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceUnit {
    Millis,
    Micros,
    Nanos,
}

/// Monotonic request nonce seeded from the wall clock.
///
/// Every call returns a value strictly greater than the previous one even
/// when two requests are signed within the same clock tick.
#[derive(Debug)]
pub struct Nonce {
    last: AtomicU64,
    unit: NonceUnit,
}

impl Nonce {
    pub fn new(unit: NonceUnit) -> Self {
        Self {
            last: AtomicU64::new(0),
            unit,
        }
    }

    fn clock(&self) -> u64 {
        let now = nanos();
        match self.unit {
            NonceUnit::Millis => now / 1_000_000,
            NonceUnit::Micros => now / 1_000,
            NonceUnit::Nanos => now,
        }
    }

    /// Next nonce value
    pub fn next(&self) -> u64 {
        let now = self.clock();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }

    /// Next nonce value as a decimal string
    pub fn next_string(&self) -> String {
        self.next().to_string()
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new(NonceUnit::Millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id() {
        let id1 = generate_id();
        let id2 = generate_id();

        assert_eq!(id1.len(), 12);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_alphanumeric() {
        let id = generate_alphanumeric(35);
        assert_eq!(id.len(), 35);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_client_order_id() {
        let id = generate_client_order_id("tb");
        assert!(id.starts_with("tb-"));
        assert_eq!(id.len(), 15);
    }

    #[test]
    fn test_nonce_strictly_increasing() {
        let nonce = Nonce::new(NonceUnit::Millis);
        let mut previous = 0;
        for _ in 0..1000 {
            let next = nonce.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_nonce_units() {
        let millis = Nonce::new(NonceUnit::Millis).next();
        let micros = Nonce::new(NonceUnit::Micros).next();
        assert!(micros / millis >= 999);
    }

    #[test]
    fn test_id_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            assert!(ids.insert(generate_id()), "Duplicate ID generated");
        }
    }
}
