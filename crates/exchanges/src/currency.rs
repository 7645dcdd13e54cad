//! Currency pairs and the formats venues expect them in
//!
//! A [`Pair`] is stored in canonical upper case. Each venue renders pairs
//! through a [`PairFormat`]: Coinbase Pro wants `BTC-USD`, Huobi `btcusdt`,
//! Crypto.com `BTC_USDT`. Symbols without a delimiter are split using the
//! format's `index` currency or against the list of known pairs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{ExchangeError, Result};

pub const DASH_DELIMITER: &str = "-";
pub const UNDERSCORE_DELIMITER: &str = "_";
pub const FORWARD_SLASH_DELIMITER: &str = "/";
pub const COLON_DELIMITER: &str = ":";

const KNOWN_DELIMITERS: [&str; 4] = [
    DASH_DELIMITER,
    UNDERSCORE_DELIMITER,
    FORWARD_SLASH_DELIMITER,
    COLON_DELIMITER,
];

/// How a venue spells a pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFormat {
    #[serde(default)]
    pub uppercase: bool,
    #[serde(default)]
    pub delimiter: String,
    /// Joins several pairs in one request, e.g. `,` for batch tickers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub separator: String,
    /// Quote currency used to split delimiter-less symbols
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
}

impl PairFormat {
    pub fn new(uppercase: bool, delimiter: &str) -> Self {
        Self {
            uppercase,
            delimiter: delimiter.to_string(),
            ..Default::default()
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }
}

/// A base/quote currency pair
#[derive(Debug, Clone, Default)]
pub struct Pair {
    pub base: String,
    pub quote: String,
    pub delimiter: String,
}

impl Pair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self::with_delimiter(base, quote, DASH_DELIMITER)
    }

    pub fn with_delimiter(base: &str, quote: &str, delimiter: &str) -> Self {
        Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
            delimiter: delimiter.to_string(),
        }
    }

    /// Split `symbol` on `delimiter`
    pub fn from_delimited(symbol: &str, delimiter: &str) -> Result<Self> {
        if delimiter.is_empty() {
            return Err(ExchangeError::PairFormatError(
                "delimiter cannot be empty".to_string(),
            ));
        }
        let mut parts = symbol.split(delimiter);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::with_delimiter(base, quote, delimiter))
            }
            _ => Err(ExchangeError::InvalidPair(format!(
                "{symbol} cannot be split on {delimiter:?}"
            ))),
        }
    }

    /// Parse a symbol using any common delimiter, falling back to a
    /// three-character base currency
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        for delimiter in KNOWN_DELIMITERS {
            if symbol.contains(delimiter) {
                return Self::from_delimited(symbol, delimiter);
            }
        }
        if symbol.len() < 6 || !symbol.is_ascii() {
            return Err(ExchangeError::InvalidPair(format!(
                "{symbol} is too short to split without a delimiter"
            )));
        }
        let (base, quote) = symbol.split_at(3);
        Ok(Self::with_delimiter(base, quote, ""))
    }

    /// Parse a venue symbol that was rendered with `format`
    pub fn from_formatted(symbol: &str, format: &PairFormat) -> Result<Self> {
        if !format.delimiter.is_empty() {
            return Self::from_delimited(symbol, &format.delimiter);
        }
        if !format.index.is_empty() {
            return Self::from_index(symbol, &format.index);
        }
        Self::from_symbol(symbol)
    }

    /// Split a delimiter-less symbol around a known currency, e.g. `BTCAUD`
    /// with index `AUD`
    pub fn from_index(symbol: &str, index: &str) -> Result<Self> {
        let upper = symbol.to_ascii_uppercase();
        let index = index.to_ascii_uppercase();
        match upper.find(&index) {
            Some(0) if upper.len() > index.len() => {
                Ok(Self::with_delimiter(&upper[..index.len()], &upper[index.len()..], ""))
            }
            Some(i) if i > 0 => Ok(Self::with_delimiter(&upper[..i], &upper[i..], "")),
            _ => Err(ExchangeError::InvalidPair(format!(
                "index {index} not found in {symbol}"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.quote.is_empty()
    }

    /// Render the pair using `format`
    pub fn format(&self, format: &PairFormat) -> String {
        let joined = format!("{}{}{}", self.base, format.delimiter, self.quote);
        if format.uppercase {
            joined.to_ascii_uppercase()
        } else {
            joined.to_ascii_lowercase()
        }
    }

    /// Same pair with a different delimiter
    pub fn with_format(&self, format: &PairFormat) -> Self {
        Self {
            base: self.base.clone(),
            quote: self.quote.clone(),
            delimiter: format.delimiter.clone(),
        }
    }

    pub fn swap(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
            delimiter: self.delimiter.clone(),
        }
    }

    /// Lower-case `base`+`quote` key used for map lookups
    pub(crate) fn key(&self) -> String {
        format!("{}{}", self.base, self.quote).to_ascii_lowercase()
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.base.eq_ignore_ascii_case(&other.base) && self.quote.eq_ignore_ascii_case(&other.quote)
    }
}

impl Eq for Pair {}

impl Hash for Pair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.to_ascii_uppercase().hash(state);
        self.quote.to_ascii_uppercase().hash(state);
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, self.delimiter, self.quote)
    }
}

impl Serialize for Pair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        Pair::from_symbol(&symbol).map_err(serde::de::Error::custom)
    }
}

/// Pairs added and removed between two listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairDifference {
    pub added: Vec<Pair>,
    pub removed: Vec<Pair>,
}

impl PairDifference {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Helpers over pair listings
pub trait PairList {
    /// `exact` also compares delimiters
    fn contains_pair(&self, pair: &Pair, exact: bool) -> bool;
    fn find_differences(&self, incoming: &[Pair]) -> PairDifference;
    /// Render every pair and join them with the format's separator
    fn join_formatted(&self, format: &PairFormat) -> String;
    /// Resolve a venue symbol (e.g. `btcusdt`) against this listing
    fn derive_from(&self, symbol: &str, format: &PairFormat) -> Result<Pair>;
}

impl PairList for [Pair] {
    fn contains_pair(&self, pair: &Pair, exact: bool) -> bool {
        self.iter()
            .any(|p| p == pair && (!exact || p.delimiter == pair.delimiter))
    }

    fn find_differences(&self, incoming: &[Pair]) -> PairDifference {
        let current: HashSet<&Pair> = self.iter().collect();
        let next: HashSet<&Pair> = incoming.iter().collect();
        PairDifference {
            added: incoming.iter().filter(|p| !current.contains(p)).cloned().collect(),
            removed: self.iter().filter(|p| !next.contains(p)).cloned().collect(),
        }
    }

    fn join_formatted(&self, format: &PairFormat) -> String {
        self.iter()
            .map(|p| p.format(format))
            .collect::<Vec<_>>()
            .join(&format.separator)
    }

    fn derive_from(&self, symbol: &str, format: &PairFormat) -> Result<Pair> {
        if symbol.is_empty() {
            return Err(ExchangeError::PairIsEmpty);
        }
        self.iter()
            .find(|p| p.format(format).eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| ExchangeError::InvalidPair(format!("{symbol} not found in listing")))
    }
}
