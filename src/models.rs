//! models.rs - Core data structures for the scan worker
//!
//! Work items claimed from the dispatcher, provider quotes, the per-round
//! Raydium pair snapshot and the result records sent back.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Fractional digits kept on every reported price
pub const PRICE_SCALE: u32 = 9;

/// A token handed out by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    pub mint: String,
    #[serde(
        default,
        deserialize_with = "lenient_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub index: Option<i64>,
}

/// Dispatcher backends send the index as a number or a numeric string
fn lenient_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIndex {
        Number(i64),
        Text(String),
    }

    match Option::<RawIndex>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawIndex::Number(n)) => Ok(Some(n)),
        Some(RawIndex::Text(raw)) if raw.trim().is_empty() => Ok(None),
        Some(RawIndex::Text(raw)) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid index: {raw}"))),
    }
}

impl WorkItem {
    pub fn new(mint: &str, index: Option<i64>) -> Self {
        WorkItem {
            mint: mint.to_string(),
            index,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{} (#{})", self.mint, index),
            None => write!(f, "{}", self.mint),
        }
    }
}

/// Where a quote came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PriceSource {
    Jupiter,
    Raydium,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::Jupiter => write!(f, "Jupiter"),
            PriceSource::Raydium => write!(f, "Raydium"),
        }
    }
}

/// A single provider price, denominated in the reference asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub value: Decimal,
    pub source: PriceSource,
}

impl PriceQuote {
    /// Builds a quote, rounding the value to [`PRICE_SCALE`] digits
    pub fn new(value: Decimal, source: PriceSource) -> Self {
        PriceQuote {
            value: value.round_dp(PRICE_SCALE),
            source,
        }
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.source)
    }
}

/// One entry of the Raydium bulk pair list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairRecord {
    #[serde(rename = "baseMint")]
    pub base_mint: String,

    #[serde(rename = "quoteMint")]
    pub quote_mint: String,

    #[serde(default)]
    pub price: Option<Decimal>,
}

impl PairRecord {
    pub fn new(base_mint: &str, quote_mint: &str, price: Option<Decimal>) -> Self {
        PairRecord {
            base_mint: base_mint.to_string(),
            quote_mint: quote_mint.to_string(),
            price,
        }
    }

    /// True if the mint sits on either side of the pair
    pub fn involves(&self, mint: &str) -> bool {
        self.base_mint == mint || self.quote_mint == mint
    }
}

/// Raydium pair table fetched once per round and only read afterwards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    pairs: Vec<PairRecord>,
}

impl PriceSnapshot {
    pub fn new(pairs: Vec<PairRecord>) -> Self {
        PriceSnapshot { pairs }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Price of `mint` quoted in `reference`.
    ///
    /// Only the first pair that involves the mint is considered. It has to be
    /// quoted in the reference asset and carry a non-zero price, otherwise
    /// the mint has no price in this snapshot.
    pub fn reference_price(&self, mint: &str, reference: &str) -> Option<Decimal> {
        let pair = self.pairs.iter().find(|p| p.involves(mint))?;
        if pair.quote_mint != reference {
            return None;
        }
        pair.price.filter(|price| !price.is_zero())
    }
}

/// Price report for one token, as accepted by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub mint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,

    #[serde(rename = "currentPrice")]
    pub current_price: Decimal,

    #[serde(rename = "scanTime")]
    pub scan_time: String,
}

impl ResultRecord {
    pub fn new(item: &WorkItem, quote: &PriceQuote, scan_time: &str) -> Self {
        ResultRecord {
            mint: item.mint.clone(),
            index: item.index,
            current_price: quote.value,
            scan_time: scan_time.to_string(),
        }
    }
}
