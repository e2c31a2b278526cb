//! price_feed.rs - Price provider clients
//!
//! Two independent sources, both priced against wrapped SOL:
//! - Jupiter: direct swap quote for a fixed notional amount
//! - Raydium: bulk pair table (fetched once per round) plus a listing check
//!
//! Provider calls never fail towards the caller. Every network or decoding
//! problem ends up as "no quote".

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{check_status, FetchError, FetchResult};
use crate::models::{PairRecord, PriceQuote, PriceSnapshot, PriceSource};

/// Wrapped SOL, the asset every price is quoted in
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Notional input amount (base units) used for Jupiter quotes
pub const QUOTE_AMOUNT: u64 = 100_000_000;

/// Slippage tolerance sent with Jupiter quotes
pub const SLIPPAGE_BPS: u32 = 300;

pub const JUPITER_QUOTE_URL: &str = "https://quote-api.jup.ag/v6/quote";
pub const RAYDIUM_API_URL: &str = "https://api-v3.raydium.io";

/// Transport guard for the per-token requests. The bulk pair download has none.
const ITEM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A single price source
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Source tag carried by quotes from this provider
    fn source(&self) -> PriceSource;

    /// Price of `mint` in the reference asset, `None` when unavailable
    async fn quote(&self, mint: &str, snapshot: &PriceSnapshot) -> Option<PriceQuote>;
}

/// Producer of the per-round pair table
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch a fresh snapshot; an empty one on failure
    async fn fetch_snapshot(&self) -> PriceSnapshot;
}

fn http_client() -> FetchResult<Client> {
    Ok(Client::builder().build()?)
}

// ============================================================================
// Jupiter
// ============================================================================

#[derive(Debug, Deserialize)]
struct JupiterQuoteResponse {
    #[serde(rename = "outAmount", default)]
    out_amount: Option<AmountField>,
}

/// Jupiter sends amounts as strings, tolerate plain numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountField {
    Text(String),
    Number(u64),
}

/// Unit price from a quoted output amount: `out_amount / notional`
fn unit_price(out_amount: &AmountField, notional: u64) -> FetchResult<Decimal> {
    let amount = match out_amount {
        AmountField::Text(raw) => Decimal::from_str(raw.trim())
            .map_err(|_| FetchError::InvalidAmount(raw.clone()))?,
        AmountField::Number(n) => Decimal::from(*n),
    };

    if amount.is_sign_negative() || notional == 0 {
        return Err(FetchError::InvalidAmount(amount.to_string()));
    }

    Ok(amount / Decimal::from(notional))
}

/// Provider A: Jupiter swap quotes
#[derive(Debug, Clone)]
pub struct JupiterQuoteFeed {
    client: Client,
    quote_url: String,
    reference_mint: String,
    amount: u64,
    slippage_bps: u32,
}

impl JupiterQuoteFeed {
    pub fn new() -> FetchResult<Self> {
        Ok(JupiterQuoteFeed {
            client: http_client()?,
            quote_url: JUPITER_QUOTE_URL.to_string(),
            reference_mint: WSOL_MINT.to_string(),
            amount: QUOTE_AMOUNT,
            slippage_bps: SLIPPAGE_BPS,
        })
    }

    /// Point the feed at another quote endpoint
    pub fn with_quote_url(mut self, url: &str) -> Self {
        self.quote_url = url.to_string();
        self
    }

    async fn fetch_quote(&self, mint: &str) -> FetchResult<PriceQuote> {
        let amount = self.amount.to_string();
        let slippage = self.slippage_bps.to_string();

        let response = self
            .client
            .get(&self.quote_url)
            .timeout(ITEM_REQUEST_TIMEOUT)
            .query(&[
                ("inputMint", mint),
                ("outputMint", self.reference_mint.as_str()),
                ("amount", amount.as_str()),
                ("slippageBps", slippage.as_str()),
            ])
            .send()
            .await?;

        let data: JupiterQuoteResponse = check_status(response)?.json().await?;
        let out_amount = data
            .out_amount
            .ok_or_else(|| FetchError::Decode("missing outAmount".to_string()))?;

        let price = unit_price(&out_amount, self.amount)?;
        Ok(PriceQuote::new(price, PriceSource::Jupiter))
    }
}

#[async_trait]
impl PriceProvider for JupiterQuoteFeed {
    fn source(&self) -> PriceSource {
        PriceSource::Jupiter
    }

    async fn quote(&self, mint: &str, _snapshot: &PriceSnapshot) -> Option<PriceQuote> {
        match self.fetch_quote(mint).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                debug!("Jupiter quote unavailable for {}: {}", mint, e);
                None
            }
        }
    }
}

// ============================================================================
// Raydium
// ============================================================================

/// Pair records from the bulk listing. Entries that do not decode are skipped.
fn pairs_from_value(value: Value) -> FetchResult<Vec<PairRecord>> {
    match value {
        Value::Array(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<PairRecord>(entry).ok())
            .collect()),
        other => Err(FetchError::Decode(format!(
            "expected pair array, got {}",
            json_kind(&other)
        ))),
    }
}

/// Listing check payload: a bare array or a `{ "data": [...] }` envelope,
/// listed when any entry is non-null.
fn listed_in(value: &Value) -> bool {
    let entries = match value {
        Value::Array(entries) => Some(entries),
        Value::Object(map) => map.get("data").and_then(Value::as_array),
        _ => None,
    };

    entries.map_or(false, |entries| entries.iter().any(|e| !e.is_null()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Provider B: Raydium pair table and listing check
#[derive(Debug, Clone)]
pub struct RaydiumPairFeed {
    client: Client,
    api_url: String,
    reference_mint: String,
}

impl RaydiumPairFeed {
    pub fn new() -> FetchResult<Self> {
        Ok(RaydiumPairFeed {
            client: http_client()?,
            api_url: RAYDIUM_API_URL.to_string(),
            reference_mint: WSOL_MINT.to_string(),
        })
    }

    /// Point the feed at another Raydium API root
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_pairs(&self) -> FetchResult<Vec<PairRecord>> {
        let url = format!("{}/pairs", self.api_url);
        debug!("Fetching Raydium pairs from: {}", url);

        let response = self.client.get(&url).send().await?;
        let value: Value = check_status(response)?.json().await?;
        pairs_from_value(value)
    }

    async fn is_listed(&self, mint: &str) -> FetchResult<bool> {
        let url = format!("{}/mint/ids", self.api_url);
        let response = self
            .client
            .get(&url)
            .timeout(ITEM_REQUEST_TIMEOUT)
            .query(&[("mints", mint)])
            .send()
            .await?;
        let value: Value = check_status(response)?.json().await?;
        Ok(listed_in(&value))
    }

    async fn fetch_quote(&self, mint: &str, snapshot: &PriceSnapshot) -> FetchResult<PriceQuote> {
        // The snapshot lookup is local, so it runs before the listing request
        let price = snapshot
            .reference_price(mint, &self.reference_mint)
            .ok_or_else(|| FetchError::NoReferencePair(mint.to_string()))?;

        if !self.is_listed(mint).await? {
            return Err(FetchError::NotListed(mint.to_string()));
        }

        Ok(PriceQuote::new(price, PriceSource::Raydium))
    }
}

#[async_trait]
impl PriceProvider for RaydiumPairFeed {
    fn source(&self) -> PriceSource {
        PriceSource::Raydium
    }

    async fn quote(&self, mint: &str, snapshot: &PriceSnapshot) -> Option<PriceQuote> {
        match self.fetch_quote(mint, snapshot).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                debug!("Raydium quote unavailable for {}: {}", mint, e);
                None
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for RaydiumPairFeed {
    async fn fetch_snapshot(&self) -> PriceSnapshot {
        match self.fetch_pairs().await {
            Ok(pairs) => {
                info!("Raydium snapshot: {} pairs", pairs.len());
                PriceSnapshot::new(pairs)
            }
            Err(e) => {
                warn!("Raydium pair fetch failed, continuing without: {}", e);
                PriceSnapshot::empty()
            }
        }
    }
}
