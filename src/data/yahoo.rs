//! Yahoo Finance daily-bar integration.
//!
//! Uses the public v8 chart endpoint — no API key, but symbols must carry
//! the exchange suffix (`.NS` for NSE). Null rows (exchange holidays,
//! partial sessions) are dropped during conversion.
//!
//! Base URL: https://query1.finance.yahoo.com/v8/finance/chart/
//! Rate limit: unofficial; keep one scan pass well under a request/second.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{HistoryError, PriceHistoryProvider};
use crate::types::PriceBar;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROVIDER_NAME: &str = "yahoo";

/// Default exchange suffix appended to bare symbols.
const DEFAULT_SUFFIX: &str = ".NS";

/// Yahoo throttles anonymous clients without a browser-ish user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) trendscan/0.1";

/// Per-request ceiling; the scanner adds its own budget check on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// API response types (Yahoo JSON → Rust)
// ---------------------------------------------------------------------------

/// Envelope of `/v8/finance/chart/{symbol}`. We only deserialize the
/// fields we need.
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    /// Unix seconds, one per bar.
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Parallel arrays, any element of which may be null.
#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Read-only Yahoo Finance chart client.
pub struct YahooFinanceClient {
    http: Client,
    suffix: String,
}

impl YahooFinanceClient {
    /// Create a client. `suffix` overrides the `.NS` default (pass `""`
    /// for symbols that already carry their exchange).
    pub fn new(suffix: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(YahooFinanceClient {
            http,
            suffix: suffix.unwrap_or_else(|| DEFAULT_SUFFIX.to_string()),
        })
    }

    /// Append the exchange suffix unless the symbol already has one.
    fn full_symbol(&self, symbol: &str) -> String {
        if self.suffix.is_empty() || symbol.contains('.') {
            symbol.to_string()
        } else {
            format!("{symbol}{}", self.suffix)
        }
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooFinanceClient {
    async fn daily_history(&self, symbol: &str) -> Result<Vec<PriceBar>, HistoryError> {
        let full = self.full_symbol(symbol);
        // Symbols like M&M.NS must be escaped in the path segment.
        let url = format!(
            "{BASE_URL}/{}?range=1y&interval=1d",
            urlencoding::encode(&full)
        );

        debug!(symbol = %full, "Fetching daily history");
        let envelope: ChartEnvelope = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = envelope.chart.error {
            if !err.is_null() {
                warn!(symbol = %full, error = %err, "Yahoo returned an error payload");
                return Err(HistoryError::Unavailable(full));
            }
        }

        let result = envelope
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| HistoryError::Unavailable(full.clone()))?;

        let bars = convert_bars(&full, result)?;
        debug!(symbol = %full, bars = bars.len(), "History fetched");
        Ok(bars)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

/// Zip Yahoo's parallel arrays into bars, dropping null rows and anything
/// out of chronological order.
fn convert_bars(symbol: &str, result: ChartResult) -> Result<Vec<PriceBar>, HistoryError> {
    let timestamps = result
        .timestamp
        .ok_or_else(|| HistoryError::Unavailable(symbol.to_string()))?;
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| HistoryError::Malformed(format!("{symbol}: no quote block")))?;

    if quote.close.len() != timestamps.len() {
        return Err(HistoryError::Malformed(format!(
            "{symbol}: {} timestamps vs {} closes",
            timestamps.len(),
            quote.close.len()
        )));
    }

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let (open, high, low, close) = match (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        ) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => continue, // null row
        };

        let date = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| HistoryError::Malformed(format!("{symbol}: bad timestamp {ts}")))?
            .date_naive();

        // Guard against duplicate or out-of-order dates.
        if bars.last().map_or(false, |prev: &PriceBar| prev.date >= date) {
            continue;
        }

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0) as u64,
        });
    }

    if bars.is_empty() {
        return Err(HistoryError::Unavailable(symbol.to_string()));
    }
    Ok(bars)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
