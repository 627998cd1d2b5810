//! Price-history providers.
//!
//! Defines the `PriceHistoryProvider` trait and the Yahoo Finance
//! implementation. Per-symbol failures are values here, not panics:
//! the scanner skips a symbol whose history cannot be fetched and
//! keeps moving.

pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PriceBar;

/// Why a symbol's history could not be used.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The provider answered but had no usable data for this symbol.
    #[error("no price data available for {0}")]
    Unavailable(String),
    /// Transport-level failure (timeout, DNS, non-2xx handled as error).
    #[error("history request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a shape we could not interpret.
    #[error("malformed history response: {0}")]
    Malformed(String),
    /// The fetch exceeded the scanner's per-symbol budget.
    #[error("history fetch for {0} timed out")]
    Timeout(String),
}

/// Abstraction over daily-bar history sources.
///
/// Implementors return at least one trailing year of daily bars in
/// chronological order with no duplicate dates.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Fetch the trailing ~1y of daily bars for a symbol.
    async fn daily_history(&self, symbol: &str) -> Result<Vec<PriceBar>, HistoryError>;

    /// Provider name for logging and identification.
    fn name(&self) -> &str;
}
