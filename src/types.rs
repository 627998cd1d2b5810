//! Shared types for the TRENDSCAN screener.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that data, screener, engine,
//! and server modules can depend on them without circular references.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Price bars
// ---------------------------------------------------------------------------

/// One daily OHLCV bar. Series are chronological with no duplicate dates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

// ---------------------------------------------------------------------------
// Trend template
// ---------------------------------------------------------------------------

/// Verdict for a single trend-template criterion.
///
/// `Insufficient` means the series was too short to evaluate the criterion
/// at all — it is neither a pass nor a fail and disqualifies the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionStatus {
    Pass,
    Fail,
    Insufficient,
}

impl fmt::Display for CriterionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionStatus::Pass => write!(f, "pass"),
            CriterionStatus::Fail => write!(f, "fail"),
            CriterionStatus::Insufficient => write!(f, "insufficient"),
        }
    }
}

/// Human-readable labels for the nine criteria, indexed 0..9.
pub const CRITERION_LABELS: [&str; 9] = [
    "Price > 150 SMA",
    "Price > 200 SMA",
    "150 SMA > 200 SMA",
    "200 SMA Uptrend",
    "50 SMA > 150 SMA",
    "50 SMA > 200 SMA",
    "Price > 50 SMA",
    "\u{2265}30% above 52W Low",
    "Within 25% of 52W High",
];

/// Derived metrics for one symbol at evaluation time.
///
/// Every field is either a well-defined number or `None` for insufficient
/// data — never a silently wrong value computed from a short window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    /// Last close.
    pub current_price: f64,
    /// Max high over the trailing ~252 bars.
    pub week_52_high: f64,
    /// Min low over the trailing ~252 bars.
    pub week_52_low: f64,
    pub sma_50: Option<f64>,
    pub sma_150: Option<f64>,
    pub sma_200: Option<f64>,
    /// 200-day SMA as of ~22 bars before the most recent bar.
    pub sma_200_month_ago: Option<f64>,
    /// (price - 52w low) / 52w low × 100. `None` when the low is not positive.
    pub pct_above_low: Option<f64>,
    /// (52w high - price) / 52w high × 100. `None` when the high is not positive.
    pub pct_from_high: Option<f64>,
}

/// Full trend-template evaluation for one symbol. Full precision; rounding
/// happens only when a `ScanResult` is built from this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub symbol: String,
    pub name: Option<String>,
    pub metrics: TrendMetrics,
    /// Verdicts for criteria 1..9 (index 0 is criterion 1).
    pub criteria: [CriterionStatus; 9],
}

impl TrendReport {
    /// Count of criteria that evaluated `Pass`.
    pub fn score(&self) -> u8 {
        self.criteria
            .iter()
            .filter(|c| **c == CriterionStatus::Pass)
            .count() as u8
    }

    /// Whether the symbol meets the full template: all nine criteria pass.
    /// A criterion with insufficient data never counts toward qualification.
    pub fn qualifies(&self) -> bool {
        self.criteria.iter().all(|c| *c == CriterionStatus::Pass)
    }
}

impl fmt::Display for TrendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/9 @ \u{20b9}{:.2}",
            self.symbol,
            self.score(),
            self.metrics.current_price
        )
    }
}

// ---------------------------------------------------------------------------
// Scan results and progress
// ---------------------------------------------------------------------------

/// Immutable per-symbol snapshot accumulated during a scan pass.
///
/// This is the serialized shape stored under `scan_results` and returned by
/// the API, so price-like values carry 2 decimal places and percentages 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub price: f64,
    pub score: u8,
    pub criteria: Vec<CriterionStatus>,
    pub sma_50: Option<f64>,
    pub sma_150: Option<f64>,
    pub sma_200: Option<f64>,
    pub pct_above_low: Option<f64>,
    pub pct_from_high: Option<f64>,
}

impl ScanResult {
    /// Build the presentation/persistence snapshot from a full-precision
    /// report. This is the only place rounding is applied.
    pub fn from_report(report: &TrendReport) -> Self {
        let m = &report.metrics;
        ScanResult {
            symbol: report.symbol.clone(),
            name: report.name.clone(),
            price: round2(m.current_price),
            score: report.score(),
            criteria: report.criteria.to_vec(),
            sma_50: m.sma_50.map(round2),
            sma_150: m.sma_150.map(round2),
            sma_200: m.sma_200.map(round2),
            pct_above_low: m.pct_above_low.map(round1),
            pct_from_high: m.pct_from_high.map(round1),
        }
    }

    /// Helper to build a qualifying sample result for tests.
    #[cfg(test)]
    pub fn sample(symbol: &str, price: f64) -> Self {
        ScanResult {
            symbol: symbol.to_string(),
            name: None,
            price,
            score: 9,
            criteria: vec![CriterionStatus::Pass; 9],
            sma_50: Some(price * 0.95),
            sma_150: Some(price * 0.90),
            sma_200: Some(price * 0.85),
            pct_above_low: Some(45.0),
            pct_from_high: Some(8.0),
        }
    }
}

/// Round to 2 decimal places (price-like values).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to 1 decimal place (percentage values).
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Durable cursor state for the chunked universe scan.
///
/// Owned and mutated exclusively by the batch scanner. `offset` is the next
/// unprocessed index into the universe ordering; `results` is append-only
/// within a pass and cleared together with the offset at pass boundaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    pub offset: usize,
    pub results: Vec<ScanResult>,
    pub last_complete: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Batch outcomes
// ---------------------------------------------------------------------------

/// Terminal state of one `run_batch` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Cooldown active at offset 0 — nothing was scanned.
    Waiting,
    /// Budget exhausted before the end of the universe.
    PartialComplete,
    /// The pass finished; offset reset and digest sent.
    ScanComplete,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Waiting => write!(f, "waiting"),
            BatchStatus::PartialComplete => write!(f, "partial_complete"),
            BatchStatus::ScanComplete => write!(f, "scan_complete"),
        }
    }
}

/// Structured result of one batch invocation, returned to the trigger caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    /// Symbols processed in this invocation.
    pub processed: usize,
    /// Qualifying symbols found in this invocation.
    pub found_in_batch: usize,
    /// Qualifying symbols accumulated across the whole pass so far.
    pub found_total: usize,
    /// Cursor value after this invocation (0 after a completed pass).
    pub next_offset: usize,
    /// Universe size.
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
