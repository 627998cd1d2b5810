//! Batch scan orchestration.
//!
//! Drives one "tick" of a universe scan: loads the persisted cursor,
//! processes a budget-bounded slice of symbols through the trend template,
//! merges qualifying results into accumulated progress, and — when the
//! cursor reaches the end of the universe — resets for the next pass and
//! sends the end-of-cycle digest.
//!
//! One implementation serves both deployment shapes: environments with a
//! hard wall-clock ceiling use `BatchBudget::WallClock`, request-size
//! limited ones use `BatchBudget::SymbolCount`. The budget is checked
//! before each symbol, so a slow fetch can overrun it by at most one
//! symbol's timeout.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::data::{HistoryError, PriceHistoryProvider};
use crate::notify::NotificationSink;
use crate::progress::ProgressStore;
use crate::report;
use crate::screener::{self, TemplateConfig};
use crate::types::{BatchOutcome, BatchStatus, ScanProgress, ScanResult, TrendReport};
use crate::universe::Universe;

// ---------------------------------------------------------------------------
// Budgets and requests
// ---------------------------------------------------------------------------

/// How far one invocation is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchBudget {
    /// Stop starting new symbols once this much wall-clock time has passed.
    WallClock(Duration),
    /// Stop after this many symbols.
    SymbolCount(usize),
}

impl BatchBudget {
    /// Derive the budget from config: an explicit symbol count wins,
    /// otherwise the wall-clock ceiling applies.
    pub fn from_scan_config(cfg: &ScanConfig) -> Self {
        match cfg.max_batch_symbols {
            Some(n) => BatchBudget::SymbolCount(n),
            None => BatchBudget::WallClock(Duration::from_secs(cfg.max_batch_seconds)),
        }
    }

    fn exhausted(&self, started: Instant, processed: usize) -> bool {
        match self {
            BatchBudget::WallClock(limit) => started.elapsed() >= *limit,
            BatchBudget::SymbolCount(limit) => processed >= *limit,
        }
    }
}

/// Administrative overrides, applied before the state machine runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRequest {
    /// Set the cursor to this index before scanning.
    pub offset: Option<usize>,
    /// Clear cursor and accumulated results before scanning.
    pub reset: bool,
}

/// Scanner tuning, bundled so construction sites stay readable.
#[derive(Debug, Clone, Copy)]
pub struct ScannerConfig {
    pub budget: BatchBudget,
    pub cooldown: Duration,
    pub fetch_timeout: Duration,
    pub template: TemplateConfig,
    pub digest_top_n: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            budget: BatchBudget::WallClock(Duration::from_secs(9)),
            cooldown: Duration::from_secs(4 * 3600),
            fetch_timeout: Duration::from_secs(8),
            template: TemplateConfig::default(),
            digest_top_n: report::DEFAULT_TOP_N,
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Orchestrates chunked, resumable universe scans.
///
/// Owns all mutation of the persisted `ScanProgress`; nothing else writes
/// it. Concurrent invocations race as last-writer-wins, which can repeat
/// an offset range but never corrupts the stored shape.
pub struct BatchScanner {
    universe: Arc<Universe>,
    provider: Arc<dyn PriceHistoryProvider>,
    store: Arc<dyn ProgressStore>,
    sink: Option<Arc<dyn NotificationSink>>,
    cfg: ScannerConfig,
}

impl BatchScanner {
    pub fn new(
        universe: Arc<Universe>,
        provider: Arc<dyn PriceHistoryProvider>,
        store: Arc<dyn ProgressStore>,
        sink: Option<Arc<dyn NotificationSink>>,
        cfg: ScannerConfig,
    ) -> Self {
        BatchScanner {
            universe,
            provider,
            store,
            sink,
            cfg,
        }
    }

    /// Run one budget-bounded batch. This is the single entry point for
    /// every trigger: the scheduler tick and the HTTP trigger both land
    /// here.
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchOutcome> {
        let started = Instant::now();
        let total = self.universe.len();

        let mut progress = self.store.load().await;

        // Administrative overrides first, persisted immediately so a
        // budget-exhausted invocation still leaves them in effect.
        if request.reset {
            info!("Manual reset: clearing cursor and accumulated results");
            progress.offset = 0;
            progress.results.clear();
            self.store.save(&progress).await;
        }
        if let Some(offset) = request.offset {
            info!(offset, "Manual cursor override");
            progress.offset = offset;
            self.store.save(&progress).await;
        }

        // Cooldown gate: at the start of a pass, refuse to begin again too
        // soon after the previous completion. No state is touched.
        if progress.offset == 0 {
            if let Some(last) = progress.last_complete {
                let elapsed = Utc::now() - last;
                if elapsed.to_std().unwrap_or_default() < self.cfg.cooldown {
                    let hours = elapsed.num_minutes() as f64 / 60.0;
                    let cooldown_hours = self.cfg.cooldown.as_secs_f64() / 3600.0;
                    info!(hours_since = hours, "Cooldown active, not starting a new pass");
                    return Ok(BatchOutcome {
                        status: BatchStatus::Waiting,
                        processed: 0,
                        found_in_batch: 0,
                        found_total: progress.results.len(),
                        next_offset: 0,
                        total,
                        message: Some(format!(
                            "Last scan was {hours:.1} hours ago. Waiting for {cooldown_hours:.1}h cooldown."
                        )),
                    });
                }
            }
            // New pass: the accumulator starts empty.
            progress.results.clear();
        }

        let mut offset = progress.offset;
        let mut new_results: Vec<ScanResult> = Vec::new();
        let mut processed = 0usize;

        while !self.cfg.budget.exhausted(started, processed) && offset < total {
            // Universe ordering is stable, so the index is authoritative.
            let symbol = &self.universe.symbols()[offset];

            match self.fetch_report(symbol).await {
                Ok(report) => {
                    if report.qualifies() {
                        info!(symbol = %symbol, price = report.metrics.current_price, "Qualifier found");
                        new_results.push(ScanResult::from_report(&report));
                    }
                }
                // Per-symbol failures never abort the batch; the cursor
                // advances regardless, guaranteeing forward progress.
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "Symbol skipped");
                }
            }

            offset += 1;
            processed += 1;
        }

        let found_in_batch = new_results.len();
        progress.results.extend(new_results);
        progress.offset = offset;

        if offset >= total {
            // Pass complete: reset the cursor, stamp the completion time,
            // persist, then report.
            progress.offset = 0;
            progress.last_complete = Some(Utc::now());
            if !self.store.save(&progress).await {
                warn!("Progress store rejected final save; next pass may repeat work");
            }

            info!(
                scanned = total,
                found = progress.results.len(),
                "Scan pass complete"
            );

            let digest =
                report::format_digest(&progress.results, total, self.cfg.digest_top_n);
            if let Some(sink) = &self.sink {
                // Fire-and-forget: delivery failure is already logged.
                sink.send(&digest).await;
            }

            Ok(BatchOutcome {
                status: BatchStatus::ScanComplete,
                processed,
                found_in_batch,
                found_total: progress.results.len(),
                next_offset: 0,
                total,
                message: None,
            })
        } else {
            if !self.store.save(&progress).await {
                warn!(offset, "Progress store rejected save; this batch may be re-run");
            }

            info!(
                processed,
                found = found_in_batch,
                next_offset = offset,
                total,
                "Batch complete"
            );

            Ok(BatchOutcome {
                status: BatchStatus::PartialComplete,
                processed,
                found_in_batch,
                found_total: progress.results.len(),
                next_offset: offset,
                total,
                message: None,
            })
        }
    }

    /// Fetch one symbol's history (bounded by the per-symbol timeout) and
    /// evaluate the trend template. Used by the batch loop and by the
    /// on-demand check endpoint, which bypasses progress tracking.
    pub async fn fetch_report(&self, symbol: &str) -> Result<TrendReport, HistoryError> {
        let bars = match tokio::time::timeout(
            self.cfg.fetch_timeout,
            self.provider.daily_history(symbol),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(HistoryError::Timeout(symbol.to_string())),
        };

        screener::evaluate(symbol, None, &bars, &self.cfg.template)
            .ok_or_else(|| HistoryError::Unavailable(symbol.to_string()))
    }

    /// Current persisted progress (for status endpoints).
    pub async fn progress(&self) -> ScanProgress {
        self.store.load().await
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn sink(&self) -> Option<&Arc<dyn NotificationSink>> {
        self.sink.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
