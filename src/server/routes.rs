//! Trigger API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerContext>`;
//! the handlers own no scan state themselves — every mutation goes
//! through the batch scanner.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::scanner::{BatchRequest, BatchScanner};
use crate::notify::NotificationSink;
use crate::report;
use crate::types::{BatchOutcome, ScanResult};

/// Most symbols accepted by a single on-demand check.
const MAX_CHECK_SYMBOLS: usize = 10;

/// Most results returned by the results endpoint.
const MAX_RESULTS_RETURNED: usize = 50;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerContext {
    pub scanner: Arc<BatchScanner>,
    /// Send a notification when an on-demand check finds a qualifier.
    pub notify_on_check: bool,
}

pub type AppState = Arc<ServerContext>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for the scan-batch trigger. A non-numeric `offset`
/// is rejected with 400 before any state is touched.
#[derive(Debug, Deserialize)]
pub struct ScanBatchParams {
    pub offset: Option<usize>,
    pub reset: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    /// Comma-separated symbols.
    pub symbols: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub universe_size: usize,
    pub next_offset: usize,
    pub scan_in_progress: bool,
    pub found_so_far: usize,
    pub last_complete: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub count: usize,
    pub returned: usize,
    pub last_complete: Option<DateTime<Utc>>,
    pub results: Vec<ScanResult>,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub symbol: String,
    pub qualifies: bool,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/scan-batch — run one budget-bounded batch.
///
/// `?offset=N` overrides the cursor, `?reset=true` clears the pass.
pub async fn scan_batch(
    State(state): State<AppState>,
    Query(params): Query<ScanBatchParams>,
) -> Result<Json<BatchOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let request = BatchRequest {
        offset: params.offset,
        reset: params.reset.unwrap_or(false),
    };

    match state.scanner.run_batch(request).await {
        Ok(outcome) => {
            info!(status = %outcome.status, processed = outcome.processed, "Batch trigger served");
            Ok(Json(outcome))
        }
        Err(e) => {
            warn!(error = %e, "Batch trigger failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// GET /api/check?symbols=A,B — evaluate symbols on demand, outside the
/// scan cursor. Capped at `MAX_CHECK_SYMBOLS` per request.
pub async fn check_symbols(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> Result<Json<Vec<CheckEntry>>, (StatusCode, Json<ErrorResponse>)> {
    let raw = params.symbols.unwrap_or_default();
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(bad_request("symbols query parameter is required"));
    }
    if symbols.len() > MAX_CHECK_SYMBOLS {
        return Err(bad_request("too many symbols (max 10 per request)"));
    }

    let mut entries = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match state.scanner.fetch_report(&symbol).await {
            Ok(trend) => {
                let qualifies = trend.qualifies();
                if qualifies && state.notify_on_check {
                    if let Some(sink) = state.scanner.sink() {
                        sink.send(&report::format_symbol_report(&trend)).await;
                    }
                }
                entries.push(CheckEntry {
                    symbol,
                    qualifies,
                    score: trend.score(),
                    result: Some(ScanResult::from_report(&trend)),
                    error: None,
                });
            }
            Err(e) => entries.push(CheckEntry {
                symbol,
                qualifies: false,
                score: 0,
                result: None,
                error: Some(e.to_string()),
            }),
        }
    }

    Ok(Json(entries))
}

/// GET /api/status — cursor position and pass state, no side effects.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let progress = state.scanner.progress().await;
    Json(StatusResponse {
        universe_size: state.scanner.universe().len(),
        next_offset: progress.offset,
        scan_in_progress: progress.offset > 0,
        found_so_far: progress.results.len(),
        last_complete: progress.last_complete,
    })
}

/// GET /api/results — accumulated qualifiers, capped.
pub async fn get_results(State(state): State<AppState>) -> Json<ResultsResponse> {
    let progress = state.scanner.progress().await;
    let count = progress.results.len();
    let mut results = progress.results;
    results.truncate(MAX_RESULTS_RETURNED);
    Json(ResultsResponse {
        count,
        returned: results.len(),
        last_complete: progress.last_complete,
        results,
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanProgress;

    #[test]
    fn test_status_response_serializes() {
        let resp = StatusResponse {
            universe_size: 500,
            next_offset: 120,
            scan_in_progress: true,
            found_so_far: 3,
            last_complete: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"next_offset\":120"));
        assert!(json.contains("\"scan_in_progress\":true"));
    }

    #[test]
    fn test_check_entry_omits_empty_fields() {
        let entry = CheckEntry {
            symbol: "TCS".into(),
            qualifies: true,
            score: 9,
            result: Some(ScanResult::sample("TCS", 4012.55)),
            error: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"qualifies\":true"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_results_response_serializes() {
        let progress = ScanProgress {
            offset: 0,
            results: vec![ScanResult::sample("INFY", 1500.0)],
            last_complete: Some(Utc::now()),
        };
        let resp = ResultsResponse {
            count: progress.results.len(),
            returned: 1,
            last_complete: progress.last_complete,
            results: progress.results,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("INFY"));
        assert!(json.contains("\"count\":1"));
    }
}
