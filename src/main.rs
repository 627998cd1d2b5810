//! TRENDSCAN — Minervini trend-template screener for NSE equities
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves the scan universe, wires the progress store and alert sink,
//! then runs scheduled batch scans with graceful shutdown. The trigger
//! API runs alongside so external schedulers can drive batches too.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use trendscan::config::AppConfig;
use trendscan::data::yahoo::YahooFinanceClient;
use trendscan::data::PriceHistoryProvider;
use trendscan::engine::scanner::{BatchBudget, BatchRequest, BatchScanner, ScannerConfig};
use trendscan::notify::{NotificationSink, TelegramNotifier};
use trendscan::progress::{FileStore, ProgressStore, RedisStore};
use trendscan::screener::TemplateConfig;
use trendscan::server::{self, routes::ServerContext};
use trendscan::types::BatchStatus;
use trendscan::universe::Universe;

const BANNER: &str = r#"
 _____ ____  _____ _   _ ____  ____   ____    _    _   _
|_   _|  _ \| ____| \ | |  _ \/ ___| / ___|  / \  | \ | |
  | | | |_) |  _| |  \| | | | \___ \| |     / _ \ |  \| |
  | | |  _ <| |___| |\  | |_| |___) | |___ / ___ \| |\  |
  |_| |_| \_\_____|_| \_|____/|____/ \____/_/   \_\_| \_|

  Minervini Trend Template Screener — NSE
  v0.1.0
"#;

/// Default local progress file, used when no Redis URL is configured.
const PROGRESS_FILE: &str = "scan_progress.json";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML; a missing file means all defaults.
    let cfg = if std::path::Path::new("config.toml").exists() {
        AppConfig::load("config.toml")?
    } else {
        AppConfig::default()
    };

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        interval_secs = cfg.scan.interval_secs,
        cooldown_hours = cfg.scan.cooldown_hours,
        "TRENDSCAN starting up"
    );

    // -- Universe ---------------------------------------------------------

    let universe = Arc::new(Universe::resolve(cfg.universe.symbols_file.as_deref()));
    info!(symbols = universe.len(), tier = ?universe.tier(), "Universe resolved");

    // -- Components -------------------------------------------------------

    let provider: Arc<dyn PriceHistoryProvider> = Arc::new(YahooFinanceClient::new(Some(
        cfg.screener.exchange_suffix.clone(),
    ))?);

    let store: Arc<dyn ProgressStore> = match std::env::var("REDIS_URL") {
        Ok(url) => {
            info!("Using redis progress store");
            Arc::new(RedisStore::new(&url)?)
        }
        Err(_) => {
            info!(path = PROGRESS_FILE, "Using file progress store");
            Arc::new(FileStore::new(PROGRESS_FILE))
        }
    };

    let sink = build_notifier(&cfg);

    let scanner = Arc::new(BatchScanner::new(
        universe,
        provider,
        store,
        sink,
        ScannerConfig {
            budget: BatchBudget::from_scan_config(&cfg.scan),
            cooldown: Duration::from_secs_f64(cfg.scan.cooldown_hours * 3600.0),
            fetch_timeout: Duration::from_secs(cfg.scan.fetch_timeout_secs),
            template: TemplateConfig {
                min_pct_above_low: cfg.screener.min_pct_above_low,
                max_pct_from_high: cfg.screener.max_pct_from_high,
            },
            digest_top_n: cfg.scan.digest_top_n,
        },
    ));

    // -- Trigger API ------------------------------------------------------

    if cfg.server.enabled {
        let state = Arc::new(ServerContext {
            scanner: scanner.clone(),
            notify_on_check: cfg.scan.notify_on_check,
        });
        server::spawn_server(state, cfg.server.port)?;
    }

    // -- Main loop --------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.scan.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scan.interval_secs,
        "Entering scan loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match scanner.run_batch(BatchRequest::default()).await {
                    Ok(outcome) => {
                        match outcome.status {
                            BatchStatus::Waiting => {
                                info!(found = outcome.found_total, "Cooldown — skipping tick");
                            }
                            BatchStatus::PartialComplete => {
                                info!(
                                    processed = outcome.processed,
                                    next_offset = outcome.next_offset,
                                    total = outcome.total,
                                    found = outcome.found_total,
                                    "Batch done, pass continues"
                                );
                            }
                            BatchStatus::ScanComplete => {
                                info!(
                                    scanned = outcome.total,
                                    found = outcome.found_total,
                                    "Pass complete"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Batch failed — continuing to next tick");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("TRENDSCAN shut down cleanly.");
    Ok(())
}

/// Build the Telegram sink from env vars named in the config. Missing
/// credentials mean scanning runs without alerts.
fn build_notifier(cfg: &AppConfig) -> Option<Arc<dyn NotificationSink>> {
    let token_env = cfg.alerts.telegram_bot_token_env.as_deref()?;
    let chats_env = cfg.alerts.telegram_chat_ids_env.as_deref()?;

    let token = match std::env::var(token_env) {
        Ok(t) if !t.trim().is_empty() => t,
        _ => {
            warn!(env = token_env, "No bot token — alerts disabled");
            return None;
        }
    };
    let chat_ids: Vec<String> = match std::env::var(chats_env) {
        Ok(ids) => ids.split(',').map(str::to_string).collect(),
        Err(_) => {
            warn!(env = chats_env, "No chat ids — alerts disabled");
            return None;
        }
    };

    match TelegramNotifier::new(token, chat_ids) {
        Ok(notifier) => {
            info!(recipients = notifier.recipient_count(), "Telegram alerts enabled");
            Some(Arc::new(notifier))
        }
        Err(e) => {
            warn!(error = %e, "Failed to build notifier — alerts disabled");
            None
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trendscan=info"));

    let json_logging = std::env::var("TRENDSCAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
