//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the bot token, chat ids) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`. Every section has
//! defaults so a partial file works.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub screener: ScreenerConfig,
    pub scan: ScanConfig,
    pub universe: UniverseConfig,
    pub server: ServerConfig,
    pub alerts: AlertsConfig,
}

/// Trend-template thresholds and the data-source exchange suffix.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Criterion 8: minimum percent above the 52-week low.
    pub min_pct_above_low: f64,
    /// Criterion 9: maximum percent below the 52-week high.
    pub max_pct_from_high: f64,
    /// Suffix appended to bare symbols for the data provider.
    pub exchange_suffix: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        ScreenerConfig {
            min_pct_above_low: 30.0,
            max_pct_from_high: 25.0,
            exchange_suffix: ".NS".to_string(),
        }
    }
}

/// Batch scheduling and bounding.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Scheduled-trigger cadence. Cooldown makes frequent ticks safe.
    pub interval_secs: u64,
    /// Minimum hours between the end of one pass and the start of the next.
    pub cooldown_hours: f64,
    /// Wall-clock budget per invocation. Used when `max_batch_symbols`
    /// is unset.
    pub max_batch_seconds: u64,
    /// Symbol-count budget per invocation; takes precedence when set.
    pub max_batch_symbols: Option<usize>,
    /// Per-symbol history fetch timeout.
    pub fetch_timeout_secs: u64,
    /// Individual lines in the end-of-cycle digest.
    pub digest_top_n: usize,
    /// Also notify when an on-demand /api/check finds a qualifying symbol.
    pub notify_on_check: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            interval_secs: 300,
            cooldown_hours: 4.0,
            max_batch_seconds: 9,
            max_batch_symbols: None,
            fetch_timeout_secs: 8,
            digest_top_n: crate::report::DEFAULT_TOP_N,
            notify_on_check: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UniverseConfig {
    /// Path to the operator-supplied large symbols file (tier 1).
    pub symbols_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            enabled: true,
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_ids_env: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.screener.min_pct_above_low, 30.0);
        assert_eq!(cfg.screener.max_pct_from_high, 25.0);
        assert_eq!(cfg.scan.cooldown_hours, 4.0);
        assert_eq!(cfg.scan.max_batch_seconds, 9);
        assert!(cfg.scan.max_batch_symbols.is_none());
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [scan]
            interval_secs = 600
            max_batch_symbols = 30

            [screener]
            min_pct_above_low = 25.0

            [alerts]
            telegram_bot_token_env = "TELEGRAM_BOT_TOKEN"
            telegram_chat_ids_env = "TELEGRAM_CHAT_IDS"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.scan.interval_secs, 600);
        assert_eq!(cfg.scan.max_batch_symbols, Some(30));
        // Untouched fields keep their defaults.
        assert_eq!(cfg.scan.cooldown_hours, 4.0);
        assert_eq!(cfg.screener.min_pct_above_low, 25.0);
        assert_eq!(cfg.screener.max_pct_from_high, 25.0);
        assert_eq!(
            cfg.alerts.telegram_bot_token_env.as_deref(),
            Some("TELEGRAM_BOT_TOKEN")
        );
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AppConfig::load("/tmp/trendscan_no_such_config.toml").is_err());
    }
}
