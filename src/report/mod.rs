//! Scan report formatting.
//!
//! Pure text rendering, no I/O. Output uses Telegram-flavoured HTML
//! (bold tags only) and is equally readable as plain text in logs.

use crate::types::{CriterionStatus, ScanResult, TrendReport, CRITERION_LABELS};

/// Default number of individual lines in the end-of-cycle digest.
pub const DEFAULT_TOP_N: usize = 15;

/// Render the end-of-cycle digest: header with totals, up to `top_n`
/// symbol lines, and an overflow count. Empty results get a distinct
/// no-matches message.
pub fn format_digest(results: &[ScanResult], universe_size: usize, top_n: usize) -> String {
    if results.is_empty() {
        return format!(
            "\u{1f3af} <b>Scan Complete!</b>\nScanned {universe_size} stocks. No stocks currently meet all 9 criteria."
        );
    }

    let mut msg = String::from("\u{1f3af} <b>Scan Complete!</b>\n\n");
    msg.push_str(&format!("\u{1f4ca} Scanned: {universe_size} stocks\n"));
    msg.push_str(&format!(
        "\u{2705} Found: {} qualifying stocks\n\n",
        results.len()
    ));

    for r in results.iter().take(top_n) {
        msg.push_str(&format!(
            "\u{2022} <b>{}</b> \u{20b9}{}\n",
            r.symbol,
            format_price(r.price)
        ));
    }

    if results.len() > top_n {
        msg.push_str(&format!(
            "\n...and {} more. Use /list to see all.",
            results.len() - top_n
        ));
    }

    msg
}

/// Render the detailed per-symbol breakdown used by on-demand checks.
pub fn format_symbol_report(report: &TrendReport) -> String {
    let m = &report.metrics;
    let score = report.score();
    let status = if report.qualifies() {
        "\u{2705} PASSES ALL 9!".to_string()
    } else {
        let defined = report
            .criteria
            .iter()
            .filter(|c| **c != CriterionStatus::Insufficient)
            .count();
        format!("\u{274c} FAILS ({score}/{defined})")
    };

    let mut msg = format!(
        "\u{1f4ca} <b>{}</b>{}\n\n<b>Score: {score}/9 {status}</b>\n\n",
        report.symbol,
        report
            .name
            .as_deref()
            .map(|n| format!(" - {n}"))
            .unwrap_or_default(),
    );

    msg.push_str(&format!(
        "\u{1f4b0} Price: \u{20b9}{}\n\n",
        format_price(m.current_price)
    ));

    msg.push_str("\u{1f4ca} <b>Moving Averages:</b>\n");
    for (label, value) in [
        ("50-day SMA", m.sma_50),
        ("150-day SMA", m.sma_150),
        ("200-day SMA", m.sma_200),
    ] {
        match value {
            Some(v) => msg.push_str(&format!("\u{2022} {label}: \u{20b9}{}\n", format_price(v))),
            None => msg.push_str(&format!("\u{2022} {label}: N/A (insufficient data)\n")),
        }
    }

    msg.push_str("\n\u{1f4c8} <b>52-Week Range:</b>\n");
    msg.push_str(&format!(
        "\u{2022} High: \u{20b9}{}{}\n",
        format_price(m.week_52_high),
        m.pct_from_high
            .map(|p| format!(" ({p:.1}% away)"))
            .unwrap_or_default()
    ));
    msg.push_str(&format!(
        "\u{2022} Low: \u{20b9}{}{}\n",
        format_price(m.week_52_low),
        m.pct_above_low
            .map(|p| format!(" ({p:.1}% above)"))
            .unwrap_or_default()
    ));

    msg.push_str("\n<b>Criteria:</b>\n");
    for (i, status) in report.criteria.iter().enumerate() {
        let icon = match status {
            CriterionStatus::Pass => "\u{2705}",
            CriterionStatus::Fail => "\u{274c}",
            CriterionStatus::Insufficient => "\u{26a0}\u{fe0f}",
        };
        msg.push_str(&format!("{icon} {}", CRITERION_LABELS[i]));
        if *status == CriterionStatus::Insufficient {
            msg.push_str(" (need more data)");
        }
        msg.push('\n');
    }

    msg
}

/// Format a price with 2 decimals and thousands separators (1,234.56).
fn format_price(v: f64) -> String {
    let formatted = format!("{v:.2}");
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}.{frac_part}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanResult, TrendMetrics};

    fn results(n: usize) -> Vec<ScanResult> {
        (0..n)
            .map(|i| ScanResult::sample(&format!("SYM{i}"), 100.0 + i as f64))
            .collect()
    }

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(2843.456), "2,843.46");
        assert_eq!(format_price(1234567.8), "1,234,567.80");
        assert_eq!(format_price(999.0), "999.00");
        assert_eq!(format_price(-1234.5), "-1,234.50");
    }

    #[test]
    fn test_digest_empty_has_distinct_message() {
        let msg = format_digest(&[], 500, DEFAULT_TOP_N);
        assert!(msg.contains("No stocks currently meet all 9 criteria"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_digest_lists_all_when_under_top_n() {
        let msg = format_digest(&results(3), 500, DEFAULT_TOP_N);
        assert!(msg.contains("Found: 3 qualifying stocks"));
        assert!(msg.contains("<b>SYM0</b>"));
        assert!(msg.contains("<b>SYM2</b>"));
        assert!(!msg.contains("more"));
    }

    #[test]
    fn test_digest_overflow_line() {
        let msg = format_digest(&results(20), 2000, 15);
        assert!(msg.contains("<b>SYM14</b>"));
        assert!(!msg.contains("<b>SYM15</b>"));
        assert!(msg.contains("...and 5 more"));
    }

    #[test]
    fn test_symbol_report_pass() {
        let report = TrendReport {
            symbol: "RELIANCE".into(),
            name: Some("Reliance Industries".into()),
            metrics: TrendMetrics {
                current_price: 2843.46,
                week_52_high: 3024.9,
                week_52_low: 2001.2,
                sma_50: Some(2750.12),
                sma_150: Some(2600.99),
                sma_200: Some(2500.5),
                sma_200_month_ago: Some(2450.0),
                pct_above_low: Some(42.1),
                pct_from_high: Some(6.0),
            },
            criteria: [CriterionStatus::Pass; 9],
        };
        let msg = format_symbol_report(&report);
        assert!(msg.contains("Score: 9/9"));
        assert!(msg.contains("PASSES ALL 9"));
        assert!(msg.contains("2,843.46"));
        assert!(msg.contains("42.1% above"));
    }

    #[test]
    fn test_symbol_report_insufficient_marks_criteria() {
        let mut criteria = [CriterionStatus::Pass; 9];
        criteria[3] = CriterionStatus::Insufficient;
        criteria[5] = CriterionStatus::Fail;
        let report = TrendReport {
            symbol: "IPO".into(),
            name: None,
            metrics: TrendMetrics {
                current_price: 120.0,
                week_52_high: 130.0,
                week_52_low: 80.0,
                sma_50: Some(110.0),
                sma_150: None,
                sma_200: None,
                sma_200_month_ago: None,
                pct_above_low: Some(50.0),
                pct_from_high: Some(7.7),
            },
            criteria,
        };
        let msg = format_symbol_report(&report);
        assert!(msg.contains("need more data"));
        assert!(msg.contains("N/A (insufficient data)"));
        assert!(msg.contains("FAILS (7/8)"));
    }
}
