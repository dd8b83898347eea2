//! Persistence layer.
//!
//! Saves and loads backtest reports to/from a JSON file so a run can be
//! archived or charted elsewhere.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::backtest::BacktestReport;

/// Default report file path.
pub const DEFAULT_REPORT_FILE: &str = "sniper_report.json";

/// Save a backtest report to a JSON file.
pub fn save_report(report: &BacktestReport, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_REPORT_FILE);
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialise backtest report")?;

    std::fs::write(path, &json).with_context(|| format!("Failed to write report to {path}"))?;

    debug!(path, bets = report.overall.count, "Report saved");
    Ok(())
}

/// Load a backtest report from a JSON file.
/// Returns None if the file doesn't exist.
pub fn load_report(path: Option<&str>) -> Result<Option<BacktestReport>> {
    let path = path.unwrap_or(DEFAULT_REPORT_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved report found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report from {path}"))?;

    let report: BacktestReport =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse report from {path}"))?;

    info!(
        path,
        competition = %report.competition,
        side = %report.side,
        line = %report.line,
        bets = report.overall.count,
        "Report loaded from disk"
    );

    Ok(Some(report))
}

/// Delete the report file.
pub fn delete_report(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_REPORT_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete report file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
