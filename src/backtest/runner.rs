//! Historical backtesting engine.
//!
//! Replays every historical match of a competition at one handicap line
//! through the settlement rules and aggregates the unit-stake results:
//! total P/L, ROI, cumulative curve, drawdown and per-season breakdown.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::aggregator::{
    chronological, cumulative_curve, max_drawdown, overall_stats, per_period_stats, CurvePoint,
    OverallStats, PeriodStats,
};
use super::settlement::settle_bet;
use crate::strategy::{to_display_lines, to_stored_line, SelectionMemory};
use crate::types::{BacktestError, HandicapLine, MatchRecord, SettledBet, Side};

// ---------------------------------------------------------------------------
// Backtest results
// ---------------------------------------------------------------------------

/// Complete backtest report for one (competition, side, line) selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub competition: String,
    pub side: Side,
    /// Side-relative line the bets were placed at.
    pub line: HandicapLine,
    /// Home-relative line used to filter the records.
    pub stored_line: HandicapLine,
    /// Records of the competition stored at `stored_line`.
    pub matched: usize,
    /// Matched records dropped for a missing line or odds.
    pub excluded: usize,
    /// Settled bets without a date (left out of the curve only).
    pub undated: usize,
    pub overall: OverallStats,
    pub max_drawdown: f64,
    pub seasons: Vec<PeriodStats>,
    /// Cumulative P/L at each dated bet, chronological.
    pub curve: Vec<CurvePoint>,
    /// Per-bet log: dated bets chronologically, then undated ones.
    pub bets: Vec<SettledBet>,
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

/// Runs selections against an immutable snapshot of match records.
#[derive(Debug, Clone)]
pub struct Backtester {
    records: Arc<Vec<MatchRecord>>,
}

impl Backtester {
    pub fn new(records: Vec<MatchRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct competitions, sorted.
    pub fn competitions(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.competition.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn in_competition<'a>(&'a self, competition: &'a str) -> impl Iterator<Item = &'a MatchRecord> {
        self.records.iter().filter(move |r| r.competition == competition)
    }

    /// Home-relative lines present for a competition.
    pub fn stored_lines(&self, competition: &str) -> BTreeSet<HandicapLine> {
        self.in_competition(competition).filter_map(|r| r.line).collect()
    }

    /// Lines a user can pick for `side`, sorted ascending.
    pub fn display_lines(
        &self,
        competition: &str,
        side: Side,
    ) -> Result<Vec<HandicapLine>, BacktestError> {
        let lines = to_display_lines(self.stored_lines(competition), side);
        if lines.is_empty() {
            return Err(BacktestError::EmptyCandidateSet {
                competition: competition.to_string(),
                side,
            });
        }
        Ok(lines)
    }

    /// Resolve the line for a selection and remember it in `memory`.
    pub fn select_line(
        &self,
        competition: &str,
        side: Side,
        requested: Option<HandicapLine>,
        memory: &mut SelectionMemory,
    ) -> Result<HandicapLine, BacktestError> {
        let candidates = self.display_lines(competition, side)?;
        memory.choose(&candidates, requested)
    }

    /// Backtest a unit-stake bet on `side` at `line` on every matching record.
    ///
    /// Fails with `UndefinedRoi` when nothing could be settled, so an empty
    /// selection is never reported as a 0% ROI.
    pub fn run(
        &self,
        competition: &str,
        side: Side,
        line: HandicapLine,
    ) -> Result<BacktestReport, BacktestError> {
        let stored_line = to_stored_line(line, side);

        let mut matched = 0usize;
        let mut settled = Vec::new();
        for record in self.in_competition(competition) {
            if record.line != Some(stored_line) {
                continue;
            }
            matched += 1;
            match settle_bet(record, side, line) {
                Ok(bet) => settled.push(bet),
                Err(e) => debug!(error = %e, "Excluding record"),
            }
        }
        let excluded = matched - settled.len();

        let (dated, undated) = chronological(settled);
        let curve = cumulative_curve(&dated);
        let undated_count = undated.len();
        let bets: Vec<SettledBet> = dated.into_iter().chain(undated).collect();

        let overall = overall_stats(&bets).ok_or_else(|| BacktestError::UndefinedRoi {
            competition: competition.to_string(),
            side,
            line,
        })?;
        let cumulative: Vec<f64> = curve.iter().map(|p| p.cumulative).collect();

        info!(
            competition,
            side = %side,
            line = %line,
            stored_line = %stored_line,
            bets = overall.count,
            excluded,
            undated = undated_count,
            total_pl = format!("{:.2}", overall.total_pl),
            roi_pct = format!("{:.2}", overall.roi_pct),
            "Backtest complete"
        );

        Ok(BacktestReport {
            competition: competition.to_string(),
            side,
            line,
            stored_line,
            matched,
            excluded,
            undated: undated_count,
            max_drawdown: max_drawdown(&cumulative),
            seasons: per_period_stats(&bets),
            overall,
            curve,
            bets,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
