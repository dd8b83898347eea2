//! Asian Handicap settlement.
//!
//! The line passed in is already relative to the side being bet on, so
//! the margin is always `own goal differential + line` with no further
//! sign flip. Storage-side negation only matters for filtering records
//! (see `strategy::lines`), never for the settlement math.

use rust_decimal::Decimal;

use crate::types::{
    BacktestError, BetOutcome, HandicapLine, MatchRecord, SettledBet, Side, QUARTER_LINE,
    UNIT_STAKE, VOID_EPSILON,
};

/// Outcome of settling a single unit-stake bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub margin: Decimal,
    pub odds: f64,
    pub outcome: BetOutcome,
    pub payout: f64,
}

/// Settle a bet on `side` at the side-relative `display_line`.
///
/// Returns `None` when the record lacks its line or either handicap odd.
/// Odds are not validated: odds at or below 1.0 pass straight through.
pub fn settle(record: &MatchRecord, side: Side, display_line: HandicapLine) -> Option<Settlement> {
    if !record.is_settleable() {
        return None;
    }
    let odds = record.odds_for(side)?;

    let goal_diff = side.goal_diff(record.home_goals, record.away_goals);
    let margin = Decimal::from(goal_diff) + display_line.value();
    let outcome = classify(margin);

    Some(Settlement {
        margin,
        odds,
        outcome,
        payout: payout_for(outcome, odds),
    })
}

/// Settle and attach the match metadata, or report the record as not settleable.
pub fn settle_bet(
    record: &MatchRecord,
    side: Side,
    display_line: HandicapLine,
) -> Result<SettledBet, BacktestError> {
    let settlement = settle(record, side, display_line)
        .ok_or_else(|| BacktestError::NotSettleable(record.id.clone()))?;

    Ok(SettledBet {
        match_id: record.id.clone(),
        competition: record.competition.clone(),
        side,
        line: display_line,
        stake: UNIT_STAKE,
        odds: settlement.odds,
        margin: settlement.margin,
        outcome: settlement.outcome,
        payout: settlement.payout,
        date: record.date,
        season: record.season.clone(),
    })
}

/// Bucket a margin. The void band is checked first so that exact pushes
/// never land in the half-loss bucket; ±0.25 themselves are half results.
pub fn classify(margin: Decimal) -> BetOutcome {
    if margin.abs() < VOID_EPSILON {
        BetOutcome::Void
    } else if margin > QUARTER_LINE {
        BetOutcome::Win
    } else if margin < -QUARTER_LINE {
        BetOutcome::Loss
    } else if margin > Decimal::ZERO {
        BetOutcome::HalfWin
    } else {
        BetOutcome::HalfLoss
    }
}

/// Profit/loss for a unit stake at decimal `odds`.
pub fn payout_for(outcome: BetOutcome, odds: f64) -> f64 {
    match outcome {
        BetOutcome::Win => (odds - 1.0) * UNIT_STAKE,
        BetOutcome::HalfWin => (odds - 1.0) * UNIT_STAKE / 2.0,
        BetOutcome::Void => 0.0,
        BetOutcome::HalfLoss => -UNIT_STAKE / 2.0,
        BetOutcome::Loss => -UNIT_STAKE,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
