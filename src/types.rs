//! Shared types for the Sniper HA backtester.
//!
//! These types form the data model used across all modules. Handicap
//! lines are exact decimals so that filtering stored lines and
//! deduplicating negated lines never depends on float equality.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Granularity of Asian Handicap lines, and the half-win / half-loss boundary.
pub const QUARTER_LINE: Decimal = dec!(0.25);

/// Margins whose absolute value is below this settle as a push.
pub const VOID_EPSILON: Decimal = dec!(0.01);

/// Every settled bet risks exactly one unit.
pub const UNIT_STAKE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// The team a bet is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(alias = "home", alias = "HOME")]
    Home,
    #[serde(alias = "away", alias = "AWAY")]
    Away,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    /// Raw goal differential from this side's perspective.
    pub fn goal_diff(&self, home_goals: u32, away_goals: u32) -> i64 {
        let (hg, ag) = (i64::from(home_goals), i64::from(away_goals));
        match self {
            Side::Home => hg - ag,
            Side::Away => ag - hg,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "Home"),
            Side::Away => write!(f, "Away"),
        }
    }
}

/// Parse a side name (case-insensitive, accepts the Portuguese labels too).
impl FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "h" | "mandante" => Ok(Side::Home),
            "away" | "a" | "visitante" => Ok(Side::Away),
            other => anyhow::bail!("Unknown side: {other} (expected home or away)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Handicap line
// ---------------------------------------------------------------------------

/// A goal-equivalent handicap, always a multiple of 0.25.
///
/// Whether a given value is home-relative (stored) or side-relative
/// (displayed) is decided by the caller; see `strategy::lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct HandicapLine(Decimal);

impl HandicapLine {
    pub const ZERO: HandicapLine = HandicapLine(Decimal::ZERO);

    /// Build a line from an exact decimal, rejecting non-quarter values.
    pub fn new(value: Decimal) -> Result<Self, BacktestError> {
        let quantized = value
            .checked_mul(dec!(4))
            .map_or(false, |quarters| quarters.fract().is_zero());
        if !quantized {
            return Err(BacktestError::InvalidLine(format!(
                "{value} is not a multiple of {QUARTER_LINE}"
            )));
        }
        Ok(Self::canonical(value))
    }

    fn canonical(value: Decimal) -> Self {
        if value.is_zero() {
            Self::ZERO
        } else {
            Self(value.normalize())
        }
    }

    /// Build a line from a float, rejecting non-finite and non-quarter values.
    pub fn from_f64(value: f64) -> Result<Self, BacktestError> {
        if !value.is_finite() {
            return Err(BacktestError::InvalidLine(format!("{value} is not finite")));
        }
        let decimal = Decimal::from_f64(value)
            .ok_or_else(|| BacktestError::InvalidLine(format!("{value} is out of range")))?;
        Self::new(decimal)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Arithmetic negation (never yields a negative zero).
    pub fn negate(&self) -> Self {
        Self::canonical(-self.0)
    }
}

impl TryFrom<Decimal> for HandicapLine {
    type Error = BacktestError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HandicapLine> for Decimal {
    fn from(line: HandicapLine) -> Self {
        line.0
    }
}

impl fmt::Display for HandicapLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_sign_positive() && !self.0.is_zero() {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for HandicapLine {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let value = Decimal::from_str(unsigned)
            .map_err(|e| BacktestError::InvalidLine(format!("{trimmed}: {e}")))?;
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// Match record
// ---------------------------------------------------------------------------

/// One historical match, as handed over by the loader.
///
/// `line` is always relative to the home side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub competition: String,
    pub season: Option<String>,
    pub date: Option<NaiveDate>,
    pub home_goals: u32,
    pub away_goals: u32,
    pub line: Option<HandicapLine>,
    pub home_odds: Option<f64>,
    pub away_odds: Option<f64>,
}

impl MatchRecord {
    /// A record can only be settled when the line and both odds are present.
    pub fn is_settleable(&self) -> bool {
        self.line.is_some() && self.home_odds.is_some() && self.away_odds.is_some()
    }

    /// Handicap odds for the given side.
    pub fn odds_for(&self, side: Side) -> Option<f64> {
        match side {
            Side::Home => self.home_odds,
            Side::Away => self.away_odds,
        }
    }

    /// Helper to build a test record with sensible defaults.
    #[cfg(test)]
    pub fn sample(home_goals: u32, away_goals: u32, line: f64) -> Self {
        MatchRecord {
            id: format!("m-{home_goals}-{away_goals}"),
            competition: "Brazil - Serie A".to_string(),
            season: Some("2024".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 5, 12),
            home_goals,
            away_goals,
            line: HandicapLine::from_f64(line).ok(),
            home_odds: Some(1.90),
            away_odds: Some(2.00),
        }
    }
}

// ---------------------------------------------------------------------------
// Settled bet
// ---------------------------------------------------------------------------

/// Settlement bucket of an Asian Handicap bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetOutcome {
    Win,
    HalfWin,
    Void,
    HalfLoss,
    Loss,
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetOutcome::Win => write!(f, "WIN"),
            BetOutcome::HalfWin => write!(f, "HALF-WIN"),
            BetOutcome::Void => write!(f, "VOID"),
            BetOutcome::HalfLoss => write!(f, "HALF-LOSS"),
            BetOutcome::Loss => write!(f, "LOSS"),
        }
    }
}

/// A unit-stake bet on one match, settled. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledBet {
    pub match_id: String,
    pub competition: String,
    pub side: Side,
    /// Side-relative line the bet was placed at.
    pub line: HandicapLine,
    pub stake: f64,
    pub odds: f64,
    pub margin: Decimal,
    pub outcome: BetOutcome,
    /// Profit/loss in units of stake.
    pub payout: f64,
    pub date: Option<NaiveDate>,
    pub season: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors of the settlement and aggregation core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("Match {0} is missing its handicap line or odds")]
    NotSettleable(String),

    #[error("No handicap lines available for {competition} ({side})")]
    EmptyCandidateSet { competition: String, side: Side },

    #[error("ROI undefined: no settled bets for {competition} ({side} {line})")]
    UndefinedRoi {
        competition: String,
        side: Side,
        line: HandicapLine,
    },

    #[error("Invalid handicap line: {0}")]
    InvalidLine(String),

    #[error("Line {line} is not available for this selection")]
    LineUnavailable { line: HandicapLine },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
