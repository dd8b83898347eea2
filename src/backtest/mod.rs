//! Backtesting: settle historical matches at a handicap line and aggregate
//! the results.

pub mod aggregator;
pub mod runner;
pub mod settlement;

pub use aggregator::{
    cumulative_curve, max_drawdown, overall_stats, per_period_stats, running_total, CurvePoint,
    OverallStats, PeriodStats,
};
pub use runner::{BacktestReport, Backtester};
pub use settlement::{settle, settle_bet, Settlement};
