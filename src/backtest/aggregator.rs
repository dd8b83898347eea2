//! Aggregation of settled bets: chronological ordering, the cumulative
//! P/L curve, overall statistics and the per-season breakdown.
//!
//! All functions take an already-filtered sequence of settled bets.
//! Unsettleable records never reach this module.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BetOutcome, SettledBet};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One point of the cumulative P/L curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub match_id: String,
    pub payout: f64,
    pub cumulative: f64,
}

/// Headline numbers for a whole selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub count: usize,
    pub total_pl: f64,
    /// 100 × total P/L / count.
    pub roi_pct: f64,
    pub mean_odds: f64,
    pub wins: usize,
    pub half_wins: usize,
    pub voids: usize,
    pub half_losses: usize,
    pub losses: usize,
    /// Share of non-void bets that won at least half. `None` if all were void.
    pub hit_rate: Option<f64>,
}

/// Per-season summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub season: String,
    pub count: usize,
    pub total_pl: f64,
    pub mean_pl: f64,
    pub roi_pct: f64,
    pub mean_odds: f64,
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Split bets into (dated, sorted ascending by date; undated).
///
/// The sort is stable, so bets on the same day keep their input order.
pub fn chronological(bets: Vec<SettledBet>) -> (Vec<SettledBet>, Vec<SettledBet>) {
    let (mut dated, undated): (Vec<_>, Vec<_>) = bets.into_iter().partition(|b| b.date.is_some());
    dated.sort_by_key(|b| b.date);
    (dated, undated)
}

// ---------------------------------------------------------------------------
// Running total
// ---------------------------------------------------------------------------

/// Cumulative sum: `out[i] = out[i - 1] + payouts[i]`, `out[0] = payouts[0]`.
pub fn running_total(payouts: &[f64]) -> Vec<f64> {
    payouts
        .iter()
        .scan(0.0_f64, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Cumulative curve over dated bets. Undated bets are skipped.
pub fn cumulative_curve(bets: &[SettledBet]) -> Vec<CurvePoint> {
    let dated: Vec<(&SettledBet, NaiveDate)> = bets
        .iter()
        .filter_map(|b| b.date.map(|d| (b, d)))
        .collect();
    let payouts: Vec<f64> = dated.iter().map(|(b, _)| b.payout).collect();

    dated
        .into_iter()
        .zip(running_total(&payouts))
        .map(|((bet, date), cumulative)| CurvePoint {
            date,
            match_id: bet.match_id.clone(),
            payout: bet.payout,
            cumulative,
        })
        .collect()
}

/// Largest peak-to-trough fall of a cumulative curve, in units.
/// The curve starts from an implicit 0.0 before the first bet.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &value in cumulative {
        peak = peak.max(value);
        max_dd = max_dd.max(peak - value);
    }
    max_dd
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Overall statistics, or `None` when there are no bets (ROI undefined).
pub fn overall_stats(bets: &[SettledBet]) -> Option<OverallStats> {
    if bets.is_empty() {
        return None;
    }

    let count = bets.len();
    let total_pl: f64 = bets.iter().map(|b| b.payout).sum();
    let mean_odds = bets.iter().map(|b| b.odds).sum::<f64>() / count as f64;
    let tally = |outcome: BetOutcome| bets.iter().filter(|b| b.outcome == outcome).count();

    let wins = tally(BetOutcome::Win);
    let half_wins = tally(BetOutcome::HalfWin);
    let voids = tally(BetOutcome::Void);
    let decided = count - voids;
    let hit_rate = if decided > 0 {
        Some((wins + half_wins) as f64 / decided as f64)
    } else {
        None
    };

    Some(OverallStats {
        count,
        total_pl,
        roi_pct: 100.0 * total_pl / count as f64,
        mean_odds,
        wins,
        half_wins,
        voids,
        half_losses: tally(BetOutcome::HalfLoss),
        losses: tally(BetOutcome::Loss),
        hit_rate,
    })
}

/// Per-season rows, most recent season label first.
///
/// Bets without a season label are left out; dates play no role here.
pub fn per_period_stats(bets: &[SettledBet]) -> Vec<PeriodStats> {
    let mut by_season: BTreeMap<&str, Vec<&SettledBet>> = BTreeMap::new();
    for bet in bets {
        if let Some(season) = bet.season.as_deref() {
            by_season.entry(season).or_default().push(bet);
        }
    }

    by_season
        .into_iter()
        .rev()
        .map(|(season, group)| {
            let count = group.len();
            let total_pl: f64 = group.iter().map(|b| b.payout).sum();
            let mean_pl = total_pl / count as f64;
            PeriodStats {
                season: season.to_string(),
                count,
                total_pl,
                mean_pl,
                roi_pct: mean_pl * 100.0,
                mean_odds: group.iter().map(|b| b.odds).sum::<f64>() / count as f64,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HandicapLine, Side, UNIT_STAKE};
    use rust_decimal::Decimal;

    fn bet(
        id: &str,
        payout: f64,
        odds: f64,
        date: Option<(i32, u32, u32)>,
        season: Option<&str>,
    ) -> SettledBet {
        let outcome = if payout > 0.0 && payout < odds - 1.0 {
            BetOutcome::HalfWin
        } else if payout > 0.0 {
            BetOutcome::Win
        } else if payout == 0.0 {
            BetOutcome::Void
        } else if payout > -1.0 {
            BetOutcome::HalfLoss
        } else {
            BetOutcome::Loss
        };
        SettledBet {
            match_id: id.to_string(),
            competition: "Serie A".to_string(),
            side: Side::Home,
            line: HandicapLine::ZERO,
            stake: UNIT_STAKE,
            odds,
            margin: Decimal::ZERO,
            outcome,
            payout,
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            season: season.map(str::to_string),
        }
    }

    #[test]
    fn test_running_total_basic() {
        let cum = running_total(&[0.9, -1.0, 0.45, 0.0, -0.5]);
        let expected = [0.9, -0.1, 0.35, 0.35, -0.15];
        assert_eq!(cum.len(), expected.len());
        for (a, b) in cum.iter().zip(expected) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_running_total_empty() {
        assert!(running_total(&[]).is_empty());
    }

    #[test]
    fn test_cumulative_last_equals_sum() {
        let sequences: Vec<Vec<f64>> = vec![
            vec![0.9],
            vec![-1.0, -1.0, -0.5],
            vec![0.95, 0.475, 0.0, -0.5, -1.0, 1.2, 0.0, 0.8],
            (0..200).map(|i| if i % 3 == 0 { -1.0 } else { 0.87 }).collect(),
        ];
        for payouts in sequences {
            let cum = running_total(&payouts);
            let total: f64 = payouts.iter().sum();
            assert!((cum[cum.len() - 1] - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_chronological_orders_and_splits() {
        let bets = vec![
            bet("c", 0.9, 1.9, Some((2024, 3, 1)), Some("2024")),
            bet("x", -1.0, 1.9, None, Some("2024")),
            bet("a", -1.0, 2.0, Some((2023, 8, 20)), Some("2023")),
            bet("b", 0.0, 1.8, Some((2024, 3, 1)), Some("2024")),
        ];
        let (dated, undated) = chronological(bets);
        let ids: Vec<_> = dated.iter().map(|b| b.match_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(undated.len(), 1);
        assert_eq!(undated[0].match_id, "x");
    }

    #[test]
    fn test_cumulative_curve_skips_undated() {
        let bets = vec![
            bet("a", 0.9, 1.9, Some((2024, 1, 1)), None),
            bet("b", -1.0, 1.9, None, None),
            bet("c", 0.5, 2.0, Some((2024, 1, 8)), None),
        ];
        let curve = cumulative_curve(&bets);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[1].match_id, "c");
        assert!((curve[1].cumulative - 1.4).abs() < 1e-10);
    }

    #[test]
    fn test_max_drawdown() {
        assert_eq!(max_drawdown(&[]), 0.0);
        assert!((max_drawdown(&[1.0, 2.0, 0.5, 1.5, -0.5]) - 2.5).abs() < 1e-10);
        // Losing from the start counts against the implicit zero.
        assert!((max_drawdown(&[-1.0, -2.0]) - 2.0).abs() < 1e-10);
        assert_eq!(max_drawdown(&[0.5, 1.0, 1.5]), 0.0);
    }

    #[test]
    fn test_overall_stats_empty_is_undefined() {
        assert!(overall_stats(&[]).is_none());
    }

    #[test]
    fn test_overall_stats() {
        let bets = vec![
            bet("a", 0.9, 1.9, None, None),
            bet("b", -1.0, 2.0, None, None),
            bet("c", 0.0, 1.8, None, None),
            bet("d", 0.45, 1.9, None, None),
        ];
        let stats = overall_stats(&bets).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.total_pl - 0.35).abs() < 1e-10);
        assert!((stats.roi_pct - 8.75).abs() < 1e-10);
        assert!((stats.mean_odds - 1.9).abs() < 1e-10);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.half_wins, 1);
        assert_eq!(stats.voids, 1);
        assert_eq!(stats.losses, 1);
        assert!((stats.hit_rate.unwrap() - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_overall_stats_all_void() {
        let bets = vec![bet("a", 0.0, 1.9, None, None), bet("b", 0.0, 2.1, None, None)];
        let stats = overall_stats(&bets).unwrap();
        assert_eq!(stats.roi_pct, 0.0);
        assert!(stats.hit_rate.is_none());
    }

    #[test]
    fn test_per_period_descending() {
        let bets = vec![
            bet("a", 0.9, 1.9, None, Some("2022")),
            bet("b", -1.0, 2.1, None, Some("2024")),
            bet("c", 0.5, 2.0, None, Some("2023")),
            bet("d", 1.0, 2.0, None, Some("2024")),
            bet("e", -1.0, 2.0, None, None),
        ];
        let rows = per_period_stats(&bets);
        let seasons: Vec<_> = rows.iter().map(|r| r.season.as_str()).collect();
        assert_eq!(seasons, vec!["2024", "2023", "2022"]);

        let latest = &rows[0];
        assert_eq!(latest.count, 2);
        assert!(latest.total_pl.abs() < 1e-10);
        assert!((latest.mean_odds - 2.05).abs() < 1e-10);
        assert!(latest.roi_pct.abs() < 1e-10);
    }

    #[test]
    fn test_per_period_totals_match_overall() {
        let bets: Vec<_> = (0..30)
            .map(|i| {
                let season = ["2021/2022", "2022/2023", "2023/2024"][i % 3];
                let payout = if i % 4 == 0 { -1.0 } else { 0.9 };
                bet(&format!("m{i}"), payout, 1.9, None, Some(season))
            })
            .collect();
        let rows = per_period_stats(&bets);
        let overall = overall_stats(&bets).unwrap();
        let count: usize = rows.iter().map(|r| r.count).sum();
        let total: f64 = rows.iter().map(|r| r.total_pl).sum();
        assert_eq!(count, overall.count);
        assert!((total - overall.total_pl).abs() < 1e-9);
    }
}
