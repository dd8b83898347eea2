//! End-to-end pipeline: CSV on disk → loader → line selection → backtest
//! → JSON report on disk.

use sniper_ha::backtest::Backtester;
use sniper_ha::data::load_matches;
use sniper_ha::storage::{delete_report, load_report, save_report};
use sniper_ha::strategy::SelectionMemory;
use sniper_ha::types::{BacktestError, BetOutcome, HandicapLine, Side};

const MATCHES_CSV: &str = "\
Id;Date;Competicao;Temporada;HG;AG;HA_Line;HA_Odd_H;HA_Odd_A
a1;12/05/2024;Brazil - Serie A;2024;2;1;-0,5;1,90;2,00
a2;20/05/2024;Brazil - Serie A;2024;1;1;0;1,95;1,95
a3;02/06/2023;Brazil - Serie A;2023;0;2;-0,5;1,85;2,05
a4;;Brazil - Serie A;2023;3;0;-0,5;1,90;2,00
a5;03/06/2024;Brazil - Serie A;2024;1;0;-0,5;1,90;
a6;10/06/2024;Brazil - Serie A;2024;;;-0,5;1,90;2,00
b1;01/02/2024;Serie B;2024;1;0;-0,25;;2,10
";

fn temp_path(ext: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("sniper_pipeline_{}.{ext}", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn line(v: f64) -> HandicapLine {
    HandicapLine::from_f64(v).unwrap()
}

fn load_fixture() -> Backtester {
    let path = temp_path("csv");
    std::fs::write(&path, MATCHES_CSV).unwrap();
    let loaded = load_matches(&path, None).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.summary.rows, 7);
    assert_eq!(loaded.summary.skipped_no_result, 1);
    Backtester::new(loaded.records)
}

#[test]
fn test_home_backtest_end_to_end() {
    let bt = load_fixture();
    assert_eq!(bt.competitions(), vec!["Brazil - Serie A", "Serie B"]);

    let mut memory = SelectionMemory::new();
    let chosen = bt
        .select_line("Brazil - Serie A", Side::Home, None, &mut memory)
        .unwrap();
    assert_eq!(chosen, line(-0.5));

    let report = bt.run("Brazil - Serie A", Side::Home, chosen).unwrap();
    // a1, a3, a4 settle; a5 has no away odds.
    assert_eq!(report.matched, 4);
    assert_eq!(report.excluded, 1);
    assert_eq!(report.overall.count, 3);
    assert_eq!(report.undated, 1);

    // a1: 2-1 at -0.5 → +0.90
    let a1 = report.bets.iter().find(|b| b.match_id == "a1").unwrap();
    assert_eq!(a1.outcome, BetOutcome::Win);
    assert!((a1.payout - 0.90).abs() < 1e-10);

    // a3 (2023) before a1 (2024); undated a4 last.
    let order: Vec<_> = report.bets.iter().map(|b| b.match_id.as_str()).collect();
    assert_eq!(order, vec!["a3", "a1", "a4"]);
    assert_eq!(report.curve.len(), 2);

    // 0.9 - 1.0 + 0.9
    assert!((report.overall.total_pl - 0.8).abs() < 1e-10);
    assert!((report.overall.roi_pct - 80.0 / 3.0).abs() < 1e-9);

    let seasons: Vec<_> = report.seasons.iter().map(|s| s.season.as_str()).collect();
    assert_eq!(seasons, vec!["2024", "2023"]);
}

#[test]
fn test_away_view_mirrors_stored_line() {
    let bt = load_fixture();
    let lines = bt.display_lines("Brazil - Serie A", Side::Away).unwrap();
    assert_eq!(lines, vec![line(0.0), line(0.5)]);

    let report = bt.run("Brazil - Serie A", Side::Away, line(0.5)).unwrap();
    assert_eq!(report.stored_line, line(-0.5));

    // a1: 1-2 for the away side at +0.5 → margin -0.5 → full loss.
    let a1 = report.bets.iter().find(|b| b.match_id == "a1").unwrap();
    assert_eq!(a1.outcome, BetOutcome::Loss);
    assert!((a1.payout + 1.0).abs() < 1e-10);
}

#[test]
fn test_level_line_draw_is_void() {
    let bt = load_fixture();
    let report = bt.run("Brazil - Serie A", Side::Home, line(0.0)).unwrap();
    assert_eq!(report.overall.count, 1);
    assert_eq!(report.overall.voids, 1);
    assert_eq!(report.overall.total_pl, 0.0);
    assert_eq!(report.overall.roi_pct, 0.0);
}

#[test]
fn test_undefined_roi_is_not_zero() {
    let bt = load_fixture();
    // b1 has a line but no home odds.
    let err = bt.run("Serie B", Side::Home, line(-0.25)).unwrap_err();
    assert!(matches!(err, BacktestError::UndefinedRoi { .. }));
    assert!(err.to_string().contains("ROI undefined"));
}

#[test]
fn test_unknown_competition_has_no_lines() {
    let bt = load_fixture();
    let mut memory = SelectionMemory::new();
    let err = bt
        .select_line("La Liga", Side::Home, None, &mut memory)
        .unwrap_err();
    assert!(matches!(err, BacktestError::EmptyCandidateSet { .. }));
    assert!(memory.last_line().is_none());
}

#[test]
fn test_report_survives_storage() {
    let bt = load_fixture();
    let report = bt.run("Brazil - Serie A", Side::Home, line(-0.5)).unwrap();

    let path = temp_path("json");
    save_report(&report, Some(&path)).unwrap();
    let loaded = load_report(Some(&path)).unwrap().unwrap();
    delete_report(Some(&path)).unwrap();

    assert_eq!(loaded.line, report.line);
    assert_eq!(loaded.stored_line, report.stored_line);
    assert_eq!(loaded.bets.len(), report.bets.len());
    assert_eq!(loaded.seasons.len(), report.seasons.len());
    assert!((loaded.overall.total_pl - report.overall.total_pl).abs() < 1e-10);
}
