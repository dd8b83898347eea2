//! SNIPER HA: Asian Handicap strategy backtester
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads the match database and dispatches the CLI command: list
//! competitions and lines, run a backtest, serve the dashboard API, or
//! print a saved report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use sniper_ha::backtest::{BacktestReport, Backtester};
use sniper_ha::config::{self, AppConfig};
use sniper_ha::dashboard::{self, DashboardState};
use sniper_ha::data;
use sniper_ha::storage;
use sniper_ha::strategy::SelectionMemory;
use sniper_ha::types::{HandicapLine, Side};

const BANNER: &str = r#"
 ____  _   _ ___ ____  _____ ____    _   _    _
/ ___|| \ | |_ _|  _ \| ____|  _ \  | | | |  / \
\___ \|  \| || || |_) |  _| | |_) | | |_| | / _ \
 ___) | |\  || ||  __/| |___|  _ <  |  _  |/ ___ \
|____/|_| \_|___|_|   |_____|_| \_\ |_| |_/_/   \_\

  Asian Handicap strategy backtester
  v0.1.0
"#;

#[derive(Parser, Debug)]
#[command(name = "sniper-ha", version, about = "Asian Handicap strategy backtester")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "SNIPER_CONFIG", default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the competitions in the match database
    Competitions,

    /// List the handicap lines available for a side
    Lines {
        #[arg(long)]
        competition: String,

        #[arg(long, default_value = "home")]
        side: Side,
    },

    /// Backtest one (competition, side, line) selection
    Run {
        #[arg(long)]
        competition: Option<String>,

        #[arg(long)]
        side: Option<Side>,

        /// Side-relative line, e.g. -0.5 or +0.25
        #[arg(long, allow_hyphen_values = true)]
        line: Option<HandicapLine>,

        /// Write the JSON report to this path
        #[arg(long)]
        output: Option<String>,
    },

    /// Serve the dashboard API until Ctrl+C
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a previously saved JSON report
    Report {
        /// Report file (defaults to [report].output_path)
        #[arg(long)]
        path: Option<String>,

        /// Delete the report file after printing it
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %cli.config,
        csv_path = %cfg.data.csv_path,
        "SNIPER HA starting up"
    );

    // Saved reports don't need the match database.
    if let Command::Report { path, clear } = &cli.command {
        let path = path
            .clone()
            .or_else(|| cfg.report.output_path.clone())
            .unwrap_or_else(|| storage::DEFAULT_REPORT_FILE.to_string());
        match storage::load_report(Some(&path))? {
            Some(report) => print_report(&report),
            None => println!("No saved report at {path}"),
        }
        if *clear {
            storage::delete_report(Some(&path))?;
            info!(path = %path, "Report deleted");
        }
        return Ok(());
    }

    let loaded = data::load_matches(&cfg.data.csv_path, cfg.data.delimiter)?;
    let backtester = Backtester::new(loaded.records);
    if backtester.is_empty() {
        warn!("Match database has no playable rows");
    }

    match cli.command {
        Command::Competitions => {
            for competition in backtester.competitions() {
                println!("{competition}");
            }
        }
        Command::Lines { competition, side } => {
            let lines = backtester.display_lines(&competition, side)?;
            let default_line = SelectionMemory::new().default_for(&lines)?;
            for line in &lines {
                let marker = if *line == default_line { " (default)" } else { "" };
                println!("{line}{marker}");
            }
        }
        Command::Run {
            competition,
            side,
            line,
            output,
        } => {
            let competition = competition
                .or_else(|| cfg.backtest.competition.clone())
                .context("No competition given (use --competition or [backtest].competition)")?;
            let side = side.unwrap_or(cfg.backtest.side);
            let requested = line.or(cfg.backtest.line);

            let mut memory = SelectionMemory::new();
            let line = backtester.select_line(&competition, side, requested, &mut memory)?;
            let report = backtester.run(&competition, side, line)?;
            print_report(&report);

            if let Some(path) = output.or_else(|| cfg.report.output_path.clone()) {
                storage::save_report(&report, Some(&path))?;
                info!(path = %path, "Report written");
            }
        }
        Command::Serve { port } => {
            let port = port.unwrap_or(cfg.dashboard.port);
            let state = Arc::new(DashboardState::with_capacity(
                backtester,
                cfg.dashboard.session_capacity,
            ));
            dashboard::serve(state, port).await?;
        }
        Command::Report { .. } => {}
    }

    Ok(())
}

/// Print a human-readable report summary and the per-season table.
fn print_report(report: &BacktestReport) {
    let o = &report.overall;
    println!(
        "{} | {} {} (stored {})",
        report.competition, report.side, report.line, report.stored_line
    );
    println!(
        "Bets: {}  Excluded: {}  Undated: {}",
        o.count, report.excluded, report.undated
    );
    println!(
        "Total P/L: {:+.2}u  ROI: {:+.2}%  Mean odds: {:.3}  Max drawdown: {:.2}u",
        o.total_pl, o.roi_pct, o.mean_odds, report.max_drawdown
    );
    println!(
        "W {}  HW {}  V {}  HL {}  L {}  Hit rate: {}",
        o.wins,
        o.half_wins,
        o.voids,
        o.half_losses,
        o.losses,
        o.hit_rate
            .map(|h| format!("{:.1}%", h * 100.0))
            .unwrap_or_else(|| "n/a".into())
    );

    if report.seasons.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<12} {:>6} {:>10} {:>10} {:>9} {:>9}",
        "Season", "Bets", "P/L", "Mean P/L", "ROI %", "Odds"
    );
    for s in &report.seasons {
        println!(
            "{:<12} {:>6} {:>+10.2} {:>+10.3} {:>+9.2} {:>9.3}",
            s.season, s.count, s.total_pl, s.mean_pl, s.roi_pct, s.mean_odds
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sniper_ha=info"));

    let json_logging = std::env::var("SNIPER_LOG_JSON").is_ok();

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
