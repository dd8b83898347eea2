//! CSV match database loader.
//!
//! Turns the raw export (one row per match, Portuguese column names,
//! numbers possibly written with a decimal comma) into typed
//! `MatchRecord`s. Unparseable numeric cells become "missing" rather
//! than zero, so the settlement step can exclude them.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::*;
use serde::Serialize;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::types::{HandicapLine, MatchRecord};

const COL_HOME_GOALS: &str = "HG";
const COL_AWAY_GOALS: &str = "AG";
const COL_LINE: &str = "HA_Line";
const COL_HOME_ODDS: &str = "HA_Odd_H";
const COL_AWAY_ODDS: &str = "HA_Odd_A";
const COL_COMPETITION: &str = "Competicao";
const COL_DATE: &str = "Date";
const COL_SEASON: &str = "Temporada";
const COL_ID: &[&str] = &["Id", "ID", "id", "Match_ID"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

// ---------------------------------------------------------------------------
// Load result
// ---------------------------------------------------------------------------

/// Row accounting for one load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub loaded: usize,
    /// Rows without a usable final score (unplayed or corrupt).
    pub skipped_no_result: usize,
    /// Rows whose `HA_Line` was present but not a quarter line.
    pub invalid_lines: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedMatches {
    pub records: Vec<MatchRecord>,
    pub summary: LoadSummary,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Load the match database from a CSV file.
///
/// With `delimiter = None` the delimiter is sniffed from the header line.
pub fn load_matches(path: &str, delimiter: Option<char>) -> Result<LoadedMatches> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read match database: {path}"))?;
    let delimiter = match delimiter {
        Some(c) => u8::try_from(c).with_context(|| format!("Delimiter must be ASCII: {c:?}"))?,
        None => detect_delimiter(contents.lines().next().unwrap_or_default()),
    };

    let loaded = read_matches(contents.as_bytes(), delimiter)
        .with_context(|| format!("Failed to parse match database: {path}"))?;

    info!(
        path,
        rows = loaded.summary.rows,
        loaded = loaded.summary.loaded,
        skipped = loaded.summary.skipped_no_result,
        "Match database loaded"
    );
    if loaded.summary.invalid_lines > 0 {
        warn!(
            count = loaded.summary.invalid_lines,
            "Handicap lines off the 0.25 grid were treated as missing"
        );
    }
    Ok(loaded)
}

/// Parse CSV from any reader.
pub fn read_matches<R: Read>(reader: R, delimiter: u8) -> Result<LoadedMatches> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let required = [
        COL_HOME_GOALS,
        COL_AWAY_GOALS,
        COL_LINE,
        COL_HOME_ODDS,
        COL_AWAY_ODDS,
        COL_COMPETITION,
    ];
    let missing: Vec<&str> = required.iter().copied().filter(|&c| column(c).is_none()).collect();
    if !missing.is_empty() {
        bail!("Missing required columns: {}", missing.join(", "));
    }

    // Checked above.
    let idx = |name: &str| column(name).unwrap_or_default();
    let (hg_i, ag_i, line_i) = (idx(COL_HOME_GOALS), idx(COL_AWAY_GOALS), idx(COL_LINE));
    let (oh_i, oa_i, comp_i) = (idx(COL_HOME_ODDS), idx(COL_AWAY_ODDS), idx(COL_COMPETITION));
    let date_i = column(COL_DATE);
    let season_i = column(COL_SEASON);
    let id_i = COL_ID.iter().find_map(|&name| column(name));

    let mut summary = LoadSummary::default();
    let mut records = Vec::new();

    for (row, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", row + 1))?;
        summary.rows += 1;
        let cell = |i: usize| record.get(i).unwrap_or_default();
        let optional_cell = |i: Option<usize>| i.and_then(|i| record.get(i)).unwrap_or_default();

        let goals = (parse_goals(cell(hg_i)), parse_goals(cell(ag_i)));
        let (Some(home_goals), Some(away_goals)) = goals else {
            debug!(row = row + 1, "Skipping row without a final score");
            summary.skipped_no_result += 1;
            continue;
        };

        let raw_line = cell(line_i);
        let line = parse_decimal(raw_line).and_then(|d| HandicapLine::new(d).ok());
        if line.is_none() && parse_decimal(raw_line).is_some() {
            summary.invalid_lines += 1;
        }

        let id = match optional_cell(id_i) {
            "" => format!("row-{}", row + 1),
            id => id.to_string(),
        };
        let season = Some(optional_cell(season_i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        records.push(MatchRecord {
            id,
            competition: cell(comp_i).to_string(),
            season,
            date: parse_date(optional_cell(date_i)),
            home_goals,
            away_goals,
            line,
            home_odds: parse_number(cell(oh_i)),
            away_odds: parse_number(cell(oa_i)),
        });
    }

    summary.loaded = records.len();
    Ok(LoadedMatches { records, summary })
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Pick `;` for semicolon-separated exports, `,` otherwise.
pub fn detect_delimiter(header: &str) -> u8 {
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Rewrite a locale-formatted number into `1234.56` form.
///
/// With both separators present, the last one is the decimal mark.
fn normalize_numeric(raw: &str) -> Option<String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s == "-" {
        return None;
    }
    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };
    Some(normalized)
}

/// Parse a finite float, `None` when absent or garbage.
pub fn parse_number(raw: &str) -> Option<f64> {
    normalize_numeric(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse an exact decimal (used for handicap lines).
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = normalize_numeric(raw)?;
    let unsigned = s.strip_prefix('+').unwrap_or(&s);
    Decimal::from_str(unsigned).ok()
}

/// Goals must be a non-negative whole number (`"2"`, `"2.0"` and `"2,0"` are all fine).
pub fn parse_goals(raw: &str) -> Option<u32> {
    let value = parse_decimal(raw)?;
    if value.is_sign_negative() && !value.is_zero() || !value.fract().is_zero() {
        return None;
    }
    value.to_u32()
}

/// Parse the date formats seen in exports; day-first for slashed dates.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
