//! Match data ingestion.
//!
//! The backtest core only sees typed `MatchRecord`s; everything about the
//! on-disk format lives here.

pub mod loader;

pub use loader::{load_matches, read_matches, LoadSummary, LoadedMatches};
