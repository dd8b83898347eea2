//! SNIPER HA: Asian Handicap strategy backtester
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod strategy;
pub mod backtest;
pub mod storage;
pub mod dashboard;
