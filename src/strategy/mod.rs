//! Strategy selection: which handicap line a backtest runs at.
//!
//! `lines` maps between stored (home-relative) and displayed (side-relative)
//! lines; `selection` picks the default line for a session.

pub mod lines;
pub mod selection;

pub use lines::{to_display_lines, to_stored_line};
pub use selection::{resolve_default, SelectionMemory};
