//! Line resolution between the home-relative storage convention and the
//! side-relative lines a user picks.
//!
//! The database stores every `HA_Line` from the home team's point of view.
//! Betting the away side at the same market means the displayed line is the
//! negation of the stored one (Home -0.5 is Away +0.5).

use std::collections::BTreeSet;

use crate::types::{HandicapLine, Side};

/// Convert stored (home-relative) lines into the lines shown for `side`,
/// deduplicated and sorted ascending.
pub fn to_display_lines<I>(stored_lines: I, side: Side) -> Vec<HandicapLine>
where
    I: IntoIterator<Item = HandicapLine>,
{
    stored_lines
        .into_iter()
        .map(|line| match side {
            Side::Home => line,
            Side::Away => line.negate(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Convert a line picked for `side` back into the stored lookup key.
pub fn to_stored_line(display_line: HandicapLine, side: Side) -> HandicapLine {
    match side {
        Side::Home => display_line,
        Side::Away => display_line.negate(),
    }
}
