//! Default line selection with a per-session memory slot.
//!
//! Switching competition changes which lines exist, so the last line a
//! session picked is only reused while it is still a candidate.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{BacktestError, HandicapLine};

/// Pick the line to preselect from `candidates`.
///
/// Order of preference: the remembered line, -0.5, 0.0, then the smallest
/// candidate. Callers report an empty set as `EmptyCandidateSet` before
/// getting here; passing one anyway yields `InvalidLine`.
pub fn resolve_default(
    candidates: &[HandicapLine],
    remembered: Option<HandicapLine>,
) -> Result<HandicapLine, BacktestError> {
    if let Some(line) = remembered.filter(|l| candidates.contains(l)) {
        return Ok(line);
    }

    let half_goal = HandicapLine::new(dec!(-0.5))?;
    if candidates.contains(&half_goal) {
        return Ok(half_goal);
    }
    if candidates.contains(&HandicapLine::ZERO) {
        return Ok(HandicapLine::ZERO);
    }

    candidates
        .iter()
        .min()
        .copied()
        .ok_or_else(|| BacktestError::InvalidLine("no candidate lines to choose from".into()))
}

/// The remembered selection of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionMemory {
    last_line: Option<HandicapLine>,
}

impl SelectionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_line(&self) -> Option<HandicapLine> {
        self.last_line
    }

    /// The line that would be preselected for `candidates`.
    pub fn default_for(&self, candidates: &[HandicapLine]) -> Result<HandicapLine, BacktestError> {
        resolve_default(candidates, self.last_line)
    }

    /// Resolve the effective line and remember it.
    ///
    /// An explicit `requested` line must be one of the candidates; without
    /// one, the default is used.
    pub fn choose(
        &mut self,
        candidates: &[HandicapLine],
        requested: Option<HandicapLine>,
    ) -> Result<HandicapLine, BacktestError> {
        let chosen = match requested {
            Some(line) if candidates.contains(&line) => line,
            Some(line) => return Err(BacktestError::LineUnavailable { line }),
            None => self.default_for(candidates)?,
        };
        debug!(line = %chosen, previous = ?self.last_line.map(|l| l.to_string()), "Line selected");
        self.last_line = Some(chosen);
        Ok(chosen)
    }
}
