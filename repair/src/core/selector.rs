//! Deterministic selection of the best candidate.

use std::fmt;

use crate::core::score::Score;
use crate::core::types::{BranchResult, RoundResult};

/// Returned by [`select_best`] when no branch produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyRound {
    pub round: u32,
}

impl fmt::Display for EmptyRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} produced no usable candidate", self.round)
    }
}

impl std::error::Error for EmptyRound {}

/// Highest-scoring branch of a round; the first generated wins ties.
pub fn select_best(result: &RoundResult) -> Result<&BranchResult, EmptyRound> {
    let mut branches = result.branches.iter();
    let first = branches.next().ok_or(EmptyRound {
        round: result.round,
    })?;
    Ok(branches.fold(first, |best, branch| {
        if branch.score > best.score {
            branch
        } else {
            best
        }
    }))
}

/// Round-best entry retained across rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Best {
    pub round: u32,
    pub result: BranchResult,
}

/// Globally best candidate seen so far. `None` is the "no candidate" sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestSoFar(pub Option<Best>);

impl BestSoFar {
    pub fn new() -> Self {
        Self(None)
    }

    /// Score of the current best, or [`Score::WORST`] for the sentinel.
    pub fn score(&self) -> Score {
        self.0
            .as_ref()
            .map_or(Score::WORST, |best| best.result.score)
    }

    pub fn best(&self) -> Option<&Best> {
        self.0.as_ref()
    }
}

/// Replace `current` only if the round best is strictly better.
pub fn merge_best(current: BestSoFar, round: u32, round_best: &BranchResult) -> BestSoFar {
    if round_best.score > current.score() {
        BestSoFar(Some(Best {
            round,
            result: round_best.clone(),
        }))
    } else {
        current
    }
}
