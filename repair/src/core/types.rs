//! Shared value types for the repair search.
//!
//! These types carry no I/O and no identity; the search, round driver and
//! selector exchange them by value or shared reference.

use serde::{Deserialize, Serialize};

use crate::core::score::Score;
use crate::core::verdict::Verdict;

/// Input handed to the generator for one round.
///
/// Rebuilt at the start of every round and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Current committed artifact content.
    pub artifact: String,
    /// Oracle output tail guiding the next attempt.
    pub feedback: String,
}

/// A proposed full replacement for the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub content: String,
    /// Diversity (temperature) the generator was asked to use.
    pub diversity: f32,
}

/// One evaluated branch of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchResult {
    /// Zero-based generation index within the round.
    pub branch: usize,
    pub candidate: Candidate,
    pub score: Score,
    pub verdict: Verdict,
}

/// A branch whose generation produced no usable candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub branch: usize,
    pub reason: String,
}

/// Everything produced by one round, in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    /// One-based round number.
    pub round: u32,
    pub branches: Vec<BranchResult>,
    pub failures: Vec<BranchFailure>,
}

impl RoundResult {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}
