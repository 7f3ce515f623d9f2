//! Outcome of a single oracle run.

use serde::{Deserialize, Serialize};

use crate::core::score::{Score, parse_score};

/// Raw oracle outcome plus its derived [`Score`].
///
/// `output` holds only the tail of what the oracle printed; the score is
/// parsed from the full output before truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Oracle exited with status 0.
    pub success: bool,
    /// Tail of the combined stdout/stderr.
    pub output: String,
    /// Oracle was killed after exceeding its timeout.
    pub timed_out: bool,
    /// Oracle could not be started or waited on.
    pub invocation_error: bool,
    pub score: Score,
}

impl Verdict {
    /// Build a verdict from a completed (or timed out) oracle process.
    pub fn from_output(success: bool, output: &str, timed_out: bool, tail_chars: usize) -> Self {
        let mut score = parse_score(output);
        if timed_out {
            score.has_error = true;
        }
        Self {
            success: success && !timed_out,
            output: tail(output, tail_chars).to_string(),
            timed_out,
            invocation_error: false,
            score,
        }
    }

    /// Verdict for an oracle that could not be invoked at all.
    pub fn invocation_failure(message: &str) -> Self {
        Self {
            success: false,
            output: message.to_string(),
            timed_out: false,
            invocation_error: true,
            score: Score::WORST,
        }
    }

    /// Exit status and parsed counters both report a clean pass.
    pub fn is_full_pass(&self) -> bool {
        self.success && self.score.is_full_pass()
    }
}

/// Last `max_chars` characters of `text`, split on a char boundary.
pub fn tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
