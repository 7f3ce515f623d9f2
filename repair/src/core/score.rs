//! Ranking key derived from oracle output.
//!
//! [`Score`] carries a total order where "greater" means "preferred":
//! more passing tests first, then fewer failures, then no error marker.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ordered ranking key `(passed, failed, has_error)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub passed: u32,
    pub failed: u32,
    pub has_error: bool,
}

impl Score {
    /// Sentinel below every score an oracle run can produce.
    ///
    /// `failed = u32::MAX` stands in for an unbounded failure count.
    pub const WORST: Score = Score {
        passed: 0,
        failed: u32::MAX,
        has_error: true,
    };

    pub fn new(passed: u32, failed: u32, has_error: bool) -> Self {
        Self {
            passed,
            failed,
            has_error,
        }
    }

    /// No failures, no error marker, and at least one passing test.
    pub fn is_full_pass(&self) -> bool {
        self.failed == 0 && !self.has_error && self.passed > 0
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.passed
            .cmp(&other.passed)
            .then_with(|| other.failed.cmp(&self.failed))
            .then_with(|| other.has_error.cmp(&self.has_error))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = if self.failed == u32::MAX {
            "inf".to_string()
        } else {
            self.failed.to_string()
        };
        write!(
            f,
            "passed={} failed={} error={}",
            self.passed, failed, self.has_error
        )
    }
}

static PASSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+passed").unwrap());
static FAILED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+failed").unwrap());
static ERROR_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s+errors?\b").unwrap());
// Error markers that are not ordinary assertion failures: pytest collection
// errors, the pytest ERRORS banner, and compiler-style diagnostics.
static ERROR_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^ERROR\b|=+ ERRORS =+|^error(\[\w+\])?:").unwrap()
});

/// Best-effort parse of test-runner output into a [`Score`].
///
/// Missing or unparseable counters default to zero; this never fails.
pub fn parse_score(output: &str) -> Score {
    let passed = first_count(&PASSED_RE, output);
    let failed = first_count(&FAILED_RE, output);
    let error_count = ERROR_COUNT_RE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .any(|n| n > 0);
    let has_error = error_count || ERROR_MARKER_RE.is_match(output);
    Score {
        passed,
        failed,
        has_error,
    }
}

fn first_count(re: &Regex, output: &str) -> u32 {
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
