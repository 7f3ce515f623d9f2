//! Diagnostic round logs under a user-chosen log directory.
//!
//! Layout:
//!
//! ```text
//! <log_dir>/round-<n>/meta.json
//! <log_dir>/round-<n>/branch-<k>.candidate
//! <log_dir>/round-<n>/branch-<k>.oracle.log
//! <log_dir>/summary.json
//! ```
//!
//! Logs are never read back by the search.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::score::Score;
use crate::core::types::RoundResult;

#[derive(Debug, Clone, Serialize)]
pub struct BranchMeta {
    pub branch: usize,
    pub diversity: f32,
    pub score: Score,
    pub success: bool,
    pub timed_out: bool,
    pub invocation_error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureMeta {
    pub branch: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundMeta {
    pub round: u32,
    /// Branch index elected as round best, if any.
    pub elected: Option<usize>,
    pub branches: Vec<BranchMeta>,
    pub failures: Vec<FailureMeta>,
}

impl RoundMeta {
    pub fn from_round(result: &RoundResult, elected: Option<usize>) -> Self {
        Self {
            round: result.round,
            elected,
            branches: result
                .branches
                .iter()
                .map(|b| BranchMeta {
                    branch: b.branch,
                    diversity: b.candidate.diversity,
                    score: b.score,
                    success: b.verdict.success,
                    timed_out: b.verdict.timed_out,
                    invocation_error: b.verdict.invocation_error,
                })
                .collect(),
            failures: result
                .failures
                .iter()
                .map(|f| FailureMeta {
                    branch: f.branch,
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
}

impl RoundPaths {
    pub fn new(log_dir: &Path, round: u32) -> Self {
        let dir = log_dir.join(format!("round-{round}"));
        Self {
            meta_path: dir.join("meta.json"),
            dir,
        }
    }

    pub fn candidate_path(&self, branch: usize) -> PathBuf {
        self.dir.join(format!("branch-{branch}.candidate"))
    }

    pub fn oracle_log_path(&self, branch: usize) -> PathBuf {
        self.dir.join(format!("branch-{branch}.oracle.log"))
    }
}

/// Write one round's meta, candidates, and oracle output tails.
pub fn write_round(
    log_dir: &Path,
    result: &RoundResult,
    elected: Option<usize>,
) -> Result<RoundPaths> {
    let paths = RoundPaths::new(log_dir, result.round);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create round dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep logs stable.
    write_json(&paths.meta_path, &RoundMeta::from_round(result, elected))?;
    for branch in &result.branches {
        write_text(&paths.candidate_path(branch.branch), &branch.candidate.content)?;
        write_text(&paths.oracle_log_path(branch.branch), &branch.verdict.output)?;
    }

    Ok(paths)
}

/// Write the end-of-run summary as `<log_dir>/summary.json`.
pub fn write_summary<T: Serialize>(log_dir: &Path, summary: &T) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;
    let path = log_dir.join("summary.json");
    write_json(&path, summary)?;
    Ok(path)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchFailure, BranchResult, Candidate};
    use crate::core::verdict::Verdict;

    #[test]
    fn round_paths_are_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = RoundPaths::new(temp.path(), 2);

        assert!(paths.dir.ends_with("round-2"));
        assert!(paths.meta_path.ends_with("round-2/meta.json"));
        assert!(paths.candidate_path(1).ends_with("branch-1.candidate"));
        assert!(paths.oracle_log_path(1).ends_with("branch-1.oracle.log"));
    }

    #[test]
    fn writes_round_with_failures() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verdict = Verdict::from_output(false, "1 failed, 5 passed", false, 100);
        let result = RoundResult {
            round: 1,
            branches: vec![BranchResult {
                branch: 0,
                candidate: Candidate {
                    content: "fixed".to_string(),
                    diversity: 0.3,
                },
                score: verdict.score,
                verdict,
            }],
            failures: vec![BranchFailure {
                branch: 1,
                reason: "no <file> block".to_string(),
            }],
        };

        let paths = write_round(temp.path(), &result, Some(0)).expect("write round");

        assert_eq!(
            fs::read_to_string(paths.candidate_path(0)).expect("candidate"),
            "fixed"
        );
        assert!(!paths.candidate_path(1).exists());
        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta_path).expect("meta"))
                .expect("parse meta");
        assert_eq!(meta["elected"], 0);
        assert_eq!(meta["branches"][0]["score"]["passed"], 5);
        assert_eq!(meta["failures"][0]["branch"], 1);
    }
}
