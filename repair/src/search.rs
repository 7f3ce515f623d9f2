//! Search controller for `repair run`.
//!
//! Checks the artifact once, then runs up to `max_rounds` rounds of
//! generate-evaluate-select. The artifact is only ever written by a commit at a
//! terminal state; every intermediate evaluation is restored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::candidate::CandidateGenerator;
use crate::core::score::Score;
use crate::core::selector::{BestSoFar, merge_best, select_best};
use crate::core::types::{BranchResult, Context, RoundResult};
use crate::io::artifact::Artifact;
use crate::io::generator::Generator;
use crate::io::isolation::Isolation;
use crate::io::oracle::{Oracle, OracleRequest};
use crate::round::{RoundConfig, run_round};

/// Limits and per-call settings for one search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_rounds: u32,
    pub round: RoundConfig,
    pub oracle: OracleRequest,
}

/// Cooperative cancellation, checked at round boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reason why `run_search` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStop {
    /// A full pass was committed. `round` is `None` when the artifact already passed.
    Shipped { round: Option<u32> },
    /// Rounds ran out; `committed` is set when a better partial fix was written.
    Exhausted { committed: bool },
    /// A round produced no usable candidate. Nothing was written.
    Aborted { round: u32 },
    /// Cancelled before `round` started. Nothing was written.
    Cancelled { round: u32 },
}

/// Best candidate of the search, without its content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSummary {
    pub round: u32,
    pub branch: usize,
    pub diversity: f32,
    pub score: Score,
}

impl BestSummary {
    fn from_branch(round: u32, result: &BranchResult) -> Self {
        Self {
            round,
            branch: result.branch,
            diversity: result.candidate.diversity,
            score: result.score,
        }
    }
}

/// Summary of a search invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub stop: SearchStop,
    pub rounds_run: u32,
    /// Score of the artifact before any candidate was tried.
    pub initial: Score,
    /// The committed candidate when shipped, otherwise the best seen.
    pub best: Option<BestSummary>,
}

/// Progress handed to the `on_round` callback after each round.
#[derive(Debug, Clone, Copy)]
pub struct RoundReport<'a> {
    pub result: &'a RoundResult,
    /// Branch elected as round best; `None` for an empty round.
    pub elected: Option<usize>,
    /// Best score across all rounds so far.
    pub best: Score,
}

/// Repair `artifact` until the oracle passes, rounds run out, a round comes back
/// empty, or `cancel` is set.
///
/// Errors only on artifact I/O failures; generator and oracle failures are
/// folded into branch failures and verdicts.
pub fn run_search<G, O, F>(
    artifact: &mut Artifact,
    candidates: &CandidateGenerator,
    generator: &G,
    oracle: &O,
    config: &SearchConfig,
    cancel: &CancelFlag,
    mut on_round: F,
) -> Result<SearchOutcome>
where
    G: Generator + Sync + ?Sized,
    O: Oracle + ?Sized,
    F: FnMut(&RoundReport<'_>),
{
    let mut isolation = Isolation::new(artifact, oracle, config.oracle.clone());

    let baseline = isolation.check();
    info!(score = %baseline.score, success = baseline.success, "checked artifact");
    if baseline.success {
        return Ok(SearchOutcome {
            stop: SearchStop::Shipped { round: None },
            rounds_run: 0,
            initial: baseline.score,
            best: None,
        });
    }

    let mut best = BestSoFar::new();
    let baseline_feedback = baseline.output;
    let mut rounds_run = 0u32;
    let finish = |stop: SearchStop, rounds_run: u32, best: &BestSoFar| SearchOutcome {
        stop,
        rounds_run,
        initial: baseline.score,
        best: best
            .best()
            .map(|b| BestSummary::from_branch(b.round, &b.result)),
    };

    for round in 1..=config.max_rounds {
        if cancel.is_cancelled() {
            info!(round, "search cancelled");
            return Ok(finish(SearchStop::Cancelled { round }, rounds_run, &best));
        }

        // Feedback tracks the best candidate so far, not the latest round.
        let feedback = best
            .best()
            .map_or(baseline_feedback.as_str(), |b| b.result.verdict.output.as_str());
        let context = Context {
            artifact: isolation.read()?,
            feedback: feedback.to_string(),
        };
        let result = run_round(
            round,
            candidates,
            generator,
            &mut isolation,
            &context,
            &config.round,
        )?;
        rounds_run = round;

        let round_best = match select_best(&result) {
            Ok(round_best) => round_best,
            Err(empty) => {
                warn!(round, "{empty}; aborting");
                on_round(&RoundReport {
                    result: &result,
                    elected: None,
                    best: best.score(),
                });
                return Ok(finish(SearchStop::Aborted { round }, rounds_run, &best));
            }
        };
        best = merge_best(best, round, round_best);
        info!(
            round,
            branch = round_best.branch,
            round_best = %round_best.score,
            best = %best.score(),
            "round selected"
        );
        on_round(&RoundReport {
            result: &result,
            elected: Some(round_best.branch),
            best: best.score(),
        });

        if round_best.verdict.is_full_pass() {
            isolation.commit(&round_best.candidate.content)?;
            return Ok(SearchOutcome {
                best: Some(BestSummary::from_branch(round, round_best)),
                ..finish(SearchStop::Shipped { round: Some(round) }, rounds_run, &best)
            });
        }
    }

    if cancel.is_cancelled() {
        info!("search cancelled before final commit");
        return Ok(finish(
            SearchStop::Cancelled {
                round: rounds_run + 1,
            },
            rounds_run,
            &best,
        ));
    }

    let committed = match best.best() {
        Some(b) if b.result.score > baseline.score => {
            isolation.commit(&b.result.candidate.content)?;
            true
        }
        _ => false,
    };
    info!(committed, best = %best.score(), "rounds exhausted");
    Ok(finish(SearchStop::Exhausted { committed }, rounds_run, &best))
}
