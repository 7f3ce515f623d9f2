//! One round of the search: generate diversified candidates, evaluate each in isolation.

use std::thread;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::candidate::{CandidateGenerator, GenerationFailure};
use crate::core::types::{BranchFailure, BranchResult, Candidate, Context, RoundResult};
use crate::io::generator::Generator;
use crate::io::isolation::Isolation;
use crate::io::oracle::Oracle;

/// Branch fan-out for a round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundConfig {
    pub branches: usize,
    /// Diversity levels, reused round-robin when `branches` exceeds their count.
    pub diversity: Vec<f32>,
    /// Run generator calls concurrently. Evaluation stays sequential.
    pub parallel_generation: bool,
}

impl RoundConfig {
    /// Diversity used by `branch`; `0.0` when no levels are configured.
    pub fn diversity_for(&self, branch: usize) -> f32 {
        if self.diversity.is_empty() {
            return 0.0;
        }
        self.diversity[branch % self.diversity.len()]
    }
}

/// Generate and evaluate `config.branches` candidates.
///
/// Generation failures are recorded and skipped. Errors only when the artifact
/// itself cannot be accessed during evaluation.
#[instrument(
    skip_all,
    fields(round = round, branches = config.branches, parallel = config.parallel_generation)
)]
pub fn run_round<G, O>(
    round: u32,
    candidates: &CandidateGenerator,
    generator: &G,
    isolation: &mut Isolation<'_, O>,
    context: &Context,
    config: &RoundConfig,
) -> Result<RoundResult>
where
    G: Generator + Sync + ?Sized,
    O: Oracle + ?Sized,
{
    let generated = if config.parallel_generation {
        generate_parallel(candidates, generator, context, config)
    } else {
        (0..config.branches)
            .map(|branch| candidates.generate(generator, context, config.diversity_for(branch)))
            .collect()
    };

    let mut result = RoundResult {
        round,
        ..RoundResult::default()
    };
    for (branch, outcome) in generated.into_iter().enumerate() {
        match outcome {
            Ok(candidate) => {
                let verdict = isolation.evaluate(&candidate.content)?;
                info!(
                    round,
                    branch,
                    diversity = candidate.diversity,
                    score = %verdict.score,
                    "branch evaluated"
                );
                result.branches.push(BranchResult {
                    branch,
                    score: verdict.score,
                    candidate,
                    verdict,
                });
            }
            Err(failure) => {
                warn!(round, branch, reason = %failure, "branch skipped");
                result.failures.push(BranchFailure {
                    branch,
                    reason: failure.to_string(),
                });
            }
        }
    }

    debug!(
        evaluated = result.branches.len(),
        skipped = result.failures.len(),
        "round finished"
    );
    Ok(result)
}

/// Issue all generator calls of a round at once; results come back in branch order.
fn generate_parallel<G>(
    candidates: &CandidateGenerator,
    generator: &G,
    context: &Context,
    config: &RoundConfig,
) -> Vec<Result<Candidate, GenerationFailure>>
where
    G: Generator + Sync + ?Sized,
{
    thread::scope(|scope| {
        let handles: Vec<_> = (0..config.branches)
            .map(|branch| {
                let diversity = config.diversity_for(branch);
                scope.spawn(move || candidates.generate(generator, context, diversity))
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(branch, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(GenerationFailure::Backend {
                        attempt: 1,
                        message: format!("generator thread for branch {branch} panicked"),
                    })
                })
            })
            .collect()
    })
}
