//! Candidate generation: one well-formed artifact per call, or a typed failure.
//!
//! A response without an extractable artifact gets exactly one stricter
//! follow-up request, so a candidate costs at most [`MAX_GENERATOR_CALLS`]
//! generator calls.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::extract::{ExtractRules, extract_artifact};
use crate::core::types::{Candidate, Context};
use crate::io::generator::{GenerateRequest, Generator};
use crate::io::prompt::PromptEngine;

/// Upper bound on generator calls per candidate (first request + one retry).
pub const MAX_GENERATOR_CALLS: u32 = 2;

const PREVIEW_CHARS: usize = 800;

/// Why a branch produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    /// The generator could not be called or did not finish (spawn error, exit status, timeout).
    Backend { attempt: u32, message: String },
    /// Neither the response nor the stricter retry contained a usable artifact.
    Malformed { preview: String },
    /// The prompt could not be rendered.
    Prompt { message: String },
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::Backend { attempt, message } => {
                write!(f, "generator call {attempt} failed: {message}")
            }
            GenerationFailure::Malformed { preview } => write!(
                f,
                "no usable artifact after {MAX_GENERATOR_CALLS} requests; last response began: {preview}"
            ),
            GenerationFailure::Prompt { message } => write!(f, "render prompt: {message}"),
        }
    }
}

impl std::error::Error for GenerationFailure {}

/// Builds prompts, calls the generator, and extracts candidates.
pub struct CandidateGenerator {
    prompts: PromptEngine,
    system: String,
    rules: ExtractRules,
    timeout: Duration,
}

impl CandidateGenerator {
    /// Render the run-wide role instructions once for `task`.
    pub fn new(task: &str, rules: ExtractRules, timeout: Duration) -> anyhow::Result<Self> {
        let prompts = PromptEngine::new();
        let system = prompts.render_system(task)?;
        Ok(Self {
            prompts,
            system,
            rules,
            timeout,
        })
    }

    /// Request one candidate at the given diversity.
    pub fn generate<G: Generator + ?Sized>(
        &self,
        generator: &G,
        context: &Context,
        diversity: f32,
    ) -> Result<Candidate, GenerationFailure> {
        let mut last_response = String::new();
        for attempt in 1..=MAX_GENERATOR_CALLS {
            let strict = attempt > 1;
            let prompt = self
                .prompts
                .render_candidate(context, strict)
                .map_err(|err| GenerationFailure::Prompt {
                    message: format!("{err:#}"),
                })?;
            let request = GenerateRequest {
                system: self.system.clone(),
                prompt,
                temperature: diversity,
                timeout: self.timeout,
            };

            let response =
                generator
                    .complete(&request)
                    .map_err(|err| GenerationFailure::Backend {
                        attempt,
                        message: format!("{err:#}"),
                    })?;

            if let Some(content) = extract_artifact(&response, &self.rules) {
                debug!(attempt, diversity, bytes = content.len(), "candidate extracted");
                return Ok(Candidate { content, diversity });
            }
            warn!(attempt, diversity, "response had no usable artifact");
            last_response = response;
        }

        Err(GenerationFailure::Malformed {
            preview: last_response.chars().take(PREVIEW_CHARS).collect(),
        })
    }
}
