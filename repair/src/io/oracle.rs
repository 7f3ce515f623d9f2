//! Oracle adapter: runs the verification command against the current artifact.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::verdict::Verdict;
use crate::io::process::{command_from_argv, run_command_with_timeout};

#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Directory the oracle runs in (the repository root).
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Characters of output kept in the verdict.
    pub tail_chars: usize,
}

/// Raw outcome of one oracle process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRun {
    pub success: bool,
    /// Combined stdout and stderr.
    pub output: String,
    pub timed_out: bool,
}

/// External verification capability.
///
/// Implementations observe the artifact only through the filesystem state at
/// the time of the call. An `Err` means the oracle could not be invoked.
pub trait Oracle {
    fn run(&self, request: &OracleRequest) -> Result<OracleRun>;
}

/// Oracle that runs a configured command (e.g. `pytest -q`).
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: Vec<String>,
}

impl CommandOracle {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Oracle for CommandOracle {
    #[instrument(
        skip_all,
        fields(command = ?self.command, timeout_secs = request.timeout.as_secs())
    )]
    fn run(&self, request: &OracleRequest) -> Result<OracleRun> {
        let cmd = command_from_argv(&self.command, &request.workdir)?;
        let output =
            run_command_with_timeout(cmd, None, request.timeout, request.output_limit_bytes)
                .context("run oracle")?;
        if output.timed_out {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "oracle timed out"
            );
        }
        Ok(OracleRun {
            success: output.success(),
            output: output.combined_text("oracle"),
            timed_out: output.timed_out,
        })
    }
}

/// Run the oracle and fold every outcome, including invocation failure, into a [`Verdict`].
pub fn run_oracle<O: Oracle + ?Sized>(oracle: &O, request: &OracleRequest) -> Verdict {
    match oracle.run(request) {
        Ok(run) => {
            let verdict =
                Verdict::from_output(run.success, &run.output, run.timed_out, request.tail_chars);
            debug!(success = verdict.success, score = %verdict.score, "oracle verdict");
            verdict
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "oracle invocation failed");
            Verdict::invocation_failure(&format!("oracle invocation failed: {err:#}"))
        }
    }
}
