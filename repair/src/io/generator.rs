//! Generator abstraction for candidate production.
//!
//! The [`Generator`] trait decouples the search from the actual model backend
//! (by default a command such as `ollama run llama3.1`). Tests use scripted
//! generators that return predetermined text without spawning processes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::process::{command_from_argv, run_command_with_timeout};

/// Placeholder replaced with the requested temperature in command arguments.
pub const TEMPERATURE_PLACEHOLDER: &str = "{temperature}";
/// Environment variable carrying the requested temperature to the command.
pub const TEMPERATURE_ENV: &str = "REPAIR_TEMPERATURE";

/// Parameters for one generator call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Role instructions, fixed for the whole run.
    pub system: String,
    /// Per-call prompt (artifact, feedback, format reminder).
    pub prompt: String,
    /// Diversity knob forwarded to the model.
    pub temperature: f32,
    pub timeout: Duration,
}

/// External text-generation capability. Returns the raw response text.
pub trait Generator {
    fn complete(&self, request: &GenerateRequest) -> Result<String>;
}

/// Generator that pipes the prompt into a configured command and reads stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: Vec<String>,
    workdir: PathBuf,
    output_limit_bytes: usize,
}

impl CommandGenerator {
    pub fn new(command: Vec<String>, workdir: PathBuf, output_limit_bytes: usize) -> Self {
        Self {
            command,
            workdir,
            output_limit_bytes,
        }
    }

    fn argv(&self, temperature: f32) -> Vec<String> {
        let rendered = format_temperature(temperature);
        self.command
            .iter()
            .map(|arg| arg.replace(TEMPERATURE_PLACEHOLDER, &rendered))
            .collect()
    }
}

impl Generator for CommandGenerator {
    #[instrument(
        skip_all,
        fields(temperature = request.temperature, timeout_secs = request.timeout.as_secs())
    )]
    fn complete(&self, request: &GenerateRequest) -> Result<String> {
        info!(program = ?self.command.first(), "requesting candidate");
        let mut cmd = command_from_argv(&self.argv(request.temperature), &self.workdir)?;
        cmd.env(TEMPERATURE_ENV, format_temperature(request.temperature));

        let input = format!("{}\n\n{}", request.system.trim_end(), request.prompt);
        let output = run_command_with_timeout(
            cmd,
            Some(input.as_bytes()),
            request.timeout,
            self.output_limit_bytes,
        )
        .context("run generator")?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "generator timed out");
            return Err(anyhow!("generator timed out after {:?}", request.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "generator failed");
            return Err(anyhow!(
                "generator failed with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        debug!(bytes = output.stdout.len(), "generator completed");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn format_temperature(temperature: f32) -> String {
    format!("{temperature:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(temperature: f32) -> GenerateRequest {
        GenerateRequest {
            system: "SYSTEM".to_string(),
            prompt: "PROMPT".to_string(),
            temperature,
            timeout: Duration::from_secs(10),
        }
    }

    fn sh(script: &str, workdir: PathBuf) -> CommandGenerator {
        CommandGenerator::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "generator".to_string(),
                TEMPERATURE_PLACEHOLDER.to_string(),
            ],
            workdir,
            10_000,
        )
    }

    #[test]
    fn pipes_system_and_prompt_on_stdin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = sh("cat", temp.path().to_path_buf());
        let text = generator.complete(&request(0.0)).expect("complete");
        assert_eq!(text, "SYSTEM\n\nPROMPT");
    }

    #[test]
    fn forwards_temperature_as_argument_and_env() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = sh(
            "cat >/dev/null; echo \"$1 $REPAIR_TEMPERATURE\"",
            temp.path().to_path_buf(),
        );
        let text = generator.complete(&request(0.3)).expect("complete");
        assert_eq!(text.trim(), "0.30 0.30");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = sh("cat >/dev/null; echo boom >&2; exit 2", temp.path().to_path_buf());
        let err = generator.complete(&request(0.0)).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn timeout_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = sh("exec sleep 5", temp.path().to_path_buf());
        let mut req = request(0.0);
        req.timeout = Duration::from_millis(200);
        let err = generator.complete(&req).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
