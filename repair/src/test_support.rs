//! Test-only helpers: scripted generator and oracle, temporary artifacts.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::io::artifact::Artifact;
use crate::io::generator::{GenerateRequest, Generator};
use crate::io::oracle::{Oracle, OracleRequest, OracleRun};

/// Generator that replays queued responses in call order and records requests.
///
/// `Err(message)` entries simulate backend failures. Running out of responses
/// is a backend failure too.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Generator that must never be called.
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Generator for ScriptedGenerator {
    fn complete(&self, request: &GenerateRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match self.responses.lock().expect("responses lock").pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator exhausted")),
        }
    }
}

/// Wrap `content` in the delimited block the extractor expects.
pub fn file_block(content: &str) -> String {
    format!("Here is the fix:\n<file>\n{content}\n</file>\n")
}

/// Oracle that inspects the artifact on disk and answers by substring rules.
///
/// The first rule whose needle occurs in the artifact wins; otherwise the
/// default run is returned. Every observed artifact content is recorded.
pub struct ScriptedOracle {
    path: PathBuf,
    rules: Vec<(String, OracleRun)>,
    default: OracleRun,
    unavailable: bool,
    seen: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(path: &Path, default: OracleRun) -> Self {
        Self {
            path: path.to_path_buf(),
            rules: Vec::new(),
            default,
            unavailable: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that can never be started.
    pub fn unavailable(path: &Path) -> Self {
        Self {
            unavailable: true,
            ..Self::new(path, pytest_run(0, 0))
        }
    }

    pub fn rule(mut self, needle: &str, run: OracleRun) -> Self {
        self.rules.push((needle.to_string(), run));
        self
    }

    /// Artifact contents observed by each oracle call, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().expect("seen lock").len()
    }
}

impl Oracle for ScriptedOracle {
    fn run(&self, _request: &OracleRequest) -> Result<OracleRun> {
        if self.unavailable {
            return Err(anyhow!("oracle binary not found"));
        }
        let contents = fs::read_to_string(&self.path)?;
        self.seen.lock().expect("seen lock").push(contents.clone());
        let run = self
            .rules
            .iter()
            .find(|(needle, _)| contents.contains(needle.as_str()))
            .map(|(_, run)| run.clone())
            .unwrap_or_else(|| self.default.clone());
        Ok(run)
    }
}

/// Pytest-style run: succeeds only when nothing failed.
pub fn pytest_run(passed: u32, failed: u32) -> OracleRun {
    let summary = match (failed, passed) {
        (0, p) => format!("{p} passed in 0.01s"),
        (f, 0) => format!("{f} failed in 0.01s"),
        (f, p) => format!("{f} failed, {p} passed in 0.01s"),
    };
    OracleRun {
        success: failed == 0 && passed > 0,
        output: format!("..F.\n==== {summary} ====\n"),
        timed_out: false,
    }
}

/// Pytest-style collection error.
pub fn pytest_error_run() -> OracleRun {
    OracleRun {
        success: false,
        output: "==== ERRORS ====\nERROR collecting tests/test_topk.py\n1 error in 0.02s\n"
            .to_string(),
        timed_out: false,
    }
}

/// Temporary workspace holding a single artifact file.
pub struct TempArtifact {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(name: &str, contents: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(Self { dir, path })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<Artifact> {
        Artifact::open(&self.path)
    }

    pub fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    pub fn oracle_request(&self) -> OracleRequest {
        OracleRequest {
            workdir: self.root().to_path_buf(),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 100_000,
            tail_chars: 1800,
        }
    }
}
