//! Scoped evaluation of candidates against the shared artifact.
//!
//! `evaluate` writes a candidate, runs the oracle, and restores the previous
//! contents on every exit path. `commit` is the only permanent write. Holding
//! `&mut Artifact` makes this the single writer for the lifetime of the value.

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::core::verdict::Verdict;
use crate::io::artifact::Artifact;
use crate::io::oracle::{Oracle, OracleRequest, run_oracle};

/// Exclusive handle for evaluating and committing candidates.
pub struct Isolation<'a, O: Oracle + ?Sized> {
    artifact: &'a mut Artifact,
    oracle: &'a O,
    request: OracleRequest,
}

impl<'a, O: Oracle + ?Sized> Isolation<'a, O> {
    pub fn new(artifact: &'a mut Artifact, oracle: &'a O, request: OracleRequest) -> Self {
        Self {
            artifact,
            oracle,
            request,
        }
    }

    /// Current artifact contents.
    pub fn read(&self) -> Result<String> {
        self.artifact.read()
    }

    /// Run the oracle against the artifact as it is, without writing.
    pub fn check(&self) -> Verdict {
        run_oracle(self.oracle, &self.request)
    }

    /// Evaluate `content` in place of the artifact, then restore the original.
    ///
    /// Errors only when the artifact itself cannot be read, written or restored.
    pub fn evaluate(&mut self, content: &str) -> Result<Verdict> {
        let backup = self.artifact.read().context("back up artifact")?;
        let guard = RestoreGuard {
            artifact: &*self.artifact,
            backup: Some(backup),
        };
        guard
            .artifact
            .overwrite(content)
            .context("write candidate")?;
        debug!(bytes = content.len(), "candidate written, running oracle");

        let verdict = run_oracle(self.oracle, &self.request);
        guard.restore().context("restore artifact")?;
        Ok(verdict)
    }

    /// Permanently replace the artifact with `content`.
    pub fn commit(&mut self, content: &str) -> Result<()> {
        info!(path = %self.artifact.path().display(), "committing candidate");
        self.artifact.overwrite(content).context("commit candidate")
    }
}

/// Restores the backup when dropped unless [`RestoreGuard::restore`] ran first.
struct RestoreGuard<'g> {
    artifact: &'g Artifact,
    backup: Option<String>,
}

impl RestoreGuard<'_> {
    fn restore(mut self) -> Result<()> {
        match self.backup.take() {
            Some(backup) => self.artifact.overwrite(&backup),
            None => Ok(()),
        }
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take()
            && let Err(err) = self.artifact.overwrite(&backup)
        {
            error!(
                err = %format!("{err:#}"),
                path = %self.artifact.path().display(),
                "failed to restore artifact"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::oracle::OracleRun;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// Records what the artifact looked like at each oracle call.
    struct SnoopingOracle {
        path: PathBuf,
        seen: RefCell<Vec<String>>,
        result: fn(&str) -> Result<OracleRun>,
    }

    impl Oracle for SnoopingOracle {
        fn run(&self, _request: &OracleRequest) -> Result<OracleRun> {
            let contents = fs::read_to_string(&self.path)?;
            self.seen.borrow_mut().push(contents.clone());
            (self.result)(&contents)
        }
    }

    fn request(root: &Path) -> OracleRequest {
        OracleRequest {
            workdir: root.to_path_buf(),
            timeout: Duration::from_secs(1),
            output_limit_bytes: 1000,
            tail_chars: 1000,
        }
    }

    fn passing(_: &str) -> Result<OracleRun> {
        Ok(OracleRun {
            success: true,
            output: "3 passed".to_string(),
            timed_out: false,
        })
    }

    fn failing(_: &str) -> Result<OracleRun> {
        Ok(OracleRun {
            success: false,
            output: "1 failed, 2 passed".to_string(),
            timed_out: false,
        })
    }

    fn broken(_: &str) -> Result<OracleRun> {
        Err(anyhow::anyhow!("cannot start oracle"))
    }

    fn panicking(_: &str) -> Result<OracleRun> {
        panic!("oracle blew up");
    }

    fn setup(
        result: fn(&str) -> Result<OracleRun>,
    ) -> (tempfile::TempDir, Artifact, SnoopingOracle) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("topk.py");
        fs::write(&path, "original\n").expect("seed");
        let artifact = Artifact::open(&path).expect("open");
        let oracle = SnoopingOracle {
            path,
            seen: RefCell::new(Vec::new()),
            result,
        };
        (temp, artifact, oracle)
    }

    #[test]
    fn evaluate_restores_artifact_for_every_verdict() {
        for result in [passing as fn(&str) -> Result<OracleRun>, failing, broken] {
            let (temp, mut artifact, oracle) = setup(result);
            let mut isolation = Isolation::new(&mut artifact, &oracle, request(temp.path()));

            isolation.evaluate("candidate\n").expect("evaluate");

            assert_eq!(isolation.read().expect("read"), "original\n");
            assert_eq!(oracle.seen.borrow().as_slice(), ["candidate\n".to_string()]);
        }
    }

    #[test]
    fn evaluate_folds_oracle_error_into_verdict() {
        let (temp, mut artifact, oracle) = setup(broken);
        let mut isolation = Isolation::new(&mut artifact, &oracle, request(temp.path()));
        let verdict = isolation.evaluate("candidate").expect("evaluate");
        assert!(verdict.invocation_error);
    }

    #[test]
    fn evaluate_restores_artifact_when_oracle_panics() {
        let (temp, mut artifact, oracle) = setup(panicking);
        let path = artifact.path().to_path_buf();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut isolation = Isolation::new(&mut artifact, &oracle, request(temp.path()));
            isolation.evaluate("half-written candidate")
        }));

        assert!(outcome.is_err());
        assert_eq!(fs::read_to_string(path).expect("read"), "original\n");
    }

    #[test]
    fn commit_writes_permanently() {
        let (temp, mut artifact, oracle) = setup(passing);
        let mut isolation = Isolation::new(&mut artifact, &oracle, request(temp.path()));
        isolation.commit("fixed\n").expect("commit");
        assert_eq!(isolation.read().expect("read"), "fixed\n");
        assert!(oracle.seen.borrow().is_empty());
    }

    #[test]
    fn check_does_not_write() {
        let (temp, mut artifact, oracle) = setup(failing);
        let isolation = Isolation::new(&mut artifact, &oracle, request(temp.path()));
        let verdict = isolation.check();
        assert!(!verdict.success);
        assert_eq!(oracle.seen.borrow().as_slice(), ["original\n".to_string()]);
    }
}
