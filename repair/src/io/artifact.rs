//! File-backed storage for the artifact under repair.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// The single mutable text file being repaired.
///
/// Reads are free; writes are crate-private and only reachable through
/// [`crate::io::isolation::Isolation`], which requires `&mut Artifact`.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Open an existing artifact file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("artifact {} is not a file", path.display()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full UTF-8 contents.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("read artifact {}", self.path.display()))
    }

    /// Replace the full contents (temp file + rename).
    pub(crate) fn overwrite(&self, contents: &str) -> Result<()> {
        debug!(path = %self.path.display(), bytes = contents.len(), "overwriting artifact");
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| anyhow!("artifact path has no file name {}", self.path.display()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".repair.tmp");
        let tmp_path = self.path.with_file_name(tmp_name);
        fs::write(&tmp_path, contents)
            .with_context(|| format!("write temp artifact {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replace artifact {}", self.path.display()))?;
        Ok(())
    }
}
