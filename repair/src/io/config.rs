//! Repair configuration stored in `repair.toml` at the workspace root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, relative to the workspace root.
pub const CONFIG_FILE: &str = "repair.toml";

/// Repair configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// values that reproduce a three-round, three-branch search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepairConfig {
    /// Artifact under repair, relative to the workspace root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,

    /// Task description inserted into the generator's role instructions.
    pub task: String,

    pub search: SearchSection,
    pub generator: GeneratorSection,
    pub oracle: OracleSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSection {
    /// Maximum number of generate-evaluate-select rounds.
    pub max_rounds: u32,
    /// Candidates requested per round.
    pub branches: usize,
    /// Diversity levels, reused round-robin across branches.
    pub diversity: Vec<f32>,
    /// Characters of oracle output kept as feedback.
    pub feedback_tail_chars: usize,
    /// Issue generator calls of a round concurrently.
    pub parallel_generation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorSection {
    /// Command receiving the prompt on stdin; `{temperature}` is substituted.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
    /// Substrings an undelimited response must contain to be accepted.
    pub required_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleSection {
    /// Verification command (e.g. `["pytest","-q"]`), run in the workspace root.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            branches: 3,
            diversity: vec![0.0, 0.3, 0.7],
            feedback_tail_chars: 1800,
            parallel_generation: false,
        }
    }
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            command: vec![
                "ollama".to_string(),
                "run".to_string(),
                "llama3.1".to_string(),
            ],
            timeout_secs: 5 * 60,
            output_limit_bytes: 200_000,
            required_markers: Vec::new(),
        }
    }
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            command: vec!["pytest".to_string(), "-q".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            artifact: None,
            task: String::new(),
            search: SearchSection::default(),
            generator: GeneratorSection::default(),
            oracle: OracleSection::default(),
        }
    }
}

impl RepairConfig {
    pub fn validate(&self) -> Result<()> {
        if self.search.max_rounds == 0 {
            return Err(anyhow!("search.max_rounds must be > 0"));
        }
        if self.search.branches == 0 {
            return Err(anyhow!("search.branches must be > 0"));
        }
        if self.search.diversity.is_empty() {
            return Err(anyhow!("search.diversity must be a non-empty array"));
        }
        if let Some(level) = self
            .search
            .diversity
            .iter()
            .find(|level| !level.is_finite() || **level < 0.0)
        {
            return Err(anyhow!(
                "search.diversity levels must be finite and >= 0 (got {level})"
            ));
        }
        if self.search.feedback_tail_chars == 0 {
            return Err(anyhow!("search.feedback_tail_chars must be > 0"));
        }
        validate_command("generator.command", &self.generator.command)?;
        if self.generator.timeout_secs == 0 {
            return Err(anyhow!("generator.timeout_secs must be > 0"));
        }
        if self.generator.output_limit_bytes == 0 {
            return Err(anyhow!("generator.output_limit_bytes must be > 0"));
        }
        validate_command("oracle.command", &self.oracle.command)?;
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow!("oracle.timeout_secs must be > 0"));
        }
        if self.oracle.output_limit_bytes == 0 {
            return Err(anyhow!("oracle.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

fn validate_command(name: &str, command: &[String]) -> Result<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(anyhow!("{name} must be a non-empty array")),
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RepairConfig::default()`.
pub fn load_config(path: &Path) -> Result<RepairConfig> {
    if !path.exists() {
        let cfg = RepairConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RepairConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RepairConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RepairConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        let cfg = RepairConfig {
            artifact: Some(PathBuf::from("src/topk.py")),
            task: "Implement top_k_frequent".to_string(),
            ..RepairConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            concat!(
                "artifact = \"src/topk.py\"\n\n",
                "[search]\nmax_rounds = 5\n\n",
                "[oracle]\ncommand = [\"cargo\", \"test\"]\n",
            ),
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.artifact, Some(PathBuf::from("src/topk.py")));
        assert_eq!(cfg.search.max_rounds, 5);
        assert_eq!(cfg.search.branches, 3);
        assert_eq!(cfg.oracle.command, vec!["cargo", "test"]);
        assert_eq!(cfg.oracle.timeout_secs, 600);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut cfg = RepairConfig::default();
        cfg.search.diversity.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("diversity"));

        let mut cfg = RepairConfig::default();
        cfg.search.diversity = vec![0.2, f32::NAN];
        assert!(cfg.validate().is_err());

        let mut cfg = RepairConfig::default();
        cfg.oracle.command = vec![" ".to_string()];
        assert!(cfg.validate().unwrap_err().to_string().contains("oracle.command"));

        let mut cfg = RepairConfig::default();
        cfg.search.branches = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[search]\nmax_rounds = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_rounds"));
    }
}
