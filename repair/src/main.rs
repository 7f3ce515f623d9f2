//! Repair a single artifact file by searching over generated candidates.
//!
//! Reads `repair.toml` from the workspace root, runs the oracle command to
//! score the artifact, and asks the generator command for replacements until
//! one passes or the round limit is reached.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use repair::candidate::CandidateGenerator;
use repair::core::extract::ExtractRules;
use repair::exit_codes;
use repair::io::artifact::Artifact;
use repair::io::config::{CONFIG_FILE, RepairConfig, load_config, write_config};
use repair::io::generator::CommandGenerator;
use repair::io::oracle::{CommandOracle, OracleRequest, run_oracle};
use repair::io::round_log::{write_round, write_summary};
use repair::logging;
use repair::round::RoundConfig;
use repair::search::{CancelFlag, SearchConfig, SearchOutcome, SearchStop, run_search};

#[derive(Parser)]
#[command(
    name = "repair",
    version,
    about = "Repair a file by generating candidates and keeping the best-scoring one"
)]
struct Cli {
    /// Workspace root holding `repair.toml`; the oracle runs here.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `repair.toml` if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Run the oracle once against the artifact and print its score.
    Check {
        /// Artifact path (overrides `artifact` in the config).
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
    /// Search for a fix and commit the best candidate.
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Artifact path (overrides `artifact` in the config).
    #[arg(long)]
    artifact: Option<PathBuf>,
    /// Override `search.max_rounds`.
    #[arg(long)]
    max_rounds: Option<u32>,
    /// Override `search.branches`.
    #[arg(long)]
    branches: Option<usize>,
    /// Issue generator calls of a round concurrently.
    #[arg(long)]
    parallel: bool,
    /// Write per-round candidates, oracle output and a summary here.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    artifact: &'a Path,
    started_at: String,
    finished_at: String,
    #[serde(flatten)]
    outcome: &'a SearchOutcome,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, force),
        Command::Check { artifact } => cmd_check(&cli.root, artifact.as_deref()),
        Command::Run(args) => cmd_run(&cli.root, &args),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let path = root.join(CONFIG_FILE);
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &RepairConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_check(root: &Path, artifact: Option<&Path>) -> Result<i32> {
    let cfg = load_config(&root.join(CONFIG_FILE))?;
    let artifact = open_artifact(root, artifact, &cfg)?;
    let verdict = run_oracle(
        &CommandOracle::new(cfg.oracle.command.clone()),
        &oracle_request(root, &cfg),
    );
    println!("{}: {}", artifact.path().display(), verdict.score);
    if verdict.success {
        Ok(exit_codes::OK)
    } else {
        if !verdict.output.is_empty() {
            eprintln!("{}", verdict.output);
        }
        Ok(exit_codes::NOT_FIXED)
    }
}

fn cmd_run(root: &Path, args: &RunArgs) -> Result<i32> {
    let cancel = CancelFlag::new();
    install_interrupt_handler(&cancel)?;

    let mut cfg = load_config(&root.join(CONFIG_FILE))?;
    apply_overrides(&mut cfg, args);
    cfg.validate().context("validate command-line overrides")?;

    let mut artifact = open_artifact(root, args.artifact.as_deref(), &cfg)?;
    let candidates = CandidateGenerator::new(
        &cfg.task,
        ExtractRules::new(cfg.generator.required_markers.clone()),
        Duration::from_secs(cfg.generator.timeout_secs),
    )?;
    let generator = CommandGenerator::new(
        cfg.generator.command.clone(),
        root.to_path_buf(),
        cfg.generator.output_limit_bytes,
    );
    let oracle = CommandOracle::new(cfg.oracle.command.clone());
    let search = SearchConfig {
        max_rounds: cfg.search.max_rounds,
        round: RoundConfig {
            branches: cfg.search.branches,
            diversity: cfg.search.diversity.clone(),
            parallel_generation: cfg.search.parallel_generation,
        },
        oracle: oracle_request(root, &cfg),
    };

    let started_at = timestamp();
    let outcome = run_search(
        &mut artifact,
        &candidates,
        &generator,
        &oracle,
        &search,
        &cancel,
        |report| {
            println!(
                "round {}: {} evaluated, {} skipped, best {}",
                report.result.round,
                report.result.branches.len(),
                report.result.failures.len(),
                report.best
            );
            if let Some(log_dir) = &args.log_dir
                && let Err(err) = write_round(log_dir, report.result, report.elected)
            {
                warn!(err = %format!("{err:#}"), "failed to write round log");
            }
        },
    )?;

    println!("{}", describe(&outcome));
    if let Some(log_dir) = &args.log_dir {
        let summary = RunSummary {
            artifact: artifact.path(),
            started_at,
            finished_at: timestamp(),
            outcome: &outcome,
        };
        write_summary(log_dir, &summary)?;
    }
    Ok(exit_code(&outcome.stop))
}

/// Ctrl-C stops the search at the next round boundary; the artifact is restored
/// by the evaluation in flight.
fn install_interrupt_handler(cancel: &CancelFlag) -> Result<()> {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupted; stopping after the current round");
        cancel.cancel();
    })
    .context("install Ctrl-C handler")
}

fn apply_overrides(cfg: &mut RepairConfig, args: &RunArgs) {
    if let Some(max_rounds) = args.max_rounds {
        cfg.search.max_rounds = max_rounds;
    }
    if let Some(branches) = args.branches {
        cfg.search.branches = branches;
    }
    if args.parallel {
        cfg.search.parallel_generation = true;
    }
}

/// CLI path wins over the config; relative paths resolve against `root`.
fn resolve_artifact(root: &Path, cli: Option<&Path>, cfg: &RepairConfig) -> Result<PathBuf> {
    let Some(path) = cli.or(cfg.artifact.as_deref()) else {
        bail!("no artifact configured (set `artifact` in {CONFIG_FILE} or pass --artifact)");
    };
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(root.join(path))
    }
}

fn open_artifact(root: &Path, cli: Option<&Path>, cfg: &RepairConfig) -> Result<Artifact> {
    Artifact::open(&resolve_artifact(root, cli, cfg)?)
}

fn oracle_request(root: &Path, cfg: &RepairConfig) -> OracleRequest {
    OracleRequest {
        workdir: root.to_path_buf(),
        timeout: Duration::from_secs(cfg.oracle.timeout_secs),
        output_limit_bytes: cfg.oracle.output_limit_bytes,
        tail_chars: cfg.search.feedback_tail_chars,
    }
}

fn exit_code(stop: &SearchStop) -> i32 {
    match stop {
        SearchStop::Shipped { .. } => exit_codes::OK,
        SearchStop::Exhausted { .. } => exit_codes::NOT_FIXED,
        SearchStop::Aborted { .. } => exit_codes::ABORTED,
        SearchStop::Cancelled { .. } => exit_codes::CANCELLED,
    }
}

fn describe(outcome: &SearchOutcome) -> String {
    let best = outcome
        .best
        .as_ref()
        .map_or_else(|| "none".to_string(), |b| format!("{} (round {})", b.score, b.round));
    match outcome.stop {
        SearchStop::Shipped { round: None } => {
            format!("already passing: {}", outcome.initial)
        }
        SearchStop::Shipped { round: Some(round) } => {
            format!("shipped full pass from round {round}: {best}")
        }
        SearchStop::Exhausted { committed: true } => {
            format!("not fixed; committed improvement {best} over {}", outcome.initial)
        }
        SearchStop::Exhausted { committed: false } => {
            format!("not fixed; artifact unchanged (best {best})")
        }
        SearchStop::Aborted { round } => {
            format!("aborted: round {round} produced no usable candidate")
        }
        SearchStop::Cancelled { round } => format!("cancelled before round {round}"),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repair::core::score::Score;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["repair", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn parse_run_overrides() {
        let cli = Cli::parse_from([
            "repair",
            "--root",
            "/work",
            "run",
            "--artifact",
            "src/topk.py",
            "--max-rounds",
            "5",
            "--branches",
            "1",
            "--parallel",
        ]);
        assert_eq!(cli.root, PathBuf::from("/work"));
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.artifact, Some(PathBuf::from("src/topk.py")));
        assert_eq!(args.max_rounds, Some(5));
        assert_eq!(args.branches, Some(1));
        assert!(args.parallel);
        assert!(args.log_dir.is_none());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut cfg = RepairConfig::default();
        apply_overrides(
            &mut cfg,
            &RunArgs {
                max_rounds: Some(7),
                parallel: true,
                ..RunArgs::default()
            },
        );
        assert_eq!(cfg.search.max_rounds, 7);
        assert_eq!(cfg.search.branches, 3);
        assert!(cfg.search.parallel_generation);
    }

    #[test]
    fn artifact_resolution_prefers_cli_and_joins_root() {
        let cfg = RepairConfig {
            artifact: Some(PathBuf::from("src/a.py")),
            ..RepairConfig::default()
        };
        let root = Path::new("/work");
        assert_eq!(
            resolve_artifact(root, None, &cfg).expect("config path"),
            PathBuf::from("/work/src/a.py")
        );
        assert_eq!(
            resolve_artifact(root, Some(Path::new("/abs/b.py")), &cfg).expect("cli path"),
            PathBuf::from("/abs/b.py")
        );
        assert!(resolve_artifact(root, None, &RepairConfig::default()).is_err());
    }

    #[test]
    fn exit_codes_follow_stop_reason() {
        assert_eq!(exit_code(&SearchStop::Shipped { round: None }), exit_codes::OK);
        assert_eq!(
            exit_code(&SearchStop::Exhausted { committed: true }),
            exit_codes::NOT_FIXED
        );
        assert_eq!(exit_code(&SearchStop::Aborted { round: 1 }), exit_codes::ABORTED);
        assert_eq!(
            exit_code(&SearchStop::Cancelled { round: 2 }),
            exit_codes::CANCELLED
        );
    }

    #[test]
    fn describe_mentions_initial_score_when_already_passing() {
        let outcome = SearchOutcome {
            stop: SearchStop::Shipped { round: None },
            rounds_run: 0,
            initial: Score::new(6, 0, false),
            best: None,
        };
        assert!(describe(&outcome).contains("already passing"));
    }
}
