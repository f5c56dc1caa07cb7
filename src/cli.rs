//! Command-line surface
//!
//! ```text
//! exptrack run [-c CONFIG] [--seed N] [--set a.b=v]... [--runs-dir DIR] [--deps-cmd CMD] [--no-exec]
//! exptrack report RUN_DIR [-o OUT_DIR]
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::{default_report_dir, generate_report};
use crate::run::{execute_run, invocation_command, RunOptions};
use crate::{Error, Result};

/// Experiment tracking CLI: config snapshot, provenance, reports.
#[derive(Parser, Debug)]
#[command(name = "exptrack", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one experiment (tracking + config snapshot)
    Run(RunArgs),
    /// Render a Markdown report for a run directory
    Report(ReportArgs),
}

/// Arguments of `exptrack run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config path (.yaml/.yml/.json)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed (also written into the config)
    #[arg(long)]
    pub seed: Option<i64>,

    /// Override config, repeatable. e.g. --set trainer.lr=1e-3
    #[arg(long = "set", value_name = "KEY.PATH=VALUE")]
    pub set: Vec<String>,

    /// Parent directory for run directories [default: ./runs]
    #[arg(long, value_name = "DIR", env = "EXPTRACK_RUNS_DIR")]
    pub runs_dir: Option<PathBuf>,

    /// Command whose output is recorded as the dependency listing
    #[arg(long, value_name = "CMD", env = "EXPTRACK_DEPS_CMD", default_value = "pip freeze")]
    pub deps_cmd: String,

    /// Record config and provenance only; skip experiment execution
    #[arg(long)]
    pub no_exec: bool,
}

/// Arguments of `exptrack report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Run directory (runs/<run_id>)
    pub run_dir: PathBuf,

    /// Output directory [default: ./reports/<run_id>]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(Error::from)
}

/// Execute `exptrack run`, printing a short summary.
///
/// # Errors
///
/// Propagates any error from [`execute_run`].
pub fn cmd_run(args: &RunArgs) -> Result<()> {
    let cwd = current_dir()?;
    let mut opts = RunOptions::new(&cwd);
    opts.config_path.clone_from(&args.config);
    opts.seed = args.seed;
    opts.overrides.clone_from(&args.set);
    if let Some(dir) = &args.runs_dir {
        opts.runs_root = cwd.join(dir);
    }
    opts.command = invocation_command(std::env::args_os());
    opts.deps_command = args.deps_cmd.split_whitespace().map(str::to_string).collect();
    opts.execute = !args.no_exec;

    let outcome = execute_run(&opts)?;
    let meta = &outcome.meta;

    println!("[OK] run created: {}", meta.run_id());
    println!("     path: {}", outcome.run_dir.path().display());
    println!("     config_hash: {}...", &meta.config_hash()[..12]);
    println!("     duration_sec: {:.3}s", meta.duration_sec());
    Ok(())
}

/// Execute `exptrack report`, printing the report path.
///
/// # Errors
///
/// Propagates any error from [`generate_report`].
pub fn cmd_report(args: &ReportArgs) -> Result<()> {
    let cwd = current_dir()?;
    let run_dir = cwd.join(&args.run_dir);
    let out_dir = match &args.out {
        Some(out) => cwd.join(out),
        None => {
            let run_id = run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            default_report_dir(&cwd, &run_id)
        }
    };

    let report = generate_report(&run_dir, &out_dir)?;
    println!("[OK] report: {}", report.display());
    Ok(())
}

/// Dispatch a parsed command line.
///
/// # Errors
///
/// Propagates the subcommand's error.
pub fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Report(args) => cmd_report(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "exptrack", "run", "-c", "cfg.yaml", "--seed", "7", "--set", "a.b=1", "--set",
            "model.params.C=0.5",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, Some(PathBuf::from("cfg.yaml")));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.set, vec!["a.b=1", "model.params.C=0.5"]);
        assert!(!args.no_exec);
    }

    #[test]
    fn test_parse_report() {
        let cli = Cli::try_parse_from(["exptrack", "report", "runs/x", "-o", "out"]).unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.run_dir, PathBuf::from("runs/x"));
        assert_eq!(args.out, Some(PathBuf::from("out")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_accepted() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let dir = OsString::from_vec(b"runs_\xff".to_vec());
        let cli = Cli::try_parse_from([
            OsString::from("exptrack"),
            OsString::from("run"),
            OsString::from("--runs-dir"),
            dir.clone(),
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.runs_dir, Some(PathBuf::from(dir)));
    }

    #[test]
    fn test_bad_seed_rejected() {
        assert!(Cli::try_parse_from(["exptrack", "run", "--seed", "abc"]).is_err());
    }
}
