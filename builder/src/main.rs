//! Exercise content builder CLI.
//!
//! Validates exercise records by running their reference solutions and, when
//! everything passes, writes the release artifact tree.

use std::path::{Path, PathBuf};

use anyhow::Result;
use builder::core::record::Level;
use builder::exit_codes;
use builder::io::config::{BuilderConfig, DEFAULT_CONFIG_PATH, load_config};
use builder::io::evaluator::PythonEvaluator;
use builder::io::loader::{discover_records, find_name_collisions};
use builder::pipeline::{RunOptions, RunOutcome, run_pipeline};
use builder::report::render_report;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "builder",
    version,
    about = "Validate exercise records and build release artifacts"
)]
struct Cli {
    /// Path to builder.toml (defaults apply when the file is missing).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate every record and write artifacts if all assertions pass.
    Build {
        /// Root of the task tree, or a single record file.
        root: PathBuf,
        /// Artifact root (overrides `output_dir` from the config).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also list records that passed.
        #[arg(short, long)]
        verbose: bool,
        /// Do not warn about the number of assertions per record.
        #[arg(long)]
        skip_assert_count: bool,
    },
    /// Validate every record without writing anything.
    Check {
        /// Root of the task tree, or a single record file.
        root: PathBuf,
        #[arg(short, long)]
        verbose: bool,
        #[arg(long)]
        skip_assert_count: bool,
    },
    /// Print records grouped by level.
    List { root: PathBuf },
    /// Check task names for case-insensitive uniqueness across several roots.
    Names {
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
}

fn main() {
    builder::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            root,
            out,
            verbose,
            skip_assert_count,
        } => {
            let config = load_config(&cli.config)?;
            let out_dir = out.unwrap_or_else(|| config.output_dir.clone());
            cmd_run(&config, &root, Some(&out_dir), verbose, skip_assert_count)
        }
        Command::Check {
            root,
            verbose,
            skip_assert_count,
        } => {
            let config = load_config(&cli.config)?;
            cmd_run(&config, &root, None, verbose, skip_assert_count)
        }
        Command::List { root } => cmd_list(&root),
        Command::Names { roots } => cmd_names(&roots),
    }
}

fn cmd_run(
    config: &BuilderConfig,
    root: &Path,
    out_dir: Option<&Path>,
    verbose: bool,
    skip_assert_count: bool,
) -> Result<i32> {
    let evaluator = PythonEvaluator::new(&config.evaluator);
    let options = RunOptions {
        root,
        out_dir,
        limits: config.call_limits(),
        lints: config.lint_settings(skip_assert_count),
    };
    let outcome = run_pipeline(&options, &evaluator)?;
    Ok(print_outcome(&outcome, out_dir, verbose))
}

fn print_outcome(outcome: &RunOutcome, out_dir: Option<&Path>, verbose: bool) -> i32 {
    for warning in &outcome.report.warnings {
        eprintln!("warning: {}", warning);
    }
    let rendered = render_report(&outcome.report, verbose);
    if !outcome.succeeded() {
        eprint!("{rendered}");
        eprintln!("build aborted: assertions failed, no artifacts written");
        return exit_codes::FAILED;
    }
    print!("{rendered}");
    if let Some(out_dir) = out_dir {
        println!(
            "report: wrote {} artifacts to {}",
            outcome.artifacts.len(),
            out_dir.display()
        );
    }
    exit_codes::OK
}

fn cmd_list(root: &Path) -> Result<i32> {
    let set = discover_records(root)?;
    for level in Level::ALL {
        let records = set.level(level);
        if records.is_empty() {
            continue;
        }
        println!("{level} ({}):", records.len());
        for loaded in records {
            println!("  {} {}", loaded.record.name, loaded.path.display());
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_names(roots: &[PathBuf]) -> Result<i32> {
    let (total, collisions) = find_name_collisions(roots)?;
    if total == 0 {
        eprintln!("warning: no task files found");
        return Ok(exit_codes::OK);
    }
    if collisions.is_empty() {
        println!("names: {total} task files, all names unique");
        return Ok(exit_codes::OK);
    }
    for collision in &collisions {
        eprintln!(
            "duplicate task name '{}' appears in {} files:",
            collision.name,
            collision.paths.len()
        );
        for path in &collision.paths {
            eprintln!("  - {}", path.display());
        }
    }
    eprintln!(
        "names: {} duplicate name(s) across {total} task files",
        collisions.len()
    );
    Ok(exit_codes::INVALID)
}
