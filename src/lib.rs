#![warn(missing_docs)]
//! Regression harness for a power-estimation toolchain.
//!
//! Drives the external stages (RTL simulation, synthesis, gate-level
//! re-simulation, activity-trace conversion, power analysis) for a set of
//! hardware projects, then cross-validates the power reports generated from
//! the different activity formats against the trace-derived reference.
//! A non-zero process exit status means at least one project diverged.

pub mod activity;
pub mod config;
pub mod pipeline;
pub mod project;
pub mod reconcile;
pub mod stage;
pub mod summary;

pub use activity::ActivityFormat;
pub use config::{ConfigError, HarnessFile, ToolchainConfig};
pub use pipeline::{FormatOutcome, PipelineDriver, RunOutcome, RunRecord};
pub use project::{Project, builtin_projects};
pub use reconcile::{
    CandidateReport, FormatVerdict, ProjectVerdict, Verdict, reconcile, reconcile_run,
};
pub use stage::{SimKind, StageError, StageRunner};
pub use summary::{SummaryEntry, format_project_block, format_summary, overall_pass};

use clap::Parser;
use std::path::PathBuf;

/// Harness CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "powerbench")]
#[command(author, version, about = "Cross-validates power estimates across activity-trace formats")]
pub struct Cli {
    /// Project names to run; runs every configured project when empty
    pub projects: Vec<String>,

    /// Directory containing the project definitions and sta.tcl
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the CLI and run the harness. Main entry point for the binary.
pub fn run() -> anyhow::Result<()> {
    run_with_cli(Cli::parse())
}

/// Run the harness with pre-parsed arguments.
///
/// This is the only place allowed to terminate the process: every component
/// below returns typed failures, and the AND of the per-project verdicts is
/// mapped to the exit status here.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("powerbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("powerbench=info")
            .init();
    }

    let tools = ToolchainConfig::from_env(&cli.root)?;
    let projects = builtin_projects(&cli.root);
    let selected = select_projects(&projects, &cli.projects)?;

    let entries = execute_projects(&tools, &selected);
    print!("{}", format_summary(&entries));

    if !overall_pass(&entries) {
        std::process::exit(1);
    }
    Ok(())
}

/// Resolve the requested project names against the configured set.
///
/// An empty request selects every project. An unknown name is a configuration
/// error rather than a warning: a typo that silently selected nothing would
/// turn CI green without testing anything.
pub fn select_projects<'a>(
    projects: &'a [Project],
    names: &[String],
) -> anyhow::Result<Vec<&'a Project>> {
    if names.is_empty() {
        return Ok(projects.iter().collect());
    }

    let mut selected = Vec::new();
    for name in names {
        let project = projects.iter().find(|p| &p.name == name).ok_or_else(|| {
            let known: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
            anyhow::anyhow!(
                "unknown project '{}'; configured projects: {}",
                name,
                known.join(", ")
            )
        })?;
        if !selected.iter().any(|p: &&Project| p.name == project.name) {
            selected.push(project);
        }
    }
    Ok(selected)
}

/// Run the pipeline and reconciler over each selected project, one at a
/// time, collecting one summary entry per project.
pub fn execute_projects(tools: &ToolchainConfig, selected: &[&Project]) -> Vec<SummaryEntry> {
    let driver = PipelineDriver::new(tools);
    selected
        .iter()
        .map(|project| {
            let record = driver.run(project);
            let verdict = reconcile_run(project, &record);
            SummaryEntry {
                project: record.project,
                verdict,
            }
        })
        .collect()
}
