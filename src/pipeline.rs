//! Pipeline driver.
//!
//! Sequences the external stages for one project. The shared baseline stages
//! (config write, RTL smoke simulation, synthesis, gate-level simulation,
//! null baseline report, vcd reference report) run in strict order and any
//! failure aborts the project. The converted-format branches that follow are
//! isolated from each other: a broken conversion path for one format is
//! downgraded to a recorded per-format failure and must never hide results
//! from sibling formats or from the reference.

use crate::activity::ActivityFormat;
use crate::config::ToolchainConfig;
use crate::project::Project;
use crate::stage::{SimKind, StageRunner};
use std::collections::BTreeMap;
use tracing::error;

/// Per-project record of stage and per-format outcomes.
#[derive(Debug)]
pub struct RunRecord {
    /// Project name the record belongs to.
    pub project: String,
    /// How far the run got.
    pub outcome: RunOutcome,
}

/// Outcome of one project's pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// A shared baseline stage failed; no per-format results exist.
    Aborted {
        /// Name of the stage that failed.
        stage: &'static str,
        /// The failing stage's message.
        message: String,
    },
    /// The baseline completed; each comparison format carries its own status.
    Completed {
        /// Outcome per comparison format (the reference plus converted ones).
        formats: BTreeMap<ActivityFormat, FormatOutcome>,
    },
}

/// Outcome of one activity-format branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// The format's report exists on disk.
    Generated,
    /// Conversion or report generation failed; the report does not exist.
    Failed {
        /// The failing sub-step's message.
        message: String,
    },
}

/// Drives the full stage sequence for projects against a fixed toolchain.
pub struct PipelineDriver<'a> {
    tools: &'a ToolchainConfig,
}

impl<'a> PipelineDriver<'a> {
    /// Create a driver bound to a resolved toolchain.
    pub fn new(tools: &'a ToolchainConfig) -> Self {
        Self { tools }
    }

    /// Run every stage for one project. Never returns an error: all failures
    /// are captured in the record so sibling projects keep running.
    pub fn run(&self, project: &Project) -> RunRecord {
        let runner = StageRunner::new(self.tools);

        if let Err(e) = project.prepare_out_dir() {
            return self.abort(project, "prepare", &format!("failed to reset out/: {}", e));
        }

        if let Err(e) = runner.write_config(project) {
            return self.abort(project, "write-config", &e.to_string());
        }
        if let Err(e) = runner.simulate(project, SimKind::Rtl) {
            return self.abort(project, "rtl-simulation", &e.to_string());
        }
        if let Err(e) = runner.synthesize(project) {
            return self.abort(project, "synthesis", &e.to_string());
        }
        if let Err(e) = runner.simulate(project, SimKind::GateLevel) {
            return self.abort(project, "gate-level-simulation", &e.to_string());
        }
        if let Err(e) = runner.analyze_power(project, ActivityFormat::Null) {
            return self.abort(project, "null-power-report", &e.to_string());
        }
        if let Err(e) = runner.analyze_power(project, ActivityFormat::Vcd) {
            return self.abort(project, "vcd-power-report", &e.to_string());
        }

        let mut formats = BTreeMap::new();
        formats.insert(ActivityFormat::REFERENCE, FormatOutcome::Generated);

        for format in ActivityFormat::CONVERTED {
            // Branch boundary: a failure here is downgraded to a recorded
            // status so the remaining formats still run.
            let outcome = runner
                .convert_activity(project, format)
                .and_then(|_| runner.analyze_power(project, format));
            match outcome {
                Ok(()) => {
                    formats.insert(format, FormatOutcome::Generated);
                }
                Err(e) => {
                    error!("[{}] {} branch failed: {}", project.name, format, e);
                    formats.insert(
                        format,
                        FormatOutcome::Failed {
                            message: e.to_string(),
                        },
                    );
                }
            }
        }

        RunRecord {
            project: project.name.clone(),
            outcome: RunOutcome::Completed { formats },
        }
    }

    fn abort(&self, project: &Project, stage: &'static str, message: &str) -> RunRecord {
        error!("[{}] aborted at {}: {}", project.name, stage, message);
        RunRecord {
            project: project.name.clone(),
            outcome: RunOutcome::Aborted {
                stage,
                message: message.to_string(),
            },
        }
    }
}
