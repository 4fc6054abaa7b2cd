//! Report reconciler.
//!
//! Reduces the per-format power reports of one project to a verdict. The
//! trace-derived (vcd) report is ground truth; every other available report
//! is compared byte-for-byte against it. A report whose branch failed
//! upstream is recorded as a skip, never silently omitted, so the summary
//! accounts for every expected format.

use crate::activity::ActivityFormat;
use crate::pipeline::{FormatOutcome, RunOutcome, RunRecord};
use crate::project::Project;
use std::collections::BTreeMap;
use std::fs;

/// Status of one non-reference format after comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    /// Byte-for-byte equal to the reference report.
    Pass,
    /// Report exists but differs from the reference.
    Fail,
    /// Report was never produced; carries the upstream failure reason.
    Skipped {
        /// Why the report is missing.
        reason: String,
    },
}

/// Comparison result for one project whose baseline completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// True only if every expected non-reference report matched the reference.
    pub passed: bool,
    /// Individual status per non-reference format.
    pub per_format: BTreeMap<ActivityFormat, FormatVerdict>,
}

/// Final per-project verdict fed into the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectVerdict {
    /// A shared baseline stage failed; no per-format entries exist.
    Aborted {
        /// Stage that aborted the run.
        stage: String,
        /// The failing stage's message.
        message: String,
    },
    /// The baseline completed and reports were compared.
    Compared(Verdict),
}

impl ProjectVerdict {
    /// Overall pass/fail for the project.
    pub fn passed(&self) -> bool {
        match self {
            ProjectVerdict::Aborted { .. } => false,
            ProjectVerdict::Compared(verdict) => verdict.passed,
        }
    }
}

/// One candidate report offered for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateReport {
    /// Report text loaded from disk.
    Text(String),
    /// Report unavailable; comparison is skipped with this reason.
    Missing {
        /// Why the report is unavailable.
        reason: String,
    },
}

/// Compare every candidate report against the reference text.
///
/// Each candidate is judged independently: equal text passes, differing text
/// fails, a missing report is a skip. The overall verdict passes only if all
/// candidates pass.
pub fn reconcile(
    reference: &str,
    candidates: BTreeMap<ActivityFormat, CandidateReport>,
) -> Verdict {
    let mut per_format = BTreeMap::new();
    let mut passed = true;

    for (format, candidate) in candidates {
        let verdict = match candidate {
            CandidateReport::Text(text) => {
                if text == reference {
                    FormatVerdict::Pass
                } else {
                    FormatVerdict::Fail
                }
            }
            CandidateReport::Missing { reason } => FormatVerdict::Skipped { reason },
        };
        if verdict != FormatVerdict::Pass {
            passed = false;
        }
        per_format.insert(format, verdict);
    }

    Verdict { passed, per_format }
}

/// Load the reports named by a run record and reconcile them against the
/// reference format's report.
pub fn reconcile_run(project: &Project, record: &RunRecord) -> ProjectVerdict {
    let formats = match &record.outcome {
        RunOutcome::Aborted { stage, message } => {
            return ProjectVerdict::Aborted {
                stage: stage.to_string(),
                message: message.clone(),
            };
        }
        RunOutcome::Completed { formats } => formats,
    };

    let reference_path = project.report_path(ActivityFormat::REFERENCE);
    let reference = match fs::read_to_string(&reference_path) {
        Ok(text) => text,
        Err(e) => {
            // The baseline claimed the reference exists; a read failure here
            // leaves nothing to compare against.
            return ProjectVerdict::Aborted {
                stage: "reconcile".to_string(),
                message: format!("reference report {:?} could not be read: {}", reference_path, e),
            };
        }
    };

    let mut candidates = BTreeMap::new();
    for format in ActivityFormat::CONVERTED {
        let candidate = match formats.get(&format) {
            Some(FormatOutcome::Generated) => {
                match fs::read_to_string(project.report_path(format)) {
                    Ok(text) => CandidateReport::Text(text),
                    Err(e) => CandidateReport::Missing {
                        reason: format!("report could not be read: {}", e),
                    },
                }
            }
            Some(FormatOutcome::Failed { message }) => CandidateReport::Missing {
                reason: message.clone(),
            },
            None => CandidateReport::Missing {
                reason: "report was never produced".to_string(),
            },
        };
        candidates.insert(format, candidate);
    }

    ProjectVerdict::Compared(reconcile(&reference, candidates))
}
