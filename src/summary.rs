//! Run summary formatting.
//!
//! Builds the terminal-oriented summary: one labeled block per project with
//! per-format status lines, followed by an overall pass/fail line. Status
//! icons follow the usual ✓/✗/⊘ convention.

use crate::reconcile::{FormatVerdict, ProjectVerdict};

/// One project's entry in the run summary.
#[derive(Debug)]
pub struct SummaryEntry {
    /// Project name.
    pub project: String,
    /// The project's final verdict.
    pub verdict: ProjectVerdict,
}

/// Logical AND of every project verdict.
pub fn overall_pass(entries: &[SummaryEntry]) -> bool {
    entries.iter().all(|entry| entry.verdict.passed())
}

/// Format the whole run summary for terminal display.
pub fn format_summary(entries: &[SummaryEntry]) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Power report cross-validation\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for entry in entries {
        output.push_str(&format_project_block(entry));
        output.push('\n');
    }

    let passed = entries.iter().filter(|e| e.verdict.passed()).count();
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "{}/{} projects passed: {}\n",
        passed,
        entries.len(),
        if overall_pass(entries) { "PASS" } else { "FAIL" }
    ));

    output
}

/// Format one project's labeled block.
pub fn format_project_block(entry: &SummaryEntry) -> String {
    let mut output = String::new();

    let icon = if entry.verdict.passed() { "✓" } else { "✗" };
    output.push_str(&format!("{} {}\n", icon, entry.project));

    match &entry.verdict {
        ProjectVerdict::Aborted { stage, message } => {
            output.push_str(&format!("    failure at {}: {}\n", stage, message));
        }
        ProjectVerdict::Compared(verdict) => {
            for (format, status) in &verdict.per_format {
                let line = match status {
                    FormatVerdict::Pass => format!("    ✓ {}: matches vcd reference\n", format),
                    FormatVerdict::Fail => {
                        format!("    ✗ {}: differs from vcd reference\n", format)
                    }
                    FormatVerdict::Skipped { reason } => {
                        format!("    ⊘ {}: skipped ({})\n", format, reason)
                    }
                };
                output.push_str(&line);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityFormat;
    use crate::reconcile::Verdict;
    use std::collections::BTreeMap;

    fn compared(saif: FormatVerdict, tcl: FormatVerdict) -> ProjectVerdict {
        let mut per_format = BTreeMap::new();
        let passed =
            saif == FormatVerdict::Pass && tcl == FormatVerdict::Pass;
        per_format.insert(ActivityFormat::Saif, saif);
        per_format.insert(ActivityFormat::Tcl, tcl);
        ProjectVerdict::Compared(Verdict { passed, per_format })
    }

    #[test]
    fn aborted_block_has_single_failure_line_and_no_format_entries() {
        let entry = SummaryEntry {
            project: "tail".to_string(),
            verdict: ProjectVerdict::Aborted {
                stage: "synthesis".to_string(),
                message: "make synth exited with non-zero code: 2".to_string(),
            },
        };
        let block = format_project_block(&entry);
        assert!(block.contains("failure at synthesis"));
        assert!(!block.contains("saif"));
        assert!(!block.contains("tcl"));
        assert_eq!(block.lines().count(), 2);
    }

    #[test]
    fn compared_block_lists_every_format() {
        let entry = SummaryEntry {
            project: "counter".to_string(),
            verdict: compared(FormatVerdict::Pass, FormatVerdict::Fail),
        };
        let block = format_project_block(&entry);
        assert!(block.contains("✓ saif: matches vcd reference"));
        assert!(block.contains("✗ tcl: differs from vcd reference"));
        assert!(block.starts_with("✗ counter"));
    }

    #[test]
    fn overall_is_logical_and() {
        let entries = vec![
            SummaryEntry {
                project: "counter".to_string(),
                verdict: compared(FormatVerdict::Pass, FormatVerdict::Pass),
            },
            SummaryEntry {
                project: "tristate".to_string(),
                verdict: compared(
                    FormatVerdict::Pass,
                    FormatVerdict::Skipped {
                        reason: "report was never produced".to_string(),
                    },
                ),
            },
        ];
        assert!(!overall_pass(&entries));
        assert!(overall_pass(&entries[..1]));

        let summary = format_summary(&entries);
        assert!(summary.contains("1/2 projects passed: FAIL"));
    }
}
