//! Stage runner.
//!
//! Invokes one external-tool stage per call and classifies the outcome. Every
//! call is a single blocking subprocess invocation; the only streaming
//! behavior is the power-analysis stage, whose stdout is consumed
//! line-by-line until the tool exits so the pin-annotation confirmation can
//! be observed as it happens.
//!
//! Beyond exit codes, two protocol checks guard against silent-success tool
//! states: a power analysis that exits 0 without ever confirming pin
//! annotation (for formats that require it), and an apparently successful
//! invocation whose expected output artifact does not exist afterwards.

use crate::activity::ActivityFormat;
use crate::config::ToolchainConfig;
use crate::project::Project;
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

/// Typed failure from one external stage invocation.
#[derive(Debug, Error)]
pub enum StageError {
    /// The invoked process exited with a non-zero code.
    #[error("{stage} exited with non-zero code: {code}")]
    ToolFailed {
        /// Stage name for the operator.
        stage: String,
        /// Exit code, or -1 when the process was killed by a signal.
        code: i32,
    },

    /// The tool binary could not be launched at all.
    #[error("failed to launch {stage}: {source}")]
    Spawn {
        /// Stage name for the operator.
        stage: String,
        /// The underlying launch error.
        source: std::io::Error,
    },

    /// The analyzer confirmed annotation of exactly zero pin activities.
    #[error("zero pins were annotated")]
    ZeroPinsAnnotated,

    /// The analyzer exited cleanly without ever confirming annotation,
    /// for a format that requires the confirmation.
    #[error("pin annotation was not attempted")]
    AnnotationNotAttempted,

    /// The analyzer exited cleanly but its report file does not exist.
    #[error("report {path:?} was not generated")]
    ReportMissing {
        /// Expected report path.
        path: PathBuf,
    },

    /// An invocation succeeded but its expected output artifact is missing.
    #[error("expected artifact {path:?} was not produced")]
    ArtifactMissing {
        /// Expected artifact path.
        path: PathBuf,
    },

    /// Filesystem or stream error while driving a stage.
    #[error("{stage}: {source}")]
    Io {
        /// Stage name for the operator.
        stage: String,
        /// The underlying error.
        source: std::io::Error,
    },
}

/// Which sources the simulator compiles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimKind {
    /// Testbench plus the original RTL sources.
    Rtl,
    /// Testbench plus the post-synthesis netlist and the technology model.
    GateLevel,
}

fn annotation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^Annotated ([0-9]+) pin activities\.").expect("annotation pattern is valid")
    })
}

/// Runs external stages for one project against a fixed toolchain.
pub struct StageRunner<'a> {
    tools: &'a ToolchainConfig,
}

impl<'a> StageRunner<'a> {
    /// Create a runner bound to a resolved toolchain.
    pub fn new(tools: &'a ToolchainConfig) -> Self {
        Self { tools }
    }

    /// Write the synthesis configuration derived from the project attributes.
    pub fn write_config(&self, project: &Project) -> Result<(), StageError> {
        info!("[{}] writing config.mk", project.name);

        let verilog_files = project
            .rtl_sources
            .iter()
            .map(|s| format!("$(PROJECT_DIR)/{}", s))
            .collect::<Vec<_>>()
            .join(" ");
        let config = format!(
            "export PLATFORM = {platform}\n\
             export DESIGN_NICKNAME = {name}\n\
             export DESIGN_NAME = {name}\n\
             export VERILOG_FILES = {verilog_files}\n\
             export SDC_FILE = $(PROJECT_DIR)/constraints.sdc\n",
            platform = project.platform,
            name = project.name,
        );

        fs::write(project.config_path(), config).map_err(|source| StageError::Io {
            stage: "write-config".to_string(),
            source,
        })
    }

    /// Compile and execute the testbench, either against the RTL sources or
    /// against the synthesized netlist plus the technology model.
    pub fn simulate(&self, project: &Project, kind: SimKind) -> Result<(), StageError> {
        match kind {
            SimKind::Rtl => info!("[{}] simulating testbench with Icarus Verilog", project.name),
            SimKind::GateLevel => info!("[{}] gate-level simulation of synthesized netlist", project.name),
        }

        let vvp_file = project.vvp_path(kind == SimKind::GateLevel);

        let mut compile = Command::new(&self.tools.iverilog);
        for tb in &project.testbench_sources {
            compile.arg(project.directory.join(tb));
        }
        match kind {
            SimKind::Rtl => {
                for src in &project.rtl_sources {
                    compile.arg(project.directory.join(src));
                }
            }
            SimKind::GateLevel => {
                compile.arg(project.netlist_path());
                compile.arg(self.tools.orfs_root.join(format!(
                    "flow/platforms/{}/work_around_yosys/formal_pdk.v",
                    project.platform
                )));
            }
        }
        compile.arg("-g2012").arg("-o").arg(&vvp_file);
        run_checked("iverilog", &mut compile)?;

        let mut execute = Command::new(&self.tools.vvp);
        execute.arg(&vvp_file).current_dir(project.out());
        run_checked("vvp", &mut execute)
    }

    /// Clear prior synthesis artifacts (exit status ignored), run the real
    /// synthesis, then copy the flow's output netlist into `out/`.
    pub fn synthesize(&self, project: &Project) -> Result<(), StageError> {
        info!("[{}] synthesising design with ORFS", project.name);

        // Cleaning failure is not meaningful; a missing build tool is.
        let mut clean = self.make_command(project);
        clean.arg("clean_all").stdout(Stdio::null());
        let _ = clean.status().map_err(|source| StageError::Spawn {
            stage: "make clean_all".to_string(),
            source,
        })?;

        let mut synth = self.make_command(project);
        synth.arg("synth");
        run_checked("make synth", &mut synth)?;

        let produced = self.tools.orfs_root.join(format!(
            "flow/results/{}/{}/base/1_synth.v",
            project.platform, project.name
        ));
        if !produced.exists() {
            return Err(StageError::ArtifactMissing { path: produced });
        }
        fs::copy(&produced, project.netlist_path()).map_err(|source| StageError::Io {
            stage: "netlist copy".to_string(),
            source,
        })?;
        Ok(())
    }

    /// Convert the raw trace into one of the converter-produced formats,
    /// redirecting the converter's stdout into the fixed-path activity file.
    pub fn convert_activity(
        &self,
        project: &Project,
        format: ActivityFormat,
    ) -> Result<(), StageError> {
        info!(
            "[{}] converting trace with trace2power to {}",
            project.name,
            format.selector().to_uppercase()
        );

        let output = fs::File::create(project.activity_path(format)).map_err(|source| {
            StageError::Io {
                stage: "trace2power".to_string(),
                source,
            }
        })?;

        let mut convert = Command::new(&self.tools.trace2power);
        convert
            .arg(project.trace_path())
            .arg("--clk-freq")
            .arg(project.clk_freq.to_string())
            .arg("--output-format")
            .arg(format.selector());
        if format == ActivityFormat::Saif {
            // trace2power limits SAIF export to a dot-separated scope path.
            convert.arg("--limit-scope").arg(project.scope.replace('/', "."));
        }
        convert.stdout(Stdio::from(output));
        run_checked("trace2power", &mut convert)
    }

    /// Run the power analyzer for one activity format, streaming its stdout
    /// to watch for the pin-annotation confirmation, then verify the report
    /// file exists and echo it to the operator.
    pub fn analyze_power(
        &self,
        project: &Project,
        format: ActivityFormat,
    ) -> Result<(), StageError> {
        info!(
            "[{}] power analysis with OpenSTA ({})",
            project.name,
            format.selector()
        );

        let mut analyze = Command::new(&self.tools.opensta);
        analyze
            .arg("-exit")
            .arg(&self.tools.sta_script)
            .env("ORFS", &self.tools.orfs_root)
            .env("DESIGN", &project.name)
            .env("DESIGN_TOP", &project.top)
            .env("PROJECT_DIR", &project.directory)
            .env("DESIGN_SCOPE", &project.scope)
            .env("POWER_ACTIVITY_FMT", format.selector())
            .stdout(Stdio::piped());

        let mut child = analyze.spawn().map_err(|source| StageError::Spawn {
            stage: "opensta".to_string(),
            source,
        })?;

        let mut pins_annotated = false;
        let mut zero_annotated = false;
        // Blocking read loop until the tool closes its stdout (process exit).
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line.map_err(|source| StageError::Io {
                    stage: "opensta".to_string(),
                    source,
                })?;
                if let Some(captures) = annotation_pattern().captures(line.trim()) {
                    println!("{}", line);
                    if &captures[1] == "0" {
                        zero_annotated = true;
                    } else {
                        pins_annotated = true;
                    }
                }
            }
        }

        let status = child.wait().map_err(|source| StageError::Io {
            stage: "opensta".to_string(),
            source,
        })?;

        if zero_annotated {
            return Err(StageError::ZeroPinsAnnotated);
        }
        if !status.success() {
            return Err(StageError::ToolFailed {
                stage: "opensta".to_string(),
                code: status.code().unwrap_or(-1),
            });
        }
        if self.tools.requires_annotation(format) && !pins_annotated {
            return Err(StageError::AnnotationNotAttempted);
        }

        let report_path = project.report_path(format);
        let report = fs::read_to_string(&report_path)
            .map_err(|_| StageError::ReportMissing { path: report_path })?;
        println!(
            "::: {} power report :::\n{}",
            format.selector().to_uppercase(),
            report
        );
        Ok(())
    }

    fn make_command(&self, project: &Project) -> Command {
        let mut make = Command::new(&self.tools.make);
        make.arg("-C")
            .arg(self.tools.orfs_root.join("flow"))
            .arg(format!("PROJECT_DIR={}", project.directory.display()))
            .arg(format!("DESIGN_CONFIG={}", project.config_path().display()));
        make
    }
}

fn run_checked(stage: &str, command: &mut Command) -> Result<(), StageError> {
    let status = command.status().map_err(|source| StageError::Spawn {
        stage: stage.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(StageError::ToolFailed {
            stage: stage.to_string(),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_pattern_extracts_count() {
        let captures = annotation_pattern()
            .captures("Annotated 128 pin activities.")
            .unwrap();
        assert_eq!(&captures[1], "128");
    }

    #[test]
    fn annotation_pattern_rejects_unrelated_lines() {
        assert!(annotation_pattern().captures("Reading SDF file.").is_none());
        assert!(
            annotation_pattern()
                .captures("pins Annotated 3 pin activities.")
                .is_none()
        );
    }

    #[test]
    fn zero_count_is_distinguishable() {
        let captures = annotation_pattern()
            .captures("Annotated 0 pin activities.")
            .unwrap();
        assert_eq!(&captures[1], "0");
    }

    #[test]
    fn error_messages_name_the_stage() {
        let err = StageError::ToolFailed {
            stage: "make synth".to_string(),
            code: 2,
        };
        assert_eq!(err.to_string(), "make synth exited with non-zero code: 2");
    }
}
