//! Project descriptors.
//!
//! A `Project` is the static definition of one hardware design under test.
//! Descriptors are constructed once at startup and immutable thereafter; the
//! only mutable state is the project's `out/` directory, which is wiped and
//! recreated at the start of every run so no state survives across runs.

use crate::activity::ActivityFormat;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Static definition of one design under test.
#[derive(Debug, Clone)]
pub struct Project {
    /// Unique project name; also the design name handed to the tools.
    pub name: String,
    /// Project working directory; sources are relative to it.
    pub directory: PathBuf,
    /// Testbench sources, in compile order.
    pub testbench_sources: Vec<String>,
    /// RTL sources, in compile order.
    pub rtl_sources: Vec<String>,
    /// Clock frequency in Hz.
    pub clk_freq: f64,
    /// Top-level module name.
    pub top: String,
    /// Hierarchical instance path analysis is rooted at, slash-separated.
    pub scope: String,
    /// Process-technology identifier for the synthesis flow.
    pub platform: String,
}

impl Project {
    /// Output directory owned by this project's run.
    pub fn out(&self) -> PathBuf {
        self.directory.join("out")
    }

    /// Synthesis configuration file written at the start of a run.
    pub fn config_path(&self) -> PathBuf {
        self.out().join("config.mk")
    }

    /// Compiled simulation artifact for the given RTL/gate-level flavor.
    pub fn vvp_path(&self, gate_level: bool) -> PathBuf {
        if gate_level {
            self.out().join(format!("{}.vvp", self.name))
        } else {
            self.out().join(format!("{}_rtl.vvp", self.name))
        }
    }

    /// Post-synthesis netlist copied into `out/`.
    pub fn netlist_path(&self) -> PathBuf {
        self.out().join(format!("{}_synth.v", self.name))
    }

    /// Raw activity trace produced by the gate-level simulation.
    pub fn trace_path(&self) -> PathBuf {
        self.out().join(format!("{}.vcd", self.name))
    }

    /// Converted activity file for a converter-produced format.
    pub fn activity_path(&self, format: ActivityFormat) -> PathBuf {
        debug_assert!(format.is_converted());
        self.out()
            .join(format!("{}.{}", self.name, format.selector()))
    }

    /// Power report path for the given activity format.
    pub fn report_path(&self, format: ActivityFormat) -> PathBuf {
        self.out().join(format.report_name())
    }

    /// Delete and recreate `out/`. Destructive on purpose: re-running a
    /// project must never observe artifacts from a previous run.
    pub fn prepare_out_dir(&self) -> io::Result<()> {
        let out = self.out();
        if out.exists() {
            fs::remove_dir_all(&out)?;
        }
        fs::create_dir_all(&out)
    }
}

/// The configured project set, rooted at `root`.
pub fn builtin_projects(root: &Path) -> Vec<Project> {
    vec![
        Project {
            name: "counter".to_string(),
            directory: root.join("counter"),
            testbench_sources: vec!["counter_tb.v".to_string()],
            rtl_sources: vec!["counter.v".to_string()],
            clk_freq: 500_000_000.0,
            top: "counter".to_string(),
            scope: "counter_tb/counter0".to_string(),
            platform: "sky130hd".to_string(),
        },
        Project {
            name: "tristate".to_string(),
            directory: root.join("tristate"),
            testbench_sources: vec!["tristate_tb.sv".to_string()],
            rtl_sources: vec!["tristate.v".to_string()],
            clk_freq: 500_000_000.0,
            top: "tristate".to_string(),
            scope: "tristate_tb/tristate0".to_string(),
            platform: "sky130hd".to_string(),
        },
    ]
}
