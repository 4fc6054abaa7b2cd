//! Activity format tags.
//!
//! Each power report is keyed by the activity format it was derived from:
//! the raw simulation trace (`vcd`), one of the converted textual formats
//! (`saif`, `tcl`), or no activity at all (`null`, the baseline that proves
//! the analyzer is reachable before any comparison is attempted).

/// Activity-trace format driving one power-analysis invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActivityFormat {
    /// No activity input; baseline report only, never compared.
    Null,
    /// Raw simulation trace. The fixed reference format.
    Vcd,
    /// SAIF converted from the raw trace.
    Saif,
    /// TCL annotation script converted from the raw trace.
    Tcl,
}

impl ActivityFormat {
    /// The ground-truth format every converted report is compared against.
    pub const REFERENCE: ActivityFormat = ActivityFormat::Vcd;

    /// Formats produced by running the activity converter on the raw trace.
    pub const CONVERTED: [ActivityFormat; 2] = [ActivityFormat::Saif, ActivityFormat::Tcl];

    /// Selector string passed to the power analyzer via `POWER_ACTIVITY_FMT`,
    /// and used in report file names.
    pub fn selector(self) -> &'static str {
        match self {
            ActivityFormat::Null => "null",
            ActivityFormat::Vcd => "vcd",
            ActivityFormat::Saif => "saif",
            ActivityFormat::Tcl => "tcl",
        }
    }

    /// Report file name under a project's `out/` directory.
    pub fn report_name(self) -> String {
        format!("power_report_{}.txt", self.selector())
    }

    /// Whether this format's activity file is produced by the converter
    /// (as opposed to the simulator or nothing at all).
    pub fn is_converted(self) -> bool {
        Self::CONVERTED.contains(&self)
    }
}

impl std::fmt::Display for ActivityFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.selector())
    }
}

impl std::str::FromStr for ActivityFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" | "none" => Ok(ActivityFormat::Null),
            "vcd" => Ok(ActivityFormat::Vcd),
            "saif" => Ok(ActivityFormat::Saif),
            "tcl" => Ok(ActivityFormat::Tcl),
            other => Err(format!("unknown activity format: {}", other)),
        }
    }
}
