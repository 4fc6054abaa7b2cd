//! Toolchain configuration.
//!
//! Configuration comes from two layers: an optional `powerbench.toml` in the
//! projects root, and environment variables that override it (`ORFS` is
//! required; `OPENSTA`, `IVERILOG`, `TRACE2POWER` are optional binary
//! overrides). The resolved [`ToolchainConfig`] is an immutable value threaded
//! into the stage runner and pipeline driver, so tests can substitute fake
//! tool paths without touching process-wide state.

use crate::activity::ActivityFormat;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration failures are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// `powerbench.toml` exists but could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// Configuration file path.
        path: PathBuf,
        /// The underlying read error.
        source: std::io::Error,
    },

    /// `powerbench.toml` exists but is not valid TOML for this schema.
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        /// Configuration file path.
        path: PathBuf,
        /// The underlying parse error.
        source: toml::de::Error,
    },

    /// `[annotation] exempt` names a format the harness does not know.
    #[error("invalid activity format in [annotation] exempt: {0}")]
    InvalidExemptFormat(String),
}

/// Resolved tool locations and per-format annotation policy.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Root of the synthesis flow checkout (`ORFS`).
    pub orfs_root: PathBuf,
    /// Power analyzer binary.
    pub opensta: PathBuf,
    /// Simulator compile binary.
    pub iverilog: PathBuf,
    /// Simulator runtime binary.
    pub vvp: PathBuf,
    /// Activity converter binary.
    pub trace2power: PathBuf,
    /// Build tool driving the synthesis flow.
    pub make: PathBuf,
    /// Control script handed to the power analyzer.
    pub sta_script: PathBuf,
    /// Formats exempt from the pin-annotation confirmation requirement.
    /// `Null` is always exempt regardless of this set.
    pub annotation_exempt: BTreeSet<ActivityFormat>,
}

impl ToolchainConfig {
    /// Whether a power-analysis invocation for `format` must observe the
    /// `Annotated N pin activities.` confirmation to count as a success.
    pub fn requires_annotation(&self, format: ActivityFormat) -> bool {
        format != ActivityFormat::Null && !self.annotation_exempt.contains(&format)
    }

    /// Resolve configuration from the process environment, layered over
    /// `powerbench.toml` in `root` if one exists.
    pub fn from_env(root: &Path) -> Result<Self, ConfigError> {
        let file = HarnessFile::discover(root)?;
        Self::resolve(root, &file, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from an explicit variable lookup. Environment
    /// values win over file values, file values over built-in defaults.
    pub fn resolve(
        root: &Path,
        file: &HarnessFile,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let orfs_root = match lookup("ORFS") {
            Some(v) if !v.is_empty() => PathBuf::from(v),
            _ => return Err(ConfigError::MissingEnv("ORFS")),
        };

        let opensta = lookup("OPENSTA")
            .map(PathBuf::from)
            .or_else(|| file.tools.opensta.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| orfs_root.join("tools/OpenROAD/src/sta/app/sta"));
        let iverilog = lookup("IVERILOG")
            .or_else(|| file.tools.iverilog.clone())
            .unwrap_or_else(|| "iverilog".to_string());
        let trace2power = lookup("TRACE2POWER")
            .or_else(|| file.tools.trace2power.clone())
            .unwrap_or_else(|| "trace2power".to_string());

        let mut annotation_exempt = BTreeSet::new();
        for name in &file.annotation.exempt {
            let format = name
                .parse::<ActivityFormat>()
                .map_err(|_| ConfigError::InvalidExemptFormat(name.clone()))?;
            annotation_exempt.insert(format);
        }

        Ok(ToolchainConfig {
            orfs_root,
            opensta,
            iverilog: PathBuf::from(iverilog),
            vvp: PathBuf::from(file.tools.vvp.clone().unwrap_or_else(|| "vvp".to_string())),
            trace2power: PathBuf::from(trace2power),
            make: PathBuf::from(file.tools.make.clone().unwrap_or_else(|| "make".to_string())),
            sta_script: root.join("sta.tcl"),
            annotation_exempt,
        })
    }
}

/// `powerbench.toml` contents.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HarnessFile {
    /// Tool binary overrides.
    #[serde(default)]
    pub tools: ToolsTable,
    /// Pin-annotation confirmation policy.
    #[serde(default)]
    pub annotation: AnnotationTable,
}

/// `[tools]` table: binary path overrides.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsTable {
    /// Power analyzer binary.
    #[serde(default)]
    pub opensta: Option<String>,
    /// Simulator compile binary.
    #[serde(default)]
    pub iverilog: Option<String>,
    /// Simulator runtime binary.
    #[serde(default)]
    pub vvp: Option<String>,
    /// Activity converter binary.
    #[serde(default)]
    pub trace2power: Option<String>,
    /// Build tool driving the synthesis flow.
    #[serde(default)]
    pub make: Option<String>,
}

/// `[annotation]` table: which formats skip the confirmation requirement.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationTable {
    /// The analyzer version currently shipped with the flow does not report
    /// the number of activities read from a SAIF file, so `saif` is exempt by
    /// default. Remove it here once the flow picks up an analyzer that does.
    #[serde(default = "default_exempt")]
    pub exempt: Vec<String>,
}

impl Default for AnnotationTable {
    fn default() -> Self {
        Self {
            exempt: default_exempt(),
        }
    }
}

fn default_exempt() -> Vec<String> {
    vec!["saif".to_string()]
}

impl HarnessFile {
    /// Load `powerbench.toml` from `root`, or defaults if absent.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("powerbench.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&str, &str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn missing_orfs_is_fatal() {
        let err = ToolchainConfig::resolve(Path::new("."), &HarnessFile::default(), env(&[]));
        assert!(matches!(err, Err(ConfigError::MissingEnv("ORFS"))));
    }

    #[test]
    fn empty_orfs_is_fatal() {
        let err = ToolchainConfig::resolve(
            Path::new("."),
            &HarnessFile::default(),
            env(&[("ORFS", "")]),
        );
        assert!(matches!(err, Err(ConfigError::MissingEnv("ORFS"))));
    }

    #[test]
    fn defaults_derive_from_orfs_root() {
        let cfg = ToolchainConfig::resolve(
            Path::new("/proj"),
            &HarnessFile::default(),
            env(&[("ORFS", "/opt/orfs")]),
        )
        .unwrap();
        assert_eq!(cfg.opensta, Path::new("/opt/orfs/tools/OpenROAD/src/sta/app/sta"));
        assert_eq!(cfg.iverilog, Path::new("iverilog"));
        assert_eq!(cfg.sta_script, Path::new("/proj/sta.tcl"));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let file: HarnessFile = toml::from_str(
            r#"
            [tools]
            opensta = "/from/file/sta"
            iverilog = "/from/file/iverilog"
        "#,
        )
        .unwrap();
        let cfg = ToolchainConfig::resolve(
            Path::new("."),
            &file,
            env(&[("ORFS", "/opt/orfs"), ("OPENSTA", "/from/env/sta")]),
        )
        .unwrap();
        assert_eq!(cfg.opensta, Path::new("/from/env/sta"));
        assert_eq!(cfg.iverilog, Path::new("/from/file/iverilog"));
    }

    #[test]
    fn saif_is_exempt_by_default() {
        let cfg = ToolchainConfig::resolve(
            Path::new("."),
            &HarnessFile::default(),
            env(&[("ORFS", "/opt/orfs")]),
        )
        .unwrap();
        assert!(!cfg.requires_annotation(ActivityFormat::Saif));
        assert!(cfg.requires_annotation(ActivityFormat::Vcd));
        assert!(cfg.requires_annotation(ActivityFormat::Tcl));
        assert!(!cfg.requires_annotation(ActivityFormat::Null));
    }

    #[test]
    fn exemption_is_configurable() {
        let file: HarnessFile = toml::from_str(
            r#"
            [annotation]
            exempt = []
        "#,
        )
        .unwrap();
        let cfg =
            ToolchainConfig::resolve(Path::new("."), &file, env(&[("ORFS", "/opt/orfs")])).unwrap();
        assert!(cfg.requires_annotation(ActivityFormat::Saif));
    }

    #[test]
    fn bad_exempt_format_is_rejected() {
        let file: HarnessFile = toml::from_str(
            r#"
            [annotation]
            exempt = ["fsdb"]
        "#,
        )
        .unwrap();
        let err = ToolchainConfig::resolve(Path::new("."), &file, env(&[("ORFS", "/opt/orfs")]));
        assert!(matches!(err, Err(ConfigError::InvalidExemptFormat(_))));
    }
}
