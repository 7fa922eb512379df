//! Harness configuration.
//!
//! A [`HarnessConfig`] is built once at startup (defaults, then an optional
//! TOML file, then command-line overrides) and passed by reference to every
//! stage of the pipeline.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Slack added to the executor's own timeout before the harness kills it.
const PROCESS_GRACE: Duration = Duration::from_secs(60);

/// Literal prefix substitution applied to code-cell sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    /// Prefix to look for.
    pub from: String,
    /// Replacement prefix.
    pub to: String,
}

impl PathMapping {
    /// Create a mapping.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// How notebooks are handed to the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// One executor process per notebook.
    #[default]
    PerNotebook,
    /// One executor process for all notebooks; status is the aggregate.
    Batch,
}

/// Format of the archived review copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderFormat {
    /// Standalone HTML via nbconvert.
    #[default]
    Html,
    /// LaTeX via nbconvert, then PDF via the LaTeX compiler.
    Pdf,
    /// Do not render.
    None,
}

impl RenderFormat {
    /// File extension of the rendered document.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Html => Some("html"),
            Self::Pdf => Some("pdf"),
            Self::None => None,
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "HTML"),
            Self::Pdf => write!(f, "PDF"),
            Self::None => write!(f, "none"),
        }
    }
}

/// External programs the harness drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tools {
    /// Test runner with the nbmake plugin.
    pub pytest: String,
    /// Jupyter front-end providing `nbconvert`.
    pub jupyter: String,
    /// LaTeX-to-PDF compiler.
    pub tectonic: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            pytest: "pytest".to_string(),
            jupyter: "jupyter".to_string(),
            tectonic: "tectonic".to_string(),
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Folders searched recursively for notebooks.
    pub roots: Vec<PathBuf>,

    /// Notebooks never executed, compared literally against discovered paths.
    pub skip: Vec<PathBuf>,

    /// Prefix rewrites for data-mount paths, applied in order.
    pub path_mappings: Vec<PathMapping>,

    /// Marker appended to the file stem of working copies.
    pub temp_suffix: String,

    /// Put working copies here (mirroring the source tree) instead of next
    /// to the originals.
    pub scratch_dir: Option<PathBuf>,

    /// Ignore hidden directories such as `.ipynb_checkpoints`.
    pub skip_hidden: bool,

    /// Jupyter kernel the notebooks run under.
    pub kernel: String,

    /// Per-notebook execution timeout in seconds.
    pub timeout_secs: u64,

    /// Treat Python warnings as errors.
    pub warnings_as_errors: bool,

    /// Warning categories exempt from `warnings_as_errors`.
    pub exempt_warnings: Vec<String>,

    /// Per-notebook or batch execution.
    pub execution_mode: ExecutionMode,

    /// Format of the archived review copy.
    pub render_format: RenderFormat,

    /// Root folder for rendered documents.
    pub output_dir: PathBuf,

    /// Folder receiving the dated run log.
    pub log_dir: PathBuf,

    /// Prepend a cell that reports Python warnings into the cell outputs.
    pub inject_warning_collector: bool,

    /// Working directory for external programs. Defaults to the notebook's
    /// folder (per-notebook mode) or the current directory (batch mode).
    pub work_dir: Option<PathBuf>,

    /// Timeout for each rendering command, in seconds.
    pub render_timeout_secs: u64,

    /// Exit non-zero when any notebook fails.
    pub strict: bool,

    /// External program names.
    pub tools: Tools,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            skip: Vec::new(),
            path_mappings: vec![
                PathMapping::new(
                    "/mnt/materials/SIRF/Fully3D/CIL/",
                    "/mnt/share/materials/SIRF/Fully3D/CIL/",
                ),
                PathMapping::new("/mnt/materials/", "/mnt/share/materials/"),
            ],
            temp_suffix: "_tmp".to_string(),
            scratch_dir: None,
            skip_hidden: true,
            kernel: "cil".to_string(),
            timeout_secs: 900,
            warnings_as_errors: true,
            exempt_warnings: vec!["ResourceWarning".to_string()],
            execution_mode: ExecutionMode::PerNotebook,
            render_format: RenderFormat::Html,
            output_dir: PathBuf::from("html_outputs"),
            log_dir: PathBuf::from("."),
            inject_warning_collector: true,
            work_dir: None,
            render_timeout_secs: 300,
            strict: false,
            tools: Tools::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::at(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::Config("no notebook roots configured".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        if self.temp_suffix.is_empty() {
            return Err(Error::Config("temp_suffix must not be empty".to_string()));
        }
        if let Some(mapping) = self.path_mappings.iter().find(|m| m.from.is_empty()) {
            return Err(Error::Config(format!(
                "path mapping to {:?} has an empty source prefix",
                mapping.to
            )));
        }
        Ok(())
    }

    /// Per-notebook execution timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Wall-clock limit for one executor process covering `notebooks` notebooks.
    ///
    /// `None` when the limit does not fit in a `Duration`; the process then
    /// runs unguarded and only the executor's own per-cell timeout applies.
    pub fn process_timeout(&self, notebooks: usize) -> Option<Duration> {
        let notebooks = u64::try_from(notebooks.max(1)).ok()?;
        self.timeout_secs
            .checked_mul(notebooks)
            .map(Duration::from_secs)
            .and_then(|limit| limit.checked_add(PROCESS_GRACE))
    }

    /// Timeout for each rendering command.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Path of the dated run log for a run started at `started_at`.
    pub fn log_path(&self, started_at: NaiveDateTime) -> PathBuf {
        self.log_dir.join(format!(
            "test_notebooks_{}.log",
            started_at.format("%Y%m%d_%H%M%S")
        ))
    }
}
