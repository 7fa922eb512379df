//! Command-line configuration flags.
//!
//! Configuration is layered: built-in defaults, then the `--config` file,
//! then the flags below. Only flags that were given override anything.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use nbcheck_core::{ExecutionMode, HarnessConfig, RenderFormat};

/// Rendered output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Html,
    Pdf,
    None,
}

impl From<FormatArg> for RenderFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => RenderFormat::Html,
            FormatArg::Pdf => RenderFormat::Pdf,
            FormatArg::None => RenderFormat::None,
        }
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct Settings {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Notebook to leave out (repeatable, matched literally)
    #[arg(long, value_name = "NOTEBOOK")]
    pub skip: Vec<PathBuf>,

    /// Run all notebooks in a single executor invocation
    #[arg(long)]
    pub batch: bool,

    /// Format of the rendered review copy
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Jupyter kernel to execute with
    #[arg(long)]
    pub kernel: Option<String>,

    /// Per-notebook timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not prepend the warning-collector cell
    #[arg(long)]
    pub no_warning_cell: bool,

    /// Do not turn Python warnings into errors
    #[arg(long)]
    pub allow_warnings: bool,

    /// Folder for the dated run log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Folder for rendered notebooks
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write working copies here instead of next to the notebooks
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Working directory for the executor and converters
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// pytest executable
    #[arg(long, value_name = "PROGRAM")]
    pub pytest: Option<String>,

    /// jupyter executable
    #[arg(long, value_name = "PROGRAM")]
    pub jupyter: Option<String>,

    /// tectonic executable
    #[arg(long, value_name = "PROGRAM")]
    pub tectonic: Option<String>,
}

impl Settings {
    /// Build the harness configuration. Non-empty `roots` replace the
    /// configured ones.
    pub fn load(&self, roots: &[PathBuf]) -> nbcheck_core::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };

        if !roots.is_empty() {
            config.roots = roots.to_vec();
        }
        config.skip.extend(self.skip.iter().cloned());
        if self.batch {
            config.execution_mode = ExecutionMode::Batch;
        }
        if let Some(format) = self.format {
            config.render_format = format.into();
        }
        if let Some(kernel) = &self.kernel {
            config.kernel = kernel.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.no_warning_cell {
            config.inject_warning_collector = false;
        }
        if self.allow_warnings {
            config.warnings_as_errors = false;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = Some(dir.clone());
        }
        if let Some(program) = &self.pytest {
            config.tools.pytest = program.clone();
        }
        if let Some(program) = &self.jupyter {
            config.tools.jupyter = program.clone();
        }
        if let Some(program) = &self.tectonic {
            config.tools.tectonic = program.clone();
        }

        Ok(config)
    }
}
