//! Notebook test harness engine for nbcheck.
//!
//! This crate provides:
//! - Discovery of notebooks under configured roots
//! - Preprocessing into runnable working copies (path rewrites, snippet
//!   loading, placeholder stripping, warning collection)
//! - Execution through pytest + nbmake
//! - Rendering to HTML or PDF
//! - Cleanup and the dated run log
//!
//! External programs are launched through the [`CommandRunner`] trait so the
//! pipeline can be driven without a Python toolchain in tests.

pub mod cleanup;
pub mod command;
pub mod config;
pub mod discover;
pub mod driver;
pub mod error;
pub mod log;
pub mod paths;
pub mod preprocess;
pub mod render;
pub mod runner;

pub use cleanup::{CleanupReport, find_orphans, remove_working_files};
pub use command::{
    CommandOutput, CommandRunner, Completion, Invocation, SystemCommandRunner, is_available,
};
pub use config::{ExecutionMode, HarnessConfig, PathMapping, RenderFormat, Tools};
pub use discover::{Discovery, Exclusion, NotebookDiscoverer};
pub use driver::{Driver, NotebookReport, NotebookStatus, RunSummary};
pub use error::{Error, Result};
pub use log::RunLog;
pub use paths::{NotebookPaths, root_labels, temp_notebook_path};
pub use preprocess::{PreprocessReport, Preprocessor};
pub use render::Renderer;
pub use runner::{NotebookRunner, RunOutcome, collect_diagnostics, mine_diagnostics};
