//! Notebook preprocessing.
//!
//! Turns a source notebook into a runnable working copy:
//!
//! ```text
//! source.ipynb ──► read ──► per code cell: rewrite paths ──► resolve snippet ──► strip placeholder
//!                                                                                      │
//!      source_tmp.ipynb ◄── write ◄── prepend warning collector (optional) ◄───────────┘
//! ```
//!
//! Markdown and raw cells are copied through untouched. The source file is
//! never written.

mod directive;
mod transform;

pub use directive::{LoadDirective, parse_load_directive};
pub use transform::{
    PLACEHOLDER, Resolution, SNIPPETS_DIR, SnippetResolver, has_placeholder, rewrite_paths,
};

use std::fs;
use std::path::{Path, PathBuf};

use nbcheck_notebook::Notebook;

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::paths::NotebookPaths;

/// Cell id of the injected warning collector.
pub const COLLECTOR_CELL_ID: &str = "nbcheck-warning-collector";

/// Variable the collector appends to; also identifies the collector cell.
pub const COLLECTOR_MARKER: &str = "notebook_warnings";

/// Python source of the warning-collector cell.
///
/// Each warning is stored in `notebook_warnings` and printed, so it ends up
/// in the stream output of the cell that raised it.
pub const COLLECTOR_SOURCE: &str = r#"import warnings
notebook_warnings = []
def warning_collector(message, category, filename, lineno, file=None, line=None):
    entry = f"{category.__name__}: {message} (File {filename}, line {lineno})"
    notebook_warnings.append(entry)
    print(entry)
warnings.showwarning = warning_collector
"#;

/// What preprocessing did to one notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    /// Cells in the working copy.
    pub cells: usize,
    /// Whether the warning collector was prepended.
    pub collector_injected: bool,
    /// Indices (in the source notebook) of cells whose paths were rewritten.
    pub rewritten: Vec<usize>,
    /// Snippet files substituted into cells.
    pub snippets: Vec<PathBuf>,
    /// Problems with load-directives: cell index and description.
    pub snippet_problems: Vec<(usize, String)>,
    /// Indices of cells blanked because they held a placeholder.
    pub blanked: Vec<usize>,
}

/// Applies the cell transforms and writes working copies.
pub struct Preprocessor<'a> {
    config: &'a HarnessConfig,
}

impl<'a> Preprocessor<'a> {
    /// Create a preprocessor for `config`.
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self { config }
    }

    /// Transform a notebook in memory.
    ///
    /// `notebook_dir` is the folder of the *source* notebook; snippets are
    /// looked up below it.
    pub fn transform(&self, notebook: &mut Notebook, notebook_dir: &Path) -> PreprocessReport {
        let resolver = SnippetResolver::new(notebook_dir);
        let mut report = PreprocessReport::default();

        for (index, cell) in notebook.cells.iter_mut().enumerate() {
            if !cell.is_code() {
                continue;
            }

            let original = cell.source_text();
            let mut source = rewrite_paths(&original, &self.config.path_mappings).into_owned();
            if source != original {
                report.rewritten.push(index);
            }

            match resolver.resolve(&source) {
                Resolution::Unchanged => {}
                Resolution::Replaced { path, text } => {
                    source = text;
                    report.snippets.push(path);
                }
                Resolution::Missing(path) => {
                    tracing::warn!("Snippet path {} does not exist", path.display());
                    report
                        .snippet_problems
                        .push((index, format!("snippet {} does not exist", path.display())));
                }
                Resolution::Unreadable { path, message } => {
                    tracing::warn!("Snippet {} could not be read: {}", path.display(), message);
                    report.snippet_problems.push((
                        index,
                        format!("snippet {} could not be read: {}", path.display(), message),
                    ));
                }
                Resolution::Malformed(reason) => {
                    tracing::warn!("Cell {}: {}", index, reason);
                    report.snippet_problems.push((index, reason));
                }
            }

            if has_placeholder(&source) {
                source.clear();
                report.blanked.push(index);
            }

            if source != original {
                cell.set_source(&source);
            }
        }

        if self.config.inject_warning_collector {
            notebook.prepend_code_cell(COLLECTOR_CELL_ID, COLLECTOR_SOURCE);
            report.collector_injected = true;
        }

        report.cells = notebook.cells.len();
        report
    }

    /// Read `paths.source`, transform it and write `paths.temp`.
    ///
    /// Any failure here is fatal for this notebook only.
    pub fn preprocess(&self, paths: &NotebookPaths) -> Result<PreprocessReport> {
        let mut notebook = Notebook::read_from_file(&paths.source)?;
        let report = self.transform(&mut notebook, paths.source_dir());

        if let Some(parent) = paths.temp.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::at(parent, e))?;
        }
        notebook.write_to_file(&paths.temp)?;

        tracing::debug!(
            "Preprocessed {} → {} ({} cells, {} blanked, {} snippets)",
            paths.source.display(),
            paths.temp.display(),
            report.cells,
            report.blanked.len(),
            report.snippets.len()
        );
        Ok(report)
    }
}
