//! Notebook discovery.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::HarnessConfig;
use crate::paths::{NotebookPaths, is_temp_notebook, root_labels};

/// Why a notebook file was not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Listed in the skip list.
    Skipped,
    /// A working copy left by this or an earlier run.
    Temporary,
}

/// Result of walking the configured roots.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Notebooks to process, in traversal order.
    pub notebooks: Vec<NotebookPaths>,
    /// Notebook files that were seen but excluded.
    pub excluded: Vec<(PathBuf, Exclusion)>,
    /// Paths that could not be read (a missing root, an unreadable folder),
    /// with the reason. The walk carries on past them.
    pub problems: Vec<(PathBuf, String)>,
}

/// Walks the configured roots looking for notebooks.
pub struct NotebookDiscoverer<'a> {
    config: &'a HarnessConfig,
}

impl<'a> NotebookDiscoverer<'a> {
    /// Create a discoverer for `config`.
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self { config }
    }

    /// Enumerate every root.
    ///
    /// Within a folder, entries are visited in file-name order so that two
    /// walks over an unchanged tree give the same list.
    pub fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        let labels = root_labels(&self.config.roots);

        for (root, label) in self.config.roots.iter().zip(labels) {
            tracing::debug!("Searching in folder: {}", root.display());

            let walker = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !(self.config.skip_hidden && is_hidden_dir(e)));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                        tracing::warn!("Cannot search {}: {}", path.display(), e);
                        discovery.problems.push((path, e.to_string()));
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !nbcheck_notebook::is_notebook_path(entry.path()) {
                    continue;
                }

                let path = entry.path();
                match self.exclusion(path) {
                    Some(reason) => {
                        tracing::debug!("Excluding {} ({:?})", path.display(), reason);
                        discovery.excluded.push((path.to_path_buf(), reason));
                    }
                    None => discovery.notebooks.push(NotebookPaths::with_label(
                        path,
                        root,
                        &label,
                        self.config,
                    )),
                }
            }
        }

        discovery
    }

    /// Decide whether a notebook file is excluded.
    pub fn exclusion(&self, path: &Path) -> Option<Exclusion> {
        if is_temp_notebook(path, &self.config.temp_suffix) {
            Some(Exclusion::Temporary)
        } else if self.config.skip.iter().any(|s| s == path) {
            Some(Exclusion::Skipped)
        } else {
            None
        }
    }
}

/// Hidden directories below the root (`.ipynb_checkpoints`, `.git`, ...).
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}
