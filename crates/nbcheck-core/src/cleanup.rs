//! Removal of working files.
//!
//! After a notebook has been run and rendered, its working copy, the LaTeX
//! intermediate and the nbconvert asset folder are deleted. Runs that were
//! interrupted leave these behind; [`find_orphans`] locates them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::paths::{assets_dir, is_temp_notebook, tex_path};

/// What cleanup removed and what it could not.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files and folders deleted.
    pub removed: Vec<PathBuf>,
    /// Paths that could not be deleted, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// Whether every deletion succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete the working copy `temp` and everything derived from it.
///
/// The working copy is always expected to exist; the `.tex` file and the
/// `_files` folder are only removed if present. Each failure is recorded and
/// the remaining deletions still happen.
pub fn remove_working_files(temp: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    record(&mut report, temp, fs::remove_file(temp));

    let tex = tex_path(temp);
    if tex.exists() {
        record(&mut report, &tex, fs::remove_file(&tex));
    }

    let assets = assets_dir(temp);
    if assets.exists() {
        record(&mut report, &assets, fs::remove_dir_all(&assets));
    }

    report
}

fn record(report: &mut CleanupReport, path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => {
            tracing::debug!("Deleted {}", path.display());
            report.removed.push(path.to_path_buf());
        }
        Err(e) => {
            tracing::warn!("Failed to delete {}: {}", path.display(), e);
            report.failures.push((path.to_path_buf(), e.to_string()));
        }
    }
}

/// Working copies left under the roots (and the scratch folder) by
/// interrupted runs.
pub fn find_orphans(config: &HarnessConfig) -> Vec<PathBuf> {
    let mut orphans = Vec::new();

    for dir in config.roots.iter().chain(config.scratch_dir.as_ref()) {
        for entry in WalkDir::new(dir).sort_by_file_name().into_iter().flatten() {
            let path = entry.path();
            if entry.file_type().is_file()
                && nbcheck_notebook::is_notebook_path(path)
                && is_temp_notebook(path, &config.temp_suffix)
            {
                orphans.push(path.to_path_buf());
            }
        }
    }

    orphans
}
