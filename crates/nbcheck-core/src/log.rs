//! The dated run log.
//!
//! A plain-text file that every stage appends to, in visitation order. It is
//! the record an operator (or CI job) reads after the run. Console output goes
//! through `tracing` separately.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Append-only log file for one harness run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Open (creating if needed) the log at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::at(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::at(&path, e))?;
        Ok(Self { path, file })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append raw text.
    ///
    /// A failed write is reported on the console; the run carries on.
    pub fn append(&self, text: &str) {
        if let Err(e) = (&self.file).write_all(text.as_bytes()) {
            tracing::error!("Failed to write to {}: {}", self.path.display(), e);
        }
    }

    /// Append one line.
    pub fn line(&self, line: impl AsRef<str>) {
        let mut text = line.as_ref().to_string();
        text.push('\n');
        self.append(&text);
    }

    /// Append a `=== title ===` header preceded by a blank line.
    pub fn section(&self, title: impl AsRef<str>) {
        self.append(&format!("\n=== {} ===\n", title.as_ref()));
    }

    /// Append captured program output, making sure it ends with a newline.
    pub fn output(&self, output: &str) {
        if output.is_empty() {
            return;
        }
        self.append(output);
        if !output.ends_with('\n') {
            self.append("\n");
        }
    }
}
