//! Error types for nbcheck-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for nbcheck-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nbcheck-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading, parsing or writing a notebook failed.
    #[error(transparent)]
    Notebook(#[from] nbcheck_notebook::NotebookError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// External program could not be started.
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    /// External program ran but did not succeed.
    #[error("{program} {completion}")]
    CommandFailed { program: String, completion: String },

    /// IO error on a specific path.
    #[error("IO error at {path}: {message}")]
    Path { path: PathBuf, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a path-carrying IO error.
    pub fn at(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Path {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Format the error together with a recovery hint, when one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::Spawn { program, .. } => Some(format!(
                "is `{}` installed and on PATH? Run `nbcheck tools` to check",
                program
            )),
            Self::Config(_) => Some("check the config file and command-line flags".to_string()),
            Self::Notebook(nbcheck_notebook::NotebookError::InvalidNotebook(_)) => {
                Some("upgrade the notebook with `jupyter nbconvert --to notebook`".to_string())
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
