//! Jupyter notebook documents for nbcheck.
//!
//! Reads `.ipynb` files into an ordered list of typed cells, lets the caller
//! rewrite cell sources, and writes the result back out.
//!
//! # Architecture
//!
//! ```text
//! notebook.ipynb ─────► Notebook::read_from_file ─────► cells (mutable source)
//!                                                            │
//!                                                            ▼
//! notebook_tmp.ipynb ◄──── Notebook::write_to_file ◄──── rewritten cells
//! ```

mod document;
mod error;
mod outputs;

pub use document::{Cell, CellType, MultilineString, Notebook, SUPPORTED_NBFORMAT};
pub use error::{NotebookError, NotebookResult};
pub use outputs::Output;

use std::path::Path;

/// File extension of notebook documents (without the dot).
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Whether a path names a notebook document.
pub fn is_notebook_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext == NOTEBOOK_EXTENSION)
}
