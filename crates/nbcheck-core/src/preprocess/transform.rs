//! Text transforms applied to code-cell sources.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::PathMapping;

use super::directive::{LoadDirective, parse_load_directive};

/// Marks instructor scaffolding the student is expected to complete.
pub const PLACEHOLDER: &str = "...";

/// Name of the folder holding snippet files, next to each notebook.
pub const SNIPPETS_DIR: &str = "snippets";

/// Replace every occurrence of each mapping's prefix, mapping by mapping.
///
/// Mappings are independent: each one sees the output of the previous one.
/// This is literal substitution; nothing is normalised.
pub fn rewrite_paths<'a>(source: &'a str, mappings: &[PathMapping]) -> Cow<'a, str> {
    let mut text = Cow::Borrowed(source);
    for mapping in mappings {
        if text.contains(mapping.from.as_str()) {
            text = Cow::Owned(text.replace(mapping.from.as_str(), &mapping.to));
        }
    }
    text
}

/// Whether the source contains the placeholder token anywhere.
pub fn has_placeholder(source: &str) -> bool {
    source.contains(PLACEHOLDER)
}

/// What the snippet resolver did with a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No directive in the cell.
    Unchanged,
    /// The cell source becomes the snippet's text.
    Replaced { path: PathBuf, text: String },
    /// The directive names a snippet that does not exist.
    Missing(PathBuf),
    /// The snippet exists but could not be read.
    Unreadable { path: PathBuf, message: String },
    /// The directive does not follow the grammar.
    Malformed(String),
}

/// Substitutes load-directive cells with the snippet they reference.
pub struct SnippetResolver {
    snippets_dir: PathBuf,
}

impl SnippetResolver {
    /// Resolver for a notebook stored in `notebook_dir`.
    pub fn new(notebook_dir: &Path) -> Self {
        Self {
            snippets_dir: notebook_dir.join(SNIPPETS_DIR),
        }
    }

    /// The folder snippets are read from.
    pub fn snippets_dir(&self) -> &Path {
        &self.snippets_dir
    }

    /// Resolve the directive in `source`, if any.
    pub fn resolve(&self, source: &str) -> Resolution {
        match parse_load_directive(source) {
            LoadDirective::Absent => Resolution::Unchanged,
            LoadDirective::Malformed(reason) => Resolution::Malformed(reason),
            LoadDirective::Found(file) => {
                let path = self.snippets_dir.join(file);
                match fs::read_to_string(&path) {
                    Ok(text) => Resolution::Replaced { path, text },
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Resolution::Missing(path),
                    Err(e) => Resolution::Unreadable {
                        path,
                        message: e.to_string(),
                    },
                }
            }
        }
    }
}
