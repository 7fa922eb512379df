//! Jupyter notebook (.ipynb) documents.
//!
//! Only the parts of the v4 format that nbcheck touches are typed. Everything
//! else (cell ids, metadata, execution counts, attachments) is carried through
//! untouched so that a rewritten copy differs from its original only where the
//! harness changed a cell's source.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NotebookError, NotebookResult};
use crate::outputs::Output;

/// The only major format version nbcheck understands.
pub const SUPPORTED_NBFORMAT: u32 = 4;

/// A Jupyter notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Notebook cells, in document order
    pub cells: Vec<Cell>,

    /// Notebook metadata (kernelspec, language_info, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Format version (always 4)
    pub nbformat: u32,

    /// Minor format version
    pub nbformat_minor: u32,
}

/// Cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable code
    Code,
    /// Markdown narrative
    Markdown,
    /// Raw passthrough text
    Raw,
}

/// A notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell type
    pub cell_type: CellType,

    /// Cell source
    #[serde(default)]
    pub source: MultilineString,

    /// Outputs recorded by the last execution (code cells only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,

    /// Fields nbcheck does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text stored either as one string or as a list of lines.
///
/// Both spellings are valid nbformat; the one found on disk is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineString {
    /// Lines, each keeping its trailing newline
    Lines(Vec<String>),
    /// A single string
    Text(String),
}

impl MultilineString {
    /// Build from text, split into newline-terminated lines.
    pub fn from_text(text: &str) -> Self {
        Self::Lines(text.split_inclusive('\n').map(String::from).collect())
    }

    /// The full text.
    pub fn text(&self) -> String {
        match self {
            Self::Lines(lines) => lines.concat(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Whether the text is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Lines(lines) => lines.iter().all(String::is_empty),
            Self::Text(text) => text.is_empty(),
        }
    }
}

impl Default for MultilineString {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

impl Cell {
    /// Create an empty-output code cell.
    pub fn code(source: &str) -> Self {
        let mut extra = Map::new();
        extra.insert("execution_count".to_string(), Value::Null);
        extra.insert("metadata".to_string(), Value::Object(Map::new()));

        Self {
            cell_type: CellType::Code,
            source: MultilineString::from_text(source),
            outputs: Some(Vec::new()),
            extra,
        }
    }

    /// Whether this is an executable cell.
    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// The cell's source text.
    pub fn source_text(&self) -> String {
        self.source.text()
    }

    /// Replace the cell's source text.
    pub fn set_source(&mut self, text: &str) {
        self.source = MultilineString::from_text(text);
    }

    /// The cell id, when the notebook format carries one.
    pub fn id(&self) -> Option<&str> {
        self.extra.get("id").and_then(Value::as_str)
    }

    /// Recorded outputs, empty when the cell never ran.
    pub fn outputs(&self) -> &[Output] {
        self.outputs.as_deref().unwrap_or_default()
    }
}

impl Notebook {
    /// Create a new empty notebook.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: SUPPORTED_NBFORMAT,
            nbformat_minor: 5,
        }
    }

    /// Parse a notebook from JSON text.
    pub fn from_json(json: &str) -> NotebookResult<Self> {
        let notebook: Self = serde_json::from_str(json)?;
        if notebook.nbformat != SUPPORTED_NBFORMAT {
            return Err(NotebookError::InvalidNotebook(format!(
                "nbformat {} is not supported (expected {})",
                notebook.nbformat, SUPPORTED_NBFORMAT
            )));
        }
        Ok(notebook)
    }

    /// Serialize the notebook to JSON text.
    pub fn to_json(&self) -> NotebookResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Read a notebook from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> NotebookResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| NotebookError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Write the notebook to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> NotebookResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| NotebookError::WriteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!("Wrote {} ({} cells)", path.display(), self.cells.len());
        Ok(())
    }

    /// Insert a code cell before every existing cell.
    ///
    /// `id` is only recorded when the minor format version has cell ids (4.5+).
    pub fn prepend_code_cell(&mut self, id: &str, source: &str) {
        let mut cell = Cell::code(source);
        if self.nbformat_minor >= 5 {
            cell.extra
                .insert("id".to_string(), Value::String(id.to_string()));
        }
        self.cells.insert(0, cell);
    }

    /// Iterate over executable cells.
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}
