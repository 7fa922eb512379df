//! Cell output records.
//!
//! Outputs are written by the kernel during execution. nbcheck never authors
//! them; it reads them back to collect diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::MultilineString;

/// Cell output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type")]
pub enum Output {
    /// Standard output/error
    #[serde(rename = "stream")]
    Stream { name: String, text: MultilineString },

    /// Rich result of the cell's last expression
    #[serde(rename = "execute_result")]
    ExecuteResult {
        execution_count: Option<u32>,
        data: Map<String, Value>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },

    /// Display data
    #[serde(rename = "display_data")]
    DisplayData {
        data: Map<String, Value>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },

    /// Error output
    #[serde(rename = "error")]
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl Output {
    /// Text written to stdout/stderr, if this is a stream output.
    pub fn stream_text(&self) -> Option<String> {
        match self {
            Self::Stream { text, .. } => Some(text.text()),
            _ => None,
        }
    }

    /// `ename: evalue`, if this is an error output.
    pub fn error_summary(&self) -> Option<String> {
        match self {
            Self::Error { ename, evalue, .. } => Some(format!("{}: {}", ename, evalue)),
            _ => None,
        }
    }
}
