//! Load-directive parsing.
//!
//! Tutorial notebooks ship exercise cells whose solution is pulled in with an
//! IPython magic left commented out:
//!
//! ```text
//! # %load './snippets/01_solution.py'
//! ```
//!
//! Grammar, matched against one line of the cell:
//!
//! ```text
//! directive := ws* "#" ws* "%load" ws+ quote? prefix? "snippets/" file quote? ws*
//! quote     := "'" | '"'
//! prefix    := any run of non-space, non-quote characters ending in "/"
//! file      := one or more non-space, non-quote characters
//! ```
//!
//! The file is always looked up in the `snippets` folder next to the
//! notebook, whatever the prefix says.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Any `# %load` comment, well-formed or not.
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[ \t]*%load\b").expect("valid marker regex"));

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*#[ \t]*%load[ \t]+['"]?(?:[^'"\s]*/)?snippets/(?P<file>[^'"\s]+)['"]?[ \t]*$"#,
    )
    .expect("valid directive regex")
});

/// Result of looking for a load-directive in a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDirective {
    /// The cell has no `# %load` comment.
    Absent,
    /// A well-formed directive naming a file inside `snippets/`.
    Found(PathBuf),
    /// A `# %load` comment that does not follow the grammar.
    Malformed(String),
}

/// Look for a load-directive in `source`.
pub fn parse_load_directive(source: &str) -> LoadDirective {
    if !MARKER.is_match(source) {
        return LoadDirective::Absent;
    }

    match DIRECTIVE.captures(source) {
        Some(caps) => LoadDirective::Found(PathBuf::from(&caps["file"])),
        None => {
            let line = source
                .lines()
                .find(|l| MARKER.is_match(l))
                .unwrap_or_default()
                .trim();
            LoadDirective::Malformed(format!("unrecognised load directive `{}`", line))
        }
    }
}
