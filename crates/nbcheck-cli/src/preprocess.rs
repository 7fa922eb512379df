//! Preprocess command: write one working copy for inspection.

use std::path::Path;

use nbcheck_core::{NotebookPaths, Preprocessor};

use crate::colors;
use crate::settings::Settings;

/// Preprocess `notebook`, writing to `output` or the usual working-copy path.
pub fn execute(settings: &Settings, notebook: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let config = settings.load(&[])?;

    if !notebook.is_file() {
        anyhow::bail!("Notebook not found: {}", notebook.display());
    }

    let root = notebook.parent().unwrap_or(Path::new("."));
    let mut paths = NotebookPaths::new(notebook, root, &config);
    if let Some(output) = output {
        if is_same_file(notebook, output) {
            anyhow::bail!(
                "Refusing to overwrite the source notebook {}; choose another --output",
                notebook.display()
            );
        }
        paths.temp = output.to_path_buf();
    }

    let report = Preprocessor::new(&config).preprocess(&paths)?;

    println!(
        "{}Wrote{} {} ({} cells)",
        colors::GREEN,
        colors::RESET,
        paths.temp.display(),
        report.cells
    );
    if !report.rewritten.is_empty() {
        println!("  paths rewritten in {} cell(s)", report.rewritten.len());
    }
    for snippet in &report.snippets {
        println!("  loaded {}", snippet.display());
    }
    if !report.blanked.is_empty() {
        println!("  blanked {} placeholder cell(s)", report.blanked.len());
    }
    for (cell, problem) in &report.snippet_problems {
        println!("  {}cell {}: {}{}", colors::YELLOW, cell, problem, colors::RESET);
    }
    if report.collector_injected {
        println!("  {}warning collector prepended{}", colors::DIM, colors::RESET);
    }

    Ok(())
}

/// Whether `output` names the existing file `source`, through any spelling.
fn is_same_file(source: &Path, output: &Path) -> bool {
    match (std::fs::canonicalize(source), std::fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => source == output,
    }
}
