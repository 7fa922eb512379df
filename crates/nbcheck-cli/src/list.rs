//! List command: show what a run would process.

use std::path::PathBuf;

use nbcheck_core::{Exclusion, NotebookDiscoverer};

use crate::colors;
use crate::settings::Settings;

/// Print discovered and excluded notebooks.
pub fn execute(settings: &Settings, roots: &[PathBuf]) -> anyhow::Result<()> {
    let config = settings.load(roots)?;
    config.validate()?;

    let discovery = NotebookDiscoverer::new(&config).discover();

    for paths in &discovery.notebooks {
        println!("{}", paths.source.display());
    }
    for (path, reason) in &discovery.excluded {
        let why = match reason {
            Exclusion::Skipped => "skipped",
            Exclusion::Temporary => "working copy",
        };
        println!("{}{} ({}){}", colors::DIM, path.display(), why, colors::RESET);
    }

    for (path, message) in &discovery.problems {
        println!(
            "{}Cannot search {}: {}{}",
            colors::YELLOW,
            path.display(),
            message,
            colors::RESET
        );
    }

    println!(
        "\n{}{} notebook(s){}, {} excluded",
        colors::BOLD,
        discovery.notebooks.len(),
        colors::RESET,
        discovery.excluded.len()
    );
    Ok(())
}
