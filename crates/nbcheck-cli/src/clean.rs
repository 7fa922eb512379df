//! Clean command: remove working copies from interrupted runs.

use std::path::PathBuf;

use nbcheck_core::{find_orphans, remove_working_files};

use crate::colors;
use crate::settings::Settings;

/// Delete (or with `dry_run`, list) leftover working copies.
pub fn execute(settings: &Settings, roots: &[PathBuf], dry_run: bool) -> anyhow::Result<()> {
    let config = settings.load(roots)?;
    config.validate()?;

    let orphans = find_orphans(&config);
    if orphans.is_empty() {
        println!("Nothing to clean.");
        return Ok(());
    }

    let mut failures = 0;
    for temp in &orphans {
        if dry_run {
            println!("Would delete: {}", temp.display());
            continue;
        }
        let report = remove_working_files(temp);
        for path in &report.removed {
            println!("Deleted: {}", path.display());
        }
        for (path, message) in &report.failures {
            failures += 1;
            println!(
                "{}Failed to delete {}: {}{}",
                colors::RED,
                path.display(),
                message,
                colors::RESET
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{} path(s) could not be deleted", failures);
    }
    Ok(())
}
