//! Run command implementation for nbcheck CLI.
//!
//! Executes every discovered notebook, renders it, and writes the dated run
//! log with its summary.

use std::path::PathBuf;
use std::time::Instant;

use nbcheck_core::{Driver, NotebookStatus, RunLog, RunSummary, SystemCommandRunner};

use crate::colors;
use crate::settings::Settings;

/// Run the harness over `roots`.
pub async fn execute(settings: &Settings, roots: &[PathBuf], strict: bool) -> anyhow::Result<()> {
    let config = settings.load(roots)?;
    config.validate()?;
    let strict = strict || config.strict;

    let start = Instant::now();
    let log = RunLog::open(config.log_path(chrono::Local::now().naive_local()))?;

    println!(
        "{}Testing notebooks{} under {} root(s)",
        colors::BOLD,
        colors::RESET,
        config.roots.len()
    );
    println!("{}Log: {}{}", colors::DIM, log.path().display(), colors::RESET);

    let summary = Driver::new(&config, &SystemCommandRunner, &log).run().await;

    print_summary(&summary);
    println!(
        "{}Finished in {:.1}s. Full log: {}{}",
        colors::DIM,
        start.elapsed().as_secs_f64(),
        log.path().display(),
        colors::RESET
    );

    if strict && !summary.all_passed() {
        anyhow::bail!("{} notebook(s) failed", summary.failed());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}Summary:{}", colors::BOLD, colors::RESET);
    println!("{}", "─".repeat(50));

    if summary.reports.is_empty() {
        println!("{}No notebooks found.{}", colors::YELLOW, colors::RESET);
        return;
    }

    for report in &summary.reports {
        let (mark, color) = match report.status {
            NotebookStatus::Passed => ("✓", colors::GREEN),
            NotebookStatus::Failed => ("✗", colors::RED),
        };
        print!(
            "{}{} {}{} {}",
            color,
            mark,
            report.status,
            colors::RESET,
            report.source.display()
        );
        if report.diagnostics.is_empty() {
            println!();
        } else {
            println!(
                " {}({} warning line(s)){}",
                colors::YELLOW,
                report.diagnostics.len(),
                colors::RESET
            );
        }
    }

    println!("{}", "─".repeat(50));
    let color = if summary.all_passed() {
        colors::GREEN
    } else {
        colors::RED
    };
    println!(
        "{}{} passed, {} failed{}",
        color,
        summary.passed(),
        summary.failed(),
        colors::RESET
    );
    if summary.batch {
        println!(
            "{}Batch mode: statuses are the aggregate of one executor run{}",
            colors::DIM,
            colors::RESET
        );
    }
}
