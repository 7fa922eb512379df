//! The harness pipeline.
//!
//! ```text
//! Discover ──► for each notebook: Preprocess ──► Run ──► Render ──► Cleanup ──► Summarize
//! ```
//!
//! Nothing that goes wrong with one notebook stops the others: preprocessing
//! errors, executor failures, rendering failures and cleanup failures all end
//! up in the run log and the summary.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cleanup::remove_working_files;
use crate::command::CommandRunner;
use crate::config::{ExecutionMode, HarnessConfig};
use crate::discover::{Exclusion, NotebookDiscoverer};
use crate::log::RunLog;
use crate::paths::NotebookPaths;
use crate::preprocess::{PreprocessReport, Preprocessor};
use crate::render::Renderer;
use crate::runner::{NotebookRunner, RunOutcome, collect_diagnostics};

/// Final status of one notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookStatus {
    /// The executor ran every cell without error.
    Passed,
    /// Preprocessing failed, the executor failed, or it timed out.
    Failed,
}

impl fmt::Display for NotebookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Everything recorded about one notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookReport {
    /// The original notebook.
    pub source: PathBuf,
    /// Its working copy.
    pub temp: PathBuf,
    /// Pass/fail.
    pub status: NotebookStatus,
    /// Warning and error lines mined from the executed copy.
    pub diagnostics: Vec<String>,
    /// Rendered review copy, if rendering succeeded.
    pub rendered: Option<PathBuf>,
}

/// Result of a whole harness run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per processed notebook, in visitation order.
    pub reports: Vec<NotebookReport>,
    /// Whether statuses come from a single batch invocation.
    pub batch: bool,
}

impl RunSummary {
    /// Number of passing notebooks.
    pub fn passed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == NotebookStatus::Passed)
            .count()
    }

    /// Number of failing notebooks.
    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    /// Whether no notebook failed.
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Status of `source`, if it was processed.
    pub fn status_of(&self, source: &Path) -> Option<NotebookStatus> {
        self.reports
            .iter()
            .find(|r| r.source == source)
            .map(|r| r.status)
    }

    /// Append the summary sections to the run log.
    pub fn write_to(&self, log: &RunLog) {
        log.append("\n======== Notebook Test Summary =========\n");
        if self.batch {
            log.line("(statuses are the aggregate result of one batch run)");
        }
        for report in &self.reports {
            log.line(format!("{}: {}", report.source.display(), report.status));
        }

        log.append("\n======== All Warnings Summary =========\n");
        for report in self.reports.iter().filter(|r| !r.diagnostics.is_empty()) {
            log.append(&format!("\n{}:\n", report.source.display()));
            for line in &report.diagnostics {
                log.line(format!("  {}", line));
            }
        }

        log.append(&format!(
            "\n{} passed, {} failed\n",
            self.passed(),
            self.failed()
        ));
    }
}

/// Runs the full pipeline over the configured roots.
pub struct Driver<'a, R> {
    config: &'a HarnessConfig,
    commands: &'a R,
    log: &'a RunLog,
}

impl<'a, R: CommandRunner> Driver<'a, R> {
    /// Create a driver.
    pub fn new(config: &'a HarnessConfig, commands: &'a R, log: &'a RunLog) -> Self {
        Self {
            config,
            commands,
            log,
        }
    }

    /// Discover, process every notebook, and write the summary.
    ///
    /// Folders that cannot be searched and per-notebook problems end up in
    /// the run log; the summary is always written.
    pub async fn run(&self) -> RunSummary {
        let discovery = NotebookDiscoverer::new(self.config).discover();
        for (path, message) in &discovery.problems {
            self.log
                .line(format!("Could not search {}: {}", path.display(), message));
        }
        for (path, reason) in &discovery.excluded {
            if *reason == Exclusion::Skipped {
                tracing::info!("Skipping notebook: {}", path.display());
            }
        }
        tracing::info!("Found {} notebook(s)", discovery.notebooks.len());

        let summary = self.run_notebooks(&discovery.notebooks).await;
        summary.write_to(self.log);
        summary
    }

    /// Process already-discovered notebooks in the configured mode.
    pub async fn run_notebooks(&self, notebooks: &[NotebookPaths]) -> RunSummary {
        match self.config.execution_mode {
            ExecutionMode::PerNotebook => {
                let mut reports = Vec::with_capacity(notebooks.len());
                for paths in notebooks {
                    reports.push(self.process_one(paths).await);
                }
                RunSummary {
                    reports,
                    batch: false,
                }
            }
            ExecutionMode::Batch => RunSummary {
                reports: self.process_batch(notebooks).await,
                batch: true,
            },
        }
    }

    async fn process_one(&self, paths: &NotebookPaths) -> NotebookReport {
        self.log
            .section(format!("Processing notebook: {}", paths.source.display()));
        tracing::info!("Processing notebook: {}", paths.source.display());

        if !self.preprocess(paths) {
            return self.failed_before_run(paths);
        }

        self.log
            .line(format!("Testing notebook: {}", paths.temp.display()));
        let cwd = self
            .config
            .work_dir
            .clone()
            .unwrap_or_else(|| paths.source_dir().to_path_buf());
        let outcome = NotebookRunner::new(self.config, self.commands)
            .run(std::slice::from_ref(&paths.temp), Some(cwd.as_path()))
            .await;
        self.record_outcome(&outcome);

        self.finish(paths, status_from(&outcome)).await
    }

    async fn process_batch(&self, notebooks: &[NotebookPaths]) -> Vec<NotebookReport> {
        let mut reports = Vec::new();
        let mut ready = Vec::new();

        for paths in notebooks {
            self.log
                .section(format!("Processing notebook: {}", paths.source.display()));
            if self.preprocess(paths) {
                ready.push(paths);
            } else {
                reports.push(self.failed_before_run(paths));
            }
        }

        if ready.is_empty() {
            return reports;
        }

        let temps: Vec<PathBuf> = ready.iter().map(|p| p.temp.clone()).collect();
        self.log
            .section(format!("Testing batch of {} notebook(s)", temps.len()));
        for temp in &temps {
            self.log.line(format!("Testing notebook: {}", temp.display()));
        }

        let outcome = NotebookRunner::new(self.config, self.commands)
            .run(&temps, None)
            .await;
        self.record_outcome(&outcome);

        let status = status_from(&outcome);
        for paths in ready {
            reports.push(self.finish(paths, status).await);
        }
        reports
    }

    /// Write the working copy. Returns whether it is ready to run.
    fn preprocess(&self, paths: &NotebookPaths) -> bool {
        match Preprocessor::new(self.config).preprocess(paths) {
            Ok(report) => {
                self.record_preprocess(paths, &report);
                true
            }
            Err(e) => {
                tracing::error!("Preprocessing {} failed: {}", paths.source.display(), e);
                self.log.line(format!(
                    "Preprocessing failed for {}: {}",
                    paths.source.display(),
                    e
                ));
                false
            }
        }
    }

    fn record_preprocess(&self, paths: &NotebookPaths, report: &PreprocessReport) {
        for (cell, problem) in &report.snippet_problems {
            self.log.line(format!(
                "Snippet load failed for {} (cell {}): {}",
                paths.source.display(),
                cell,
                problem
            ));
        }
        if !report.blanked.is_empty() {
            self.log.line(format!(
                "Blanked {} placeholder cell(s) in {}",
                report.blanked.len(),
                paths.temp.display()
            ));
        }
    }

    fn record_outcome(&self, outcome: &RunOutcome) {
        self.log.output(&outcome.output);
        self.log.line(format!("Result: {}", outcome.describe()));
    }

    /// Mine diagnostics, render and clean up after a run, whatever its status.
    async fn finish(&self, paths: &NotebookPaths, status: NotebookStatus) -> NotebookReport {
        let diagnostics = match collect_diagnostics(&paths.temp) {
            Ok(lines) => lines,
            Err(e) => {
                self.log.line(format!(
                    "Could not read executed notebook {}: {}",
                    paths.temp.display(),
                    e
                ));
                Vec::new()
            }
        };
        if !diagnostics.is_empty() {
            self.log
                .section(format!("Warnings in {}", paths.temp.display()));
            for line in &diagnostics {
                self.log.line(line);
            }
        }

        let rendered = match Renderer::new(self.config, self.commands).render(paths).await {
            Ok(Some(path)) => {
                self.log.line(format!(
                    "Saved {} to: {}",
                    self.config.render_format,
                    path.display()
                ));
                Some(path)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Rendering {} failed: {}", paths.temp.display(), e);
                self.log.line(format!(
                    "Failed to convert {} to {}: {}",
                    paths.temp.display(),
                    self.config.render_format,
                    e
                ));
                None
            }
        };

        self.cleanup(&paths.temp);

        if status == NotebookStatus::Failed {
            tracing::warn!("{}: failed", paths.source.display());
        } else {
            tracing::info!("{}: passed", paths.source.display());
        }

        NotebookReport {
            source: paths.source.clone(),
            temp: paths.temp.clone(),
            status,
            diagnostics,
            rendered,
        }
    }

    fn failed_before_run(&self, paths: &NotebookPaths) -> NotebookReport {
        if paths.temp.exists() {
            self.cleanup(&paths.temp);
        }
        NotebookReport {
            source: paths.source.clone(),
            temp: paths.temp.clone(),
            status: NotebookStatus::Failed,
            diagnostics: Vec::new(),
            rendered: None,
        }
    }

    fn cleanup(&self, temp: &Path) {
        let report = remove_working_files(temp);
        for path in &report.removed {
            self.log.line(format!("Deleted: {}", path.display()));
        }
        for (path, message) in &report.failures {
            self.log
                .line(format!("Failed to delete {}: {}", path.display(), message));
        }
    }
}

fn status_from(outcome: &RunOutcome) -> NotebookStatus {
    if outcome.passed() {
        NotebookStatus::Passed
    } else {
        NotebookStatus::Failed
    }
}
