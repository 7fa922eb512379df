//! Notebook execution through pytest + nbmake.
//!
//! The executor runs every cell under the configured kernel and, with
//! `--overwrite`, stores the outputs back into the working copy. Those
//! outputs are then mined for warning and error lines.

use std::path::{Path, PathBuf};

use nbcheck_notebook::Notebook;

use crate::command::{CommandRunner, Completion, Invocation};
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::preprocess::COLLECTOR_MARKER;

/// Substrings that mark a stream line as a diagnostic.
const DIAGNOSTIC_MARKERS: [&str; 2] = ["Warning", "Error"];

/// Outcome of one executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// How the executor ended; `None` if it could not be started.
    pub completion: Option<Completion>,
    /// Executor output, or the launch error.
    pub output: String,
}

impl RunOutcome {
    /// Whether every notebook in the invocation passed.
    pub fn passed(&self) -> bool {
        self.completion == Some(Completion::Exited(0))
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self.completion {
            Some(Completion::Exited(0)) => "passed".to_string(),
            Some(completion) => format!("failed (executor {})", completion),
            None => "failed (executor did not start)".to_string(),
        }
    }
}

/// Runs working copies through the notebook executor.
pub struct NotebookRunner<'a, R> {
    config: &'a HarnessConfig,
    commands: &'a R,
}

impl<'a, R: CommandRunner> NotebookRunner<'a, R> {
    /// Create a runner.
    pub fn new(config: &'a HarnessConfig, commands: &'a R) -> Self {
        Self { config, commands }
    }

    /// Build the executor invocation for `notebooks`.
    pub fn invocation(&self, notebooks: &[PathBuf], cwd: Option<&Path>) -> Invocation {
        let mut invocation = Invocation::new(&self.config.tools.pytest).args([
            "--nbmake".to_string(),
            format!("--nbmake-kernel={}", self.config.kernel),
            format!("--nbmake-timeout={}", self.config.timeout_secs),
            "--overwrite".to_string(),
        ]);
        if let Some(limit) = self.config.process_timeout(notebooks.len()) {
            invocation = invocation.timeout(limit);
        }

        if self.config.warnings_as_errors {
            invocation = invocation.args(["-W", "error"]);
            for category in &self.config.exempt_warnings {
                invocation = invocation.args(["-W".to_string(), format!("ignore::{}", category)]);
            }
        }

        for notebook in notebooks {
            let path = std::path::absolute(notebook).unwrap_or_else(|_| notebook.clone());
            invocation = invocation.arg(path.to_string_lossy());
        }

        if let Some(cwd) = cwd.or(self.config.work_dir.as_deref()) {
            invocation = invocation.cwd(cwd);
        }
        invocation
    }

    /// Execute `notebooks` in one executor process.
    ///
    /// With more than one notebook the outcome is the aggregate: it passes
    /// only if every notebook passed.
    pub async fn run(&self, notebooks: &[PathBuf], cwd: Option<&Path>) -> RunOutcome {
        let invocation = self.invocation(notebooks, cwd);
        tracing::info!("Testing {} notebook(s): {}", notebooks.len(), invocation.command_line());

        match self.commands.run(&invocation).await {
            Ok(output) => RunOutcome {
                completion: Some(output.completion),
                output: output.output,
            },
            Err(e) => {
                tracing::error!("{}", e.with_hint());
                RunOutcome {
                    completion: None,
                    output: e.to_string(),
                }
            }
        }
    }
}

/// Warning and error lines recorded in an executed notebook's outputs.
///
/// Stream lines containing `Warning` or `Error` are kept verbatim; error
/// outputs contribute `ename: evalue`. The warning-collector cell itself is
/// ignored.
pub fn mine_diagnostics(notebook: &Notebook) -> Vec<String> {
    let mut lines = Vec::new();

    for cell in notebook.code_cells() {
        if cell.source_text().contains(COLLECTOR_MARKER) {
            continue;
        }
        for output in cell.outputs() {
            if let Some(text) = output.stream_text() {
                lines.extend(
                    text.lines()
                        .filter(|l| DIAGNOSTIC_MARKERS.iter().any(|m| l.contains(m)))
                        .map(String::from),
                );
            }
            if let Some(summary) = output.error_summary() {
                lines.push(summary);
            }
        }
    }

    lines
}

/// Read an executed working copy and mine it.
pub fn collect_diagnostics(temp: &Path) -> Result<Vec<String>> {
    let notebook = Notebook::read_from_file(temp)?;
    Ok(mine_diagnostics(&notebook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbcheck_notebook::Cell;

    struct NeverRuns;

    impl CommandRunner for NeverRuns {
        async fn run(&self, _: &Invocation) -> Result<crate::command::CommandOutput> {
            Err(crate::error::Error::Spawn {
                program: "pytest".to_string(),
                message: "not found".to_string(),
            })
        }
    }

    #[test]
    fn test_invocation_arguments() {
        let config = HarnessConfig {
            kernel: "cil_test_demos".to_string(),
            ..Default::default()
        };
        let runner = NotebookRunner::new(&config, &NeverRuns);
        let invocation = runner.invocation(&[PathBuf::from("/nb/a_tmp.ipynb")], Some(Path::new("/nb")));

        assert_eq!(invocation.program, "pytest");
        assert_eq!(
            invocation.args,
            vec![
                "--nbmake",
                "--nbmake-kernel=cil_test_demos",
                "--nbmake-timeout=900",
                "--overwrite",
                "-W",
                "error",
                "-W",
                "ignore::ResourceWarning",
                "/nb/a_tmp.ipynb",
            ]
        );
        assert_eq!(invocation.cwd, Some(PathBuf::from("/nb")));
        assert_eq!(invocation.timeout, config.process_timeout(1));
    }

    #[test]
    fn test_invocation_without_strict_warnings() {
        let config = HarnessConfig {
            warnings_as_errors: false,
            work_dir: Some(PathBuf::from("/demos")),
            ..Default::default()
        };
        let runner = NotebookRunner::new(&config, &NeverRuns);
        let notebooks = [PathBuf::from("/x/a_tmp.ipynb"), PathBuf::from("/x/b_tmp.ipynb")];
        let invocation = runner.invocation(&notebooks, None);

        assert!(!invocation.args.iter().any(|a| a == "-W"));
        assert_eq!(&invocation.args[4..], ["/x/a_tmp.ipynb", "/x/b_tmp.ipynb"]);
        assert_eq!(invocation.cwd, Some(PathBuf::from("/demos")));
        assert_eq!(invocation.timeout, config.process_timeout(2));
    }

    #[test]
    fn test_huge_timeout_leaves_process_unguarded() {
        let config = HarnessConfig {
            timeout_secs: u64::MAX,
            ..Default::default()
        };
        let runner = NotebookRunner::new(&config, &NeverRuns);
        let notebooks = [PathBuf::from("/x/a_tmp.ipynb"), PathBuf::from("/x/b_tmp.ipynb")];
        let invocation = runner.invocation(&notebooks, None);

        assert_eq!(invocation.timeout, None);
        assert!(invocation.args.contains(&format!("--nbmake-timeout={}", u64::MAX)));
    }

    #[tokio::test]
    async fn test_launch_failure_is_a_failed_run() {
        let config = HarnessConfig::default();
        let outcome = NotebookRunner::new(&config, &NeverRuns)
            .run(&[PathBuf::from("/x/a_tmp.ipynb")], None)
            .await;

        assert!(!outcome.passed());
        assert_eq!(outcome.completion, None);
        assert!(outcome.output.contains("not found"));
        assert_eq!(outcome.describe(), "failed (executor did not start)");
    }

    #[test]
    fn test_mine_diagnostics() {
        let json = serde_json::json!({
            "cells": [
                {
                    "cell_type": "code", "metadata": {}, "execution_count": 1,
                    "source": "import warnings\nnotebook_warnings = []",
                    "outputs": [{"output_type": "stream", "name": "stdout", "text": "UserWarning: from collector\n"}]
                },
                {
                    "cell_type": "code", "metadata": {}, "execution_count": 2,
                    "source": "run()",
                    "outputs": [
                        {"output_type": "stream", "name": "stdout", "text": ["iteration 1\n", "DeprecationWarning: use new API (File x.py, line 3)\n"]},
                        {"output_type": "stream", "name": "stderr", "text": "RuntimeError: bad\nplain line\n"},
                        {"output_type": "error", "ename": "ValueError", "evalue": "shape mismatch", "traceback": []}
                    ]
                },
                {"cell_type": "markdown", "metadata": {}, "source": "Warning: not code"}
            ],
            "metadata": {}, "nbformat": 4, "nbformat_minor": 5
        });
        let notebook: Notebook = serde_json::from_value(json).unwrap();

        assert_eq!(
            mine_diagnostics(&notebook),
            vec![
                "DeprecationWarning: use new API (File x.py, line 3)",
                "RuntimeError: bad",
                "ValueError: shape mismatch",
            ]
        );
    }

    #[test]
    fn test_mine_clean_notebook() {
        let mut notebook = Notebook::new();
        notebook.cells.push(Cell::code("x = 1"));
        assert!(mine_diagnostics(&notebook).is_empty());
    }
}
