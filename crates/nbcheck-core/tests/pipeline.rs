//! Integration tests for the full harness pipeline.
//!
//! External programs are replaced by a fake toolchain that "executes"
//! working copies by writing outputs into them and "renders" them by
//! creating the requested output file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Value, json};
use tempfile::TempDir;

use nbcheck_core::{
    CommandOutput, CommandRunner, Completion, Driver, ExecutionMode, HarnessConfig, Invocation,
    NotebookDiscoverer, NotebookStatus, Preprocessor, RenderFormat, Result, RunLog, RunSummary,
};
use nbcheck_notebook::Notebook;

// =============================================================================
// Test Helpers
// =============================================================================

/// Stand-in for pytest/nbmake and nbconvert.
///
/// Notebooks whose file name contains `fail` raise an error when run; those
/// containing `warn` print a warning line.
#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<Invocation>>,
    broken_converter: bool,
}

impl FakeToolchain {
    fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }

    fn execute(&self, invocation: &Invocation) -> CommandOutput {
        let mut code = 0;
        let mut output = String::new();

        for arg in invocation.args.iter().filter(|a| a.ends_with(".ipynb")) {
            let path = Path::new(arg);
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let mut doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

            for cell in doc["cells"].as_array_mut().unwrap() {
                if cell["cell_type"] != "code" {
                    continue;
                }
                let mut outputs = vec![json!({"output_type": "stream", "name": "stdout", "text": "ran\n"})];
                if name.contains("warn") {
                    outputs.push(json!({
                        "output_type": "stream",
                        "name": "stderr",
                        "text": "UserWarning: data is noisy\n"
                    }));
                }
                cell["outputs"] = Value::Array(outputs);
            }

            if name.contains("fail") {
                let cells = doc["cells"].as_array_mut().unwrap();
                let last = cells.iter_mut().rev().find(|c| c["cell_type"] == "code").unwrap();
                last["outputs"]
                    .as_array_mut()
                    .unwrap()
                    .push(json!({"output_type": "error", "ename": "ValueError", "evalue": "boom", "traceback": []}));
                code = 1;
                output.push_str(&format!("FAILED {}\n", name));
            } else {
                output.push_str(&format!("PASSED {}\n", name));
            }

            fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        }

        CommandOutput {
            completion: Completion::Exited(code),
            output,
        }
    }

    fn convert(&self, invocation: &Invocation) -> CommandOutput {
        if self.broken_converter {
            return CommandOutput {
                completion: Completion::Exited(1),
                output: "nbconvert exploded".to_string(),
            };
        }
        let value_of = |flag: &str| {
            invocation
                .args
                .iter()
                .position(|a| a == flag)
                .map(|i| PathBuf::from(&invocation.args[i + 1]))
        };
        if let (Some(name), Some(dir)) = (value_of("--output"), value_of("--output-dir")) {
            fs::write(dir.join(name), "<html></html>").unwrap();
        }
        CommandOutput {
            completion: Completion::Exited(0),
            output: String::new(),
        }
    }
}

impl CommandRunner for FakeToolchain {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(match invocation.program.as_str() {
            "pytest" => self.execute(invocation),
            "jupyter" => self.convert(invocation),
            _ => CommandOutput {
                completion: Completion::Exited(0),
                output: String::new(),
            },
        })
    }
}

/// A notebook tree under `<tmp>/demos` plus a config pointing at it.
struct Workspace {
    _temp: TempDir,
    base: PathBuf,
    root: PathBuf,
    config: HarnessConfig,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let base = temp.path().to_path_buf();
        let root = base.join("demos");
        fs::create_dir_all(&root).unwrap();

        let config = HarnessConfig {
            roots: vec![root.clone()],
            output_dir: base.join("html_outputs"),
            log_dir: base.join("logs"),
            ..Default::default()
        };

        Self {
            _temp: temp,
            base,
            root,
            config,
        }
    }

    /// Write a notebook of code cells at `relative` under the root.
    fn notebook(&self, relative: &str, sources: &[&str]) -> PathBuf {
        let cells: Vec<Value> = sources
            .iter()
            .map(|s| json!({"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [], "source": s}))
            .collect();
        let doc = json!({"cells": cells, "metadata": {}, "nbformat": 4, "nbformat_minor": 5});
        self.file(relative, &serde_json::to_string_pretty(&doc).unwrap())
    }

    fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    async fn run(&self, tools: &FakeToolchain) -> (RunSummary, String) {
        let log = RunLog::open(self.base.join("logs/run.log")).unwrap();
        let summary = Driver::new(&self.config, tools, &log).run().await;
        let text = fs::read_to_string(log.path()).unwrap();
        (summary, text)
    }

    fn leftover_temps(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(&self.base)
            .into_iter()
            .flatten()
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.to_string_lossy().contains("_tmp"))
            .collect()
    }
}

// =============================================================================
// Preprocessing
// =============================================================================

#[test]
fn test_snippet_and_mount_rewrite() {
    let ws = Workspace::new();
    ws.file("snippets/foo.py", "print(1)");
    let source = ws.notebook(
        "lesson.ipynb",
        &["# %load snippets/foo.py\n...", "x = 5 # /mnt/materials/data.csv"],
    );
    let before = fs::read_to_string(&source).unwrap();

    let config = HarnessConfig {
        inject_warning_collector: false,
        ..ws.config.clone()
    };
    let discovery = NotebookDiscoverer::new(&config).discover();
    let paths = &discovery.notebooks[0];
    let report = Preprocessor::new(&config).preprocess(paths).unwrap();

    let working = Notebook::read_from_file(&paths.temp).unwrap();
    assert_eq!(working.cells.len(), 2);
    assert_eq!(working.cells[0].source_text(), "print(1)");
    assert_eq!(
        working.cells[1].source_text(),
        "x = 5 # /mnt/share/materials/data.csv"
    );
    assert!(report.blanked.is_empty());
    assert_eq!(fs::read_to_string(&source).unwrap(), before);
}

#[test]
fn test_discovery_is_repeatable() {
    let ws = Workspace::new();
    ws.notebook("b.ipynb", &["1"]);
    ws.notebook("a/z.ipynb", &["1"]);
    ws.notebook("a/y.ipynb", &["1"]);
    ws.notebook("c_tmp.ipynb", &["1"]);

    let first: Vec<_> = NotebookDiscoverer::new(&ws.config)
        .discover()
        .notebooks
        .into_iter()
        .map(|p| p.source)
        .collect();
    let second: Vec<_> = NotebookDiscoverer::new(&ws.config)
        .discover()
        .notebooks
        .into_iter()
        .map(|p| p.source)
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            ws.root.join("a/y.ipynb"),
            ws.root.join("a/z.ipynb"),
            ws.root.join("b.ipynb"),
        ]
    );
}

// =============================================================================
// Full Runs
// =============================================================================

#[tokio::test]
async fn test_passing_notebook() {
    let ws = Workspace::new();
    let source = ws.notebook("intro/fbp.ipynb", &["import numpy", "print('done')"]);
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&source), Some(NotebookStatus::Passed));
    assert!(summary.all_passed());
    assert!(ws.base.join("html_outputs/demos/intro/fbp.html").is_file());
    assert!(ws.leftover_temps().is_empty());

    assert!(log.contains(&format!("=== Processing notebook: {} ===", source.display())));
    assert!(log.contains("PASSED fbp_tmp.ipynb"));
    assert!(log.contains("Saved HTML to:"));
    assert!(log.contains("Deleted:"));
    assert!(log.contains("======== Notebook Test Summary ========="));
    assert!(log.contains(&format!("{}: passed", source.display())));

    let pytest = tools.calls_to("pytest");
    assert_eq!(pytest.len(), 1);
    assert_eq!(pytest[0].cwd.as_deref(), Some(source.parent().unwrap()));
}

#[tokio::test]
async fn test_skipped_notebook_is_never_touched() {
    let mut ws = Workspace::new();
    let kept = ws.notebook("kept.ipynb", &["1"]);
    let skipped = ws.notebook("skipped.ipynb", &["1"]);
    ws.config.skip = vec![skipped.clone()];
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].source, kept);
    assert_eq!(summary.status_of(&skipped), None);
    assert!(!log.contains("skipped"));

    for call in tools.calls.lock().unwrap().iter() {
        assert!(call.args.iter().all(|a| !a.contains("skipped")));
    }
}

#[tokio::test]
async fn test_failed_notebook_is_still_rendered_and_cleaned() {
    let ws = Workspace::new();
    let source = ws.notebook("will_fail.ipynb", &["x = 1", "raise ValueError('boom')"]);
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&source), Some(NotebookStatus::Failed));
    assert!(!summary.all_passed());
    assert!(ws.base.join("html_outputs/demos/will_fail.html").is_file());
    assert!(ws.leftover_temps().is_empty());

    assert_eq!(tools.calls_to("jupyter").len(), 1);
    assert!(log.contains("Result: failed (executor exited with status 1)"));
    assert!(log.contains(&format!("{}: failed", source.display())));
    assert!(log.contains("ValueError: boom"));
}

#[tokio::test]
async fn test_warnings_are_collected() {
    let ws = Workspace::new();
    let source = ws.notebook("warn.ipynb", &["import noisy"]);
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.reports[0].diagnostics, vec!["UserWarning: data is noisy"]);
    assert!(log.contains(&format!(
        "=== Warnings in {} ===",
        summary.reports[0].temp.display()
    )));

    let (_, warnings) = log.split_once("======== All Warnings Summary =========").unwrap();
    assert!(warnings.contains(&format!("{}:\n  UserWarning: data is noisy", source.display())));
}

#[tokio::test]
async fn test_missing_snippet_does_not_stop_the_run() {
    let ws = Workspace::new();
    let source = ws.notebook("lesson.ipynb", &["# %load snippets/missing.py\nprint(2)"]);
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&source), Some(NotebookStatus::Passed));
    assert!(log.contains("Snippet load failed"));
    assert!(log.contains("missing.py"));
}

#[tokio::test]
async fn test_unreadable_notebook_fails_alone() {
    let ws = Workspace::new();
    let broken = ws.file("a_broken.ipynb", "{ not json");
    let good = ws.notebook("b_good.ipynb", &["1"]);
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&broken), Some(NotebookStatus::Failed));
    assert_eq!(summary.status_of(&good), Some(NotebookStatus::Passed));
    assert!(log.contains("Preprocessing failed for"));
    assert_eq!(tools.calls_to("pytest").len(), 1);
    assert!(ws.leftover_temps().is_empty());
}

#[tokio::test]
async fn test_render_failure_keeps_status() {
    let ws = Workspace::new();
    let source = ws.notebook("fine.ipynb", &["1"]);
    let tools = FakeToolchain {
        broken_converter: true,
        ..Default::default()
    };

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&source), Some(NotebookStatus::Passed));
    assert_eq!(summary.reports[0].rendered, None);
    assert!(log.contains("Failed to convert"));
    assert!(ws.leftover_temps().is_empty());
}

#[tokio::test]
async fn test_batch_status_is_aggregate() {
    let mut ws = Workspace::new();
    ws.notebook("a.ipynb", &["1"]);
    ws.notebook("b_fail.ipynb", &["1"]);
    ws.config.execution_mode = ExecutionMode::Batch;
    ws.config.render_format = RenderFormat::None;
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    let pytest = tools.calls_to("pytest");
    assert_eq!(pytest.len(), 1);
    assert_eq!(pytest[0].args.iter().filter(|a| a.ends_with(".ipynb")).count(), 2);

    assert!(summary.batch);
    assert_eq!(summary.failed(), 2);
    assert!(log.contains("=== Testing batch of 2 notebook(s) ==="));
    assert!(tools.calls_to("jupyter").is_empty());
    assert!(ws.leftover_temps().is_empty());
}

#[tokio::test]
async fn test_scratch_dir_keeps_sources_clean() {
    let mut ws = Workspace::new();
    ws.notebook("sub/x.ipynb", &["1"]);
    ws.config.scratch_dir = Some(ws.base.join("scratch"));
    let tools = FakeToolchain::default();

    let (summary, _) = ws.run(&tools).await;

    assert_eq!(summary.reports[0].temp, ws.base.join("scratch/demos/sub/x_tmp.ipynb"));
    let pytest = tools.calls_to("pytest");
    assert!(pytest[0].args.iter().any(|a| a.ends_with("scratch/demos/sub/x_tmp.ipynb")));
    assert!(ws.leftover_temps().is_empty());
}

#[tokio::test]
async fn test_missing_root_still_runs_the_others() {
    let mut ws = Workspace::new();
    let source = ws.notebook("a.ipynb", &["1"]);
    let missing = ws.base.join("how-to");
    ws.config.roots.push(missing.clone());
    let tools = FakeToolchain::default();

    let (summary, log) = ws.run(&tools).await;

    assert_eq!(summary.status_of(&source), Some(NotebookStatus::Passed));
    assert!(log.contains(&format!("Could not search {}", missing.display())));
    assert!(log.contains("======== Notebook Test Summary ========="));
    assert!(log.contains(&format!("{}: passed", source.display())));
}
