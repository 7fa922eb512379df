//! Paths derived from a source notebook.
//!
//! Every file the harness creates for a notebook is a pure function of the
//! notebook's path, its discovery root and the configuration:
//!
//! ```text
//! demos/1_Intro/fbp.ipynb                 source (never modified)
//! demos/1_Intro/fbp_tmp.ipynb             working copy (or under scratch_dir)
//! demos/1_Intro/fbp_tmp.tex               LaTeX intermediate (PDF rendering)
//! demos/1_Intro/fbp_tmp_files/            nbconvert assets
//! html_outputs/demos/1_Intro/fbp.html     rendered review copy
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{HarnessConfig, RenderFormat};

/// Working-copy path for `source`: `<stem><suffix>.<ext>` in the same folder.
pub fn temp_notebook_path(source: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(source.file_stem().unwrap_or_default());
    name.push(suffix);
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext);
    }
    source.with_file_name(name)
}

/// Whether `path` already names a working copy.
pub fn is_temp_notebook(path: &Path, suffix: &str) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(suffix))
}

/// LaTeX intermediate for a working copy.
pub fn tex_path(temp: &Path) -> PathBuf {
    temp.with_extension("tex")
}

/// nbconvert asset folder (`<stem>_files`) for a working copy.
pub fn assets_dir(temp: &Path) -> PathBuf {
    let mut name = OsString::from(temp.file_stem().unwrap_or_default());
    name.push("_files");
    temp.with_file_name(name)
}

/// The set of paths belonging to one notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPaths {
    /// The original notebook.
    pub source: PathBuf,

    /// The discovery root the notebook was found under.
    pub root: PathBuf,

    /// Folder name standing for the root under `scratch_dir` and the
    /// output folder.
    pub label: PathBuf,

    /// The preprocessed working copy.
    pub temp: PathBuf,
}

impl NotebookPaths {
    /// Derive all paths for `source`, found under `root`, labelling the root
    /// by its last component.
    pub fn new(source: impl Into<PathBuf>, root: impl Into<PathBuf>, config: &HarnessConfig) -> Self {
        let root = root.into();
        let label = root_label(&root);
        Self::with_label(source, root, label, config)
    }

    /// Like [`NotebookPaths::new`] with an explicit root label (see
    /// [`root_labels`]).
    pub fn with_label(
        source: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        label: impl Into<PathBuf>,
        config: &HarnessConfig,
    ) -> Self {
        let source = source.into();
        let root = root.into();
        let label = label.into();

        let beside = temp_notebook_path(&source, &config.temp_suffix);
        let temp = match &config.scratch_dir {
            Some(scratch) => {
                let mut dir = scratch.join(&label);
                if let Some(parent) = relative_to(&source, &root).parent() {
                    dir.push(parent);
                }
                dir.join(beside.file_name().unwrap_or_default())
            }
            None => beside,
        };

        Self {
            source,
            root,
            label,
            temp,
        }
    }

    /// Folder of the original notebook (where `snippets/` lives).
    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or(Path::new("."))
    }

    /// Source path relative to its discovery root.
    pub fn relative(&self) -> PathBuf {
        relative_to(&self.source, &self.root)
    }

    /// LaTeX intermediate written by nbconvert next to the working copy.
    pub fn tex(&self) -> PathBuf {
        tex_path(&self.temp)
    }

    /// Asset folder nbconvert writes next to the working copy.
    pub fn assets_dir(&self) -> PathBuf {
        assets_dir(&self.temp)
    }

    /// Folder receiving the rendered copy, mirroring the source layout.
    pub fn render_dir(&self, output_dir: &Path) -> PathBuf {
        let mut dir = output_dir.join(&self.label);
        if let Some(parent) = self.relative().parent() {
            dir.push(parent);
        }
        dir
    }

    /// Full path of the rendered copy, or `None` when rendering is off.
    pub fn render_path(&self, output_dir: &Path, format: RenderFormat) -> Option<PathBuf> {
        let ext = format.extension()?;
        let mut name = OsString::from(self.source.file_stem().unwrap_or_default());
        name.push(".");
        name.push(ext);
        Some(self.render_dir(output_dir).join(name))
    }
}

/// One distinct label per root.
///
/// Roots are labelled by their last component. When two roots share it
/// (`a/demos`, `b/demos`) the later ones get `_2`, `_3`, ... appended so
/// their working copies and rendered files never collide.
pub fn root_labels(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut labels: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let base = root_label(root);
        let mut label = base.clone();
        let mut n = 2;
        while labels.contains(&label) {
            let mut name = if base.as_os_str().is_empty() {
                OsString::from("root")
            } else {
                base.clone().into_os_string()
            };
            name.push(format!("_{}", n));
            label = PathBuf::from(name);
            n += 1;
        }
        labels.push(label);
    }
    labels
}

/// Last component of a root, or nothing for roots like `.` and `..`.
fn root_label(root: &Path) -> PathBuf {
    root.file_name().map(PathBuf::from).unwrap_or_default()
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()))
}
