//! Review copies of executed notebooks.
//!
//! Rendering is best-effort: a missing converter or a LaTeX failure is
//! reported to the caller, who logs it and moves on. It never changes a
//! notebook's pass/fail status.

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{CommandRunner, Invocation};
use crate::config::{HarnessConfig, RenderFormat};
use crate::error::{Error, Result};
use crate::paths::NotebookPaths;

/// Converts executed working copies to HTML or PDF.
pub struct Renderer<'a, R> {
    config: &'a HarnessConfig,
    commands: &'a R,
}

impl<'a, R: CommandRunner> Renderer<'a, R> {
    /// Create a renderer.
    pub fn new(config: &'a HarnessConfig, commands: &'a R) -> Self {
        Self { config, commands }
    }

    /// Render the working copy of `paths` in the configured format.
    ///
    /// Returns the rendered file, or `None` when rendering is disabled.
    pub async fn render(&self, paths: &NotebookPaths) -> Result<Option<PathBuf>> {
        let Some(target) = paths.render_path(&self.config.output_dir, self.config.render_format)
        else {
            return Ok(None);
        };

        let out_dir = absolute(&paths.render_dir(&self.config.output_dir));
        fs::create_dir_all(&out_dir).map_err(|e| Error::at(&out_dir, e))?;

        match self.config.render_format {
            RenderFormat::Html => self.to_html(paths, &target, &out_dir).await?,
            RenderFormat::Pdf => self.to_pdf(paths, &target, &out_dir).await?,
            RenderFormat::None => return Ok(None),
        }

        tracing::info!("Rendered {}", target.display());
        Ok(Some(target))
    }

    async fn to_html(&self, paths: &NotebookPaths, target: &Path, out_dir: &Path) -> Result<()> {
        let output_name = target.file_name().unwrap_or_default().to_string_lossy();
        let invocation = self
            .nbconvert(paths, "html")
            .args(["--output".to_string(), output_name.into_owned()])
            .args(["--output-dir".to_string(), out_dir.to_string_lossy().into_owned()])
            .arg(absolute(&paths.temp).to_string_lossy());

        self.commands
            .run(&invocation)
            .await?
            .check(&self.config.tools.jupyter)?;
        Ok(())
    }

    async fn to_pdf(&self, paths: &NotebookPaths, target: &Path, out_dir: &Path) -> Result<()> {
        let temp = absolute(&paths.temp);
        let temp_dir = temp.parent().unwrap_or(Path::new("."));
        let latex = self
            .nbconvert(paths, "latex")
            .args(["--output-dir".to_string(), temp_dir.to_string_lossy().into_owned()])
            .arg(temp.to_string_lossy());
        self.commands
            .run(&latex)
            .await?
            .check(&self.config.tools.jupyter)?;

        let tex = absolute(&paths.tex());
        let compile = Invocation::new(&self.config.tools.tectonic)
            .arg(tex.to_string_lossy())
            .arg("--print")
            .args(["--outdir".to_string(), out_dir.to_string_lossy().into_owned()])
            .timeout(self.config.render_timeout());
        let compile = match self.work_dir(paths) {
            Some(dir) => compile.cwd(dir),
            None => compile,
        };
        self.commands
            .run(&compile)
            .await?
            .check(&self.config.tools.tectonic)?;

        // tectonic names the PDF after the working copy.
        let produced = out_dir.join(tex.with_extension("pdf").file_name().unwrap_or_default());
        if produced != target && produced.exists() {
            fs::rename(&produced, target).map_err(|e| Error::at(&produced, e))?;
        }
        Ok(())
    }

    fn nbconvert(&self, paths: &NotebookPaths, to: &str) -> Invocation {
        let invocation = Invocation::new(&self.config.tools.jupyter)
            .args(["nbconvert", "--to", to])
            .timeout(self.config.render_timeout());
        match self.work_dir(paths) {
            Some(dir) => invocation.cwd(dir),
            None => invocation,
        }
    }

    fn work_dir(&self, paths: &NotebookPaths) -> Option<PathBuf> {
        self.config
            .work_dir
            .clone()
            .or_else(|| Some(absolute(paths.source_dir())))
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
