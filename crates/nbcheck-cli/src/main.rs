//! nbcheck CLI - test harness for Jupyter tutorial notebooks.

mod clean;
mod colors;
mod list;
mod preprocess;
mod run;
mod settings;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use settings::Settings;

#[derive(Parser)]
#[command(name = "nbcheck")]
#[command(about = "Execute, render and report on Jupyter notebooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every notebook under the roots and write the summary log
    Run {
        /// Folders to search (default: configured roots)
        roots: Vec<PathBuf>,

        /// Exit with an error when any notebook fails
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// List the notebooks a run would process
    List {
        /// Folders to search (default: configured roots)
        roots: Vec<PathBuf>,

        #[command(flatten)]
        settings: Settings,
    },

    /// Write the working copy of one notebook without running it
    Preprocess {
        /// Path to the notebook (.ipynb file)
        notebook: PathBuf,

        /// Output path (default: next to the notebook with the temp suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: Settings,
    },

    /// Delete working copies left behind by interrupted runs
    Clean {
        /// Folders to search (default: configured roots)
        roots: Vec<PathBuf>,

        /// Only list what would be deleted
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// Check that the external programs are installed
    Tools {
        #[command(flatten)]
        settings: Settings,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Helper to format nbcheck-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<nbcheck_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Run {
            roots,
            strict,
            settings,
        } => {
            run::execute(&settings, &roots, strict).await.map_err(format_error)?;
        }

        Commands::List { roots, settings } => {
            list::execute(&settings, &roots).map_err(format_error)?;
        }

        Commands::Preprocess {
            notebook,
            output,
            settings,
        } => {
            preprocess::execute(&settings, &notebook, output.as_deref()).map_err(format_error)?;
        }

        Commands::Clean {
            roots,
            dry_run,
            settings,
        } => {
            clean::execute(&settings, &roots, dry_run).map_err(format_error)?;
        }

        Commands::Tools { settings } => tools::execute(&settings).map_err(format_error)?,
    }

    Ok(())
}
