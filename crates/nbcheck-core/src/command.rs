//! External program invocation.
//!
//! The runner and renderer never spawn processes themselves; they describe an
//! [`Invocation`] and hand it to a [`CommandRunner`]. Production code uses
//! [`SystemCommandRunner`]; tests substitute a fake that simulates passing,
//! failing or hanging programs.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Error, Result};

/// One external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit; unlimited when `None`.
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the wall-clock limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How an external program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exited with a status code.
    Exited(i32),
    /// Terminated by a signal.
    Signalled,
    /// Killed by the harness after the timeout expired.
    TimedOut,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {}", code),
            Self::Signalled => write!(f, "was terminated by a signal"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// How the program ended.
    pub completion: Completion,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl CommandOutput {
    /// Whether the program exited with status 0.
    pub fn success(&self) -> bool {
        self.completion == Completion::Exited(0)
    }

    /// `Ok(self)` on success, otherwise a [`Error::CommandFailed`].
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                program: program.to_string(),
                completion: self.completion.to_string(),
            })
        }
    }
}

/// Capability to run external programs.
///
/// Returns `Err` only when the program could not be started at all; a
/// program that runs and fails (or times out) is an `Ok` with the matching
/// [`Completion`].
pub trait CommandRunner {
    /// Run the invocation to completion.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Runs programs as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!("Running: {}", invocation.command_line());

        let child = command.spawn().map_err(|e| Error::Spawn {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;

        let finished = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output()).await,
            None => Ok(child.wait_with_output().await),
        };

        // On timeout the dropped future drops the child, which kills it.
        let Ok(output) = finished else {
            tracing::warn!(
                "{} timed out after {:?}",
                invocation.program,
                invocation.timeout.unwrap_or_default()
            );
            return Ok(CommandOutput {
                completion: Completion::TimedOut,
                output: String::new(),
            });
        };
        let output = output?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let completion = match output.status.code() {
            Some(code) => Completion::Exited(code),
            None => Completion::Signalled,
        };

        Ok(CommandOutput {
            completion,
            output: text,
        })
    }
}

/// Whether `program` can be found on PATH (or is an existing path).
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new("jupyter")
            .args(["nbconvert", "--to", "html"])
            .arg("nb_tmp.ipynb")
            .cwd("/work")
            .timeout(Duration::from_secs(5));

        assert_eq!(invocation.command_line(), "jupyter nbconvert --to html nb_tmp.ipynb");
        assert_eq!(invocation.cwd, Some(PathBuf::from("/work")));
        assert_eq!(invocation.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_check() {
        let ok = CommandOutput {
            completion: Completion::Exited(0),
            output: String::new(),
        };
        assert!(ok.check("pytest").is_ok());

        let failed = CommandOutput {
            completion: Completion::TimedOut,
            output: String::new(),
        };
        let err = failed.check("pytest").unwrap_err();
        assert_eq!(err.to_string(), "pytest timed out");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = SystemCommandRunner
            .run(&Invocation::new("nbcheck-definitely-not-a-program"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_status() {
        let output = SystemCommandRunner
            .run(&Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .await
            .unwrap();

        assert_eq!(output.completion, Completion::Exited(3));
        assert_eq!(output.output, "out\nerr\n");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = std::time::Instant::now();
        let output = SystemCommandRunner
            .run(
                &Invocation::new("sleep")
                    .arg("30")
                    .timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap();

        assert_eq!(output.completion, Completion::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = SystemCommandRunner
            .run(&Invocation::new("pwd").cwd(temp.path()))
            .await
            .unwrap();

        let reported = std::path::PathBuf::from(output.output.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }
}
