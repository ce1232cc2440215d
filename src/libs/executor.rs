//! # Command Executor
//!
//! Runs one external process with the terminal's stdin/stdout/stderr attached, so
//! interactive sub-installers (password prompts, package-manager questions) work
//! as if the user had typed the command. Nothing is captured.
//!
//! The orchestrators never spawn processes directly: they receive a
//! [`ProcessRunner`] at construction time. Production code uses
//! [`SystemProcessRunner`]; tests hand in a fake.

use std::fmt;
// Process spawning and the stdio wiring for children.
use std::process::{Child, Command, ExitStatus, Stdio};
// Polling between `try_wait` calls.
use std::thread;
use std::time::Duration;

// For coloring the command line in debug output.
use colored::Colorize;
use thiserror::Error;

use crate::libs::run_context::{Interrupted, RunContext};
use crate::{log_debug, log_warn};

/// A command to run: either a program with arguments, or a string for `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Program { program: String, args: Vec<String> },
    Shell(String),
}

impl CommandLine {
    pub fn program<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::Program { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    pub fn shell(script: impl Into<String>) -> Self {
        CommandLine::Shell(script.into())
    }

    /// Splits `line` on whitespace into program and arguments. `None` for a blank line.
    /// No quoting rules apply; use [`CommandLine::shell`] when a command needs them.
    pub fn from_words(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::program(program, words))
    }

    fn to_command(&self) -> Command {
        match self {
            CommandLine::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            CommandLine::Shell(script) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Program { program, args } if args.is_empty() => write!(f, "{program}"),
            CommandLine::Program { program, args } => write!(f, "{} {}", program, args.join(" ")),
            CommandLine::Shell(script) => write!(f, "sh -c '{script}'"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("lost track of `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` interrupted: {reason}")]
    Interrupted { command: String, reason: Interrupted },
}

impl ExecError {
    pub fn interruption(&self) -> Option<Interrupted> {
        match self {
            ExecError::Interrupted { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// The process-execution capability handed to the orchestrators.
pub trait ProcessRunner {
    /// Runs `command` to completion. `Ok` only for exit status 0.
    fn run(&self, ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError>;

    /// Asks a yes/no question by running `command`, e.g. `xcode-select -p`.
    ///
    /// `Ok(true)` for exit status 0, `Ok(false)` for a non-zero exit or a program that
    /// does not exist. Interruptions and other failures are still errors.
    fn succeeds(&self, ctx: &RunContext, command: &CommandLine) -> Result<bool, ExecError> {
        answer(self.run(ctx, command))
    }
}

/// Folds the outcome of a check command into a yes/no answer.
fn answer(outcome: Result<(), ExecError>) -> Result<bool, ExecError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(ExecError::Failed { .. }) => Ok(false),
        Err(ExecError::Spawn { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Real runner backed by `std::process::Command`.
///
/// The child is polled every `poll_interval`; when the context is cancelled or its
/// deadline passes, the child is killed and reaped before returning.
#[derive(Debug, Clone)]
pub struct SystemProcessRunner {
    poll_interval: Duration,
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(50) }
    }
}

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn terminate(child: &mut Child, command: &str) {
        if let Err(e) = child.kill() {
            log_warn!("[Executor] Could not kill `{}`: {}", command, e);
        }
        // Reap so no zombie is left behind.
        let _ = child.wait();
    }

    /// Spawns `command` and waits for it, watching `ctx` in between.
    /// `quiet` detaches all three standard streams instead of inheriting them.
    fn execute(&self, ctx: &RunContext, command: &CommandLine, quiet: bool) -> Result<(), ExecError> {
        let display = command.to_string();
        ctx.check()
            .map_err(|reason| ExecError::Interrupted { command: display.clone(), reason })?;

        // Interactive installers need the terminal; checks must not print anything.
        let stdio = || if quiet { Stdio::null() } else { Stdio::inherit() };

        log_debug!("[Executor] Running: {}", display.cyan());
        let mut child = command
            .to_command()
            .stdin(stdio())
            .stdout(stdio())
            .stderr(stdio())
            .spawn()
            .map_err(|source| ExecError::Spawn { command: display.clone(), source })?;

        // `wait()` would block past a Ctrl-C, so poll instead.
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    log_debug!("[Executor] `{}` exited successfully", display);
                    return Ok(());
                }
                Ok(Some(status)) => {
                    // A Ctrl-C reaches the child too; report it as the cancellation it was.
                    if let Err(reason) = ctx.check() {
                        return Err(ExecError::Interrupted { command: display, reason });
                    }
                    return Err(ExecError::Failed { command: display, status });
                }
                Ok(None) => {}
                Err(source) => {
                    Self::terminate(&mut child, &display);
                    return Err(ExecError::Wait { command: display, source });
                }
            }

            if let Err(reason) = ctx.check() {
                log_debug!("[Executor] Stopping `{}`: {}", display, reason);
                Self::terminate(&mut child, &display);
                return Err(ExecError::Interrupted { command: display, reason });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError> {
        self.execute(ctx, command, false)
    }

    fn succeeds(&self, ctx: &RunContext, command: &CommandLine) -> Result<bool, ExecError> {
        answer(self.execute(ctx, command, true))
    }
}
