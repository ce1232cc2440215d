// This module installs the tools listed under `tools:` in the setup document.
// It acts as the Installation Orchestrator: for every tool, in order, it either runs the
// tool's custom install command or builds the Homebrew invocation, and then runs
// the tool's post-install commands.
//
// Key responsibilities include:
// - Choosing the execution path (custom command vs. Homebrew) per tool.
// - Adding the `--cask` and `--force` flags to Homebrew installs.
// - Stopping the whole batch on the first failed install (via `batch::run_fail_fast`).
// - Running post-install commands best-effort: an ordinary failure is logged, never fatal,
//   but a cancellation or an expired deadline still stops the tool and the batch.

// For adding color to terminal output, enhancing readability.
use colored::Colorize;

// The fail-fast batch driver and the per-item error type it records.
use crate::libs::batch::{BatchResult, StepError, run_fail_fast};
// The injected process runner and the command representation it executes.
use crate::libs::executor::{CommandLine, ProcessRunner};
// Cancellation and deadline handle threaded through every step.
use crate::libs::run_context::RunContext;
// Typed tool entries, as validated from the setup document.
use crate::schemas::work_items::{InstallMethod, Operation, ToolItem, ToolSource};
// Custom logging macros from the crate root.
use crate::{log_debug, log_info, log_warn};

/// Program used for default installs.
pub const BREW: &str = "brew";
/// Flag selecting the cask install method.
const CASK_FLAG: &str = "--cask";
/// Flag asking Homebrew to reinstall over an existing install.
const FORCE_FLAG: &str = "--force";

/// Builds `brew install [--cask] [--force] <name>`.
///
/// The flag order is fixed: method flag first, then force, then the tool name.
fn brew_install_command(name: &str, method: InstallMethod, force: bool) -> CommandLine {
    let mut args = vec!["install"];
    if method == InstallMethod::Cask {
        args.push(CASK_FLAG);
    }
    if force {
        args.push(FORCE_FLAG);
    }
    args.push(name);
    CommandLine::program(BREW, args)
}

/// The Installation Orchestrator.
///
/// `force` does not skip or check anything here; it only adds Homebrew's
/// `--force` flag and leaves the reinstall decision to Homebrew.
pub struct ToolInstaller<'a> {
    runner: &'a dyn ProcessRunner, // Executes every install and post-install command.
    force: bool,                   // Passed through to Homebrew as `--force`.
}

impl<'a> ToolInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, force: bool) -> Self {
        Self { runner, force }
    }

    /// Installs `tools` in order, stopping at the first failure.
    ///
    /// # Arguments
    /// * `ctx`: Cancellation/deadline handle for the whole batch.
    /// * `tools`: Validated tool entries, in document order.
    ///
    /// # Returns
    /// One stat per attempted tool and, when a tool failed, the error that ended the batch.
    pub fn install_tools(&self, ctx: &RunContext, tools: &[ToolItem]) -> BatchResult {
        // Informative log message indicating the start of the tool processing phase.
        log_info!("[Tools] Processing {} tool installation(s)...", tools.len());
        if self.force {
            // Let the user know up front that existing tools will be reinstalled.
            log_info!("[Tools] '{}' is set; Homebrew will reinstall existing tools", "force".bright_yellow());
        }

        // The shared driver takes care of logging, timing and the fail-fast policy.
        // We only tell it how to name an item and how to run its main step.
        let result = run_fail_fast(
            "[Tools]",
            tools,
            |tool| (tool.name.as_str(), Operation::Install),
            |tool| self.install_one(ctx, tool),
        );

        if result.is_success() {
            log_info!("[Tools] All requested tools have been installed successfully.");
        }
        result
    }

    /// Installs a single tool: main step, then its post-install commands.
    pub fn install_one(&self, ctx: &RunContext, tool: &ToolItem) -> Result<(), StepError> {
        // Decide how this tool gets installed, and show the exact command in debug mode.
        let command = self.main_command(tool);
        log_debug!("[Tools] Install command for '{}': {}", tool.name, command.to_string().cyan());
        // Main step: any failure here fails the tool (and therefore the batch).
        self.runner.run(ctx, &command)?;

        // Post-install only runs after a successful main step.
        self.run_post_install(ctx, tool)
    }

    /// The command realizing `tool`: its custom command, or the Homebrew install.
    pub fn main_command(&self, tool: &ToolItem) -> CommandLine {
        match &tool.source {
            // A custom command goes through `sh -c` so pipes and `&&` work as written.
            ToolSource::Command(script) => {
                log_info!("[Tools] Installing {} using custom command...", tool.name.bold());
                CommandLine::shell(script.clone())
            }
            // Otherwise Homebrew, with the method and force flags applied.
            ToolSource::PackageManager(method) => {
                log_info!("[Tools] Installing {} using {}...", tool.name.bold(), BREW);
                brew_install_command(&tool.name, *method, self.force)
            }
        }
    }

    /// Runs every post-install command in order.
    ///
    /// Ordinary failures are logged and skipped. An interruption (Ctrl-C or deadline)
    /// is not a post-install failure: it stops the loop and is returned so the batch
    /// ends as cancelled instead of reporting success.
    fn run_post_install(&self, ctx: &RunContext, tool: &ToolItem) -> Result<(), StepError> {
        for (index, script) in tool.post_install.iter().enumerate() {
            log_debug!("[Tools] Post-install {}/{} for '{}': {}", index + 1, tool.post_install.len(), tool.name, script);
            match self.runner.run(ctx, &CommandLine::shell(script.clone())) {
                Ok(()) => {}
                // The user (or the deadline) asked us to stop; don't swallow that.
                Err(e) if e.interruption().is_some() => return Err(e.into()),
                // Best-effort: warn and carry on with the next post-install command.
                Err(e) => log_warn!(
                    "[Tools] Post-install command for {} failed (continuing): {}",
                    tool.name.bold().yellow(),
                    e
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::executor::ExecError;
    use crate::libs::run_context::Interrupted;
    use crate::schemas::work_items::Status;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Records every command and fails the ones matching a predicate.
    struct FakeRunner {
        calls: RefCell<Vec<CommandLine>>,
        fails: Box<dyn Fn(&CommandLine) -> bool>,
    }

    impl FakeRunner {
        fn succeeding() -> Self {
            Self::failing_when(|_| false)
        }

        fn failing_when(fails: impl Fn(&CommandLine) -> bool + 'static) -> Self {
            Self { calls: RefCell::new(Vec::new()), fails: Box::new(fails) }
        }

        fn rendered_calls(&self) -> Vec<String> {
            self.calls.borrow().iter().map(ToString::to_string).collect()
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError> {
            ctx.check().map_err(|reason| ExecError::Interrupted { command: command.to_string(), reason })?;
            self.calls.borrow_mut().push(command.clone());
            if (self.fails)(command) {
                return Err(ExecError::Spawn {
                    command: command.to_string(),
                    source: std::io::Error::other("mock failure"),
                });
            }
            Ok(())
        }
    }

    /// Behaves like a user pressing Ctrl-C while `script` is running.
    struct InterruptDuring {
        script: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl ProcessRunner for InterruptDuring {
        fn run(&self, ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError> {
            self.calls.borrow_mut().push(command.to_string());
            if is_script(command, self.script) {
                ctx.cancel();
                return Err(ExecError::Interrupted { command: command.to_string(), reason: Interrupted::Cancelled });
            }
            Ok(())
        }
    }

    fn is_script(command: &CommandLine, needle: &str) -> bool {
        matches!(command, CommandLine::Shell(s) if s == needle)
    }

    #[test]
    fn homebrew_flags_are_appended_in_order() {
        assert_eq!(brew_install_command("wget", InstallMethod::Formula, false).to_string(), "brew install wget");
        assert_eq!(brew_install_command("git", InstallMethod::Formula, true).to_string(), "brew install --force git");
        assert_eq!(
            brew_install_command("iterm2", InstallMethod::Cask, true).to_string(),
            "brew install --cask --force iterm2"
        );
    }

    #[test]
    fn default_and_custom_tools_both_succeed() {
        let runner = FakeRunner::succeeding();
        let tools = vec![ToolItem::package("wget"), ToolItem::custom("curl", "brew install curl")];

        let result = ToolInstaller::new(&runner, false).install_tools(&RunContext::background(), &tools);

        assert!(result.error.is_none());
        let summary: Vec<_> = result.stats.iter().map(|s| (s.name.as_str(), s.operation, s.status)).collect();
        assert_eq!(
            summary,
            vec![("wget", Operation::Install, Status::Success), ("curl", Operation::Install, Status::Success)]
        );
        assert_eq!(runner.rendered_calls(), vec!["brew install wget", "sh -c 'brew install curl'"]);
    }

    #[test]
    fn failing_tool_aborts_remaining_items() {
        let runner = FakeRunner::failing_when(|c| is_script(c, "false"));
        let tools = vec![ToolItem::package("wget"), ToolItem::custom("broken", "false"), ToolItem::package("jq")];

        let result = ToolInstaller::new(&runner, false).install_tools(&RunContext::background(), &tools);

        assert_eq!(result.stats.len(), 2);
        assert_eq!(result.stats[1].name, "broken");
        assert_eq!(result.stats[1].status, Status::Error);
        assert_eq!(result.error.as_ref().map(|e| e.item.as_str()), Some("broken"));
        // jq was never attempted.
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn post_install_failure_does_not_fail_the_tool() {
        let runner = FakeRunner::failing_when(|c| is_script(c, "exit 1"));
        let mut tool = ToolItem::package("rustup");
        tool.post_install = vec!["exit 1".into(), "rustup default stable".into()];

        let result = ToolInstaller::new(&runner, false).install_tools(&RunContext::background(), &[tool]);

        assert!(result.is_success());
        assert_eq!(result.stats[0].status, Status::Success);
        assert_eq!(
            runner.rendered_calls(),
            vec!["brew install rustup", "sh -c 'exit 1'", "sh -c 'rustup default stable'"]
        );
    }

    #[test]
    fn interrupt_during_post_install_fails_the_batch() {
        let runner = InterruptDuring { script: "long-setup", calls: RefCell::new(Vec::new()) };
        let mut last = ToolItem::package("rustup");
        last.post_install = vec!["long-setup".into(), "never-run".into()];
        let ctx = RunContext::background();

        let result = ToolInstaller::new(&runner, false).install_tools(&ctx, &[ToolItem::package("wget"), last]);

        assert!(ctx.is_cancelled());
        let error = result.error.expect("cancellation must surface as the batch error");
        assert_eq!(error.item, "rustup");
        assert_eq!(error.source.interruption(), Some(Interrupted::Cancelled));
        assert_eq!(result.stats[1].status, Status::Error);
        // The remaining post-install command is not attempted.
        assert_eq!(*runner.calls.borrow(), vec!["brew install wget", "brew install rustup", "sh -c 'long-setup'"]);
    }

    #[test]
    fn post_install_is_skipped_when_install_fails() {
        let runner = FakeRunner::failing_when(|c| matches!(c, CommandLine::Program { .. }));
        let mut tool = ToolItem::package("rustup");
        tool.post_install = vec!["echo never".into()];

        let result = ToolInstaller::new(&runner, false).install_tools(&RunContext::background(), &[tool]);

        assert!(!result.is_success());
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn force_flag_reaches_homebrew_only() {
        let runner = FakeRunner::succeeding();
        let tools = vec![ToolItem::package("git"), ToolItem::custom("nvm", "curl -o- https://example.com/nvm.sh | bash")];

        ToolInstaller::new(&runner, true).install_tools(&RunContext::background(), &tools);

        assert_eq!(
            runner.rendered_calls(),
            vec!["brew install --force git", "sh -c 'curl -o- https://example.com/nvm.sh | bash'"]
        );
    }

    #[test]
    fn cancelled_context_is_reported_as_interruption() {
        let runner = FakeRunner::succeeding();
        let ctx = RunContext::background();
        ctx.cancel();

        let result = ToolInstaller::new(&runner, false).install_tools(&ctx, &[ToolItem::package("wget")]);

        let error = result.error.unwrap();
        assert!(error.is_interrupted());
        assert_eq!(error.source.interruption(), Some(Interrupted::Cancelled));
        assert_eq!(result.stats.len(), 1);
    }
}
