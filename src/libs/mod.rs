// Core functionality behind the subcommands.

// Fail-fast loop shared by the install and configure batches.
pub mod batch;
// Xcode command-line tools and Homebrew prerequisites.
pub mod bootstrap;
// Configuration Orchestrator: puts files from `configure:` in place.
pub mod config_applier;
// Reading and validating the YAML setup document.
pub mod config_loading;
// Command Executor and the `ProcessRunner` seam.
pub mod executor;
// Discovering, running and managing `machine-setup-<name>` extensions.
pub mod extensions;
// HTTP downloads of configuration content.
pub mod fetcher;
// Where the setup document lives.
pub mod paths;
// Table and JSON rendering of run stats.
pub mod report;
// Cancellation flag and deadline passed down to every step.
pub mod run_context;
// Mixed tools + configs batch for `now`.
pub mod setup_runner;
pub mod stats_recorder;
// Installation Orchestrator: tools from `tools:`.
pub mod tool_installer;
pub mod utilities;
