// `machine-setup extension list|run|install|update|remove`.

use anyhow::Result;
use colored::Colorize;

use crate::cli::cmd_enums::ExtensionCommands;
use crate::commands::build_context;
use crate::libs::executor::SystemProcessRunner;
use crate::libs::extensions::ExtensionRegistry;
use crate::log_info;

pub fn run(action: ExtensionCommands) -> Result<()> {
    let registry = ExtensionRegistry::from_env();
    let runner = SystemProcessRunner::new();
    match action {
        ExtensionCommands::List => {
            let extensions = registry.list();
            if extensions.is_empty() {
                log_info!("[Extensions] No extensions found.");
            }
            for extension in extensions {
                println!("{:<20} {}", extension.name.bold(), extension.path.display().to_string().dimmed());
            }
        }
        ExtensionCommands::Run { name, args } => {
            registry.run(&runner, &build_context(None), &name, &args)?;
        }
        ExtensionCommands::Install { repository } => {
            registry.install(&runner, &build_context(None), &repository)?;
        }
        ExtensionCommands::Update { name } => {
            registry.update(&runner, &build_context(None), &name)?;
        }
        // Pure filesystem work; nothing to cancel.
        ExtensionCommands::Remove { name } => registry.remove(&name)?,
    }
    Ok(())
}
