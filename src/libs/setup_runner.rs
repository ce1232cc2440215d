// Runs a mixed list of work items (tools and configuration files) as one fail-fast batch.
// Used by `machine-setup now`, which installs every tool and then applies every config.

use crate::libs::batch::{BatchResult, run_fail_fast};
use crate::libs::config_applier::ConfigApplier;
use crate::libs::run_context::RunContext;
use crate::libs::tool_installer::ToolInstaller;
use crate::schemas::work_items::WorkItem;

pub struct SetupRunner<'a> {
    installer: ToolInstaller<'a>,
    applier: ConfigApplier<'a>,
}

impl<'a> SetupRunner<'a> {
    pub fn new(installer: ToolInstaller<'a>, applier: ConfigApplier<'a>) -> Self {
        Self { installer, applier }
    }

    /// Processes `items` in order, dispatching each to its orchestrator.
    pub fn run(&self, ctx: &RunContext, items: &[WorkItem]) -> BatchResult {
        run_fail_fast(
            "[Setup]",
            items,
            |item| (item.name(), item.operation()),
            |item| match item {
                WorkItem::Tool(tool) => self.installer.install_one(ctx, tool),
                WorkItem::Configure(config) => self.applier.apply_one(ctx, config).map(|_| ()),
            },
        )
    }
}
