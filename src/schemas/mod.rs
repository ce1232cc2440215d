// Data definitions shared by the loader, the orchestrators and the commands.

// Raw YAML document and its validation into work items.
pub mod setup_config;
// Typed work items, operations and statuses.
pub mod work_items;
