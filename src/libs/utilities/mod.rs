// Small helpers shared across the `libs` modules.

// `~` expansion and the per-user application directory.
pub mod path_helpers;
// GitHub "blob" URL to raw-content URL rewriting.
pub mod url_normalizer;
