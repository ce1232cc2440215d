//! # Setup Document Schema
//!
//! Raw shape of the declarative `config.yaml` and its validation into the typed
//! work items of [`super::work_items`].
//!
//! ```yaml
//! tools:
//!   - name: wget
//!   - name: iterm2
//!     method: cask
//!   - name: rustup
//!     install_command: "curl --proto '=https' -sSf https://sh.rustup.rs | sh -s -- -y"
//!     post_install:
//!       - "rustup default stable"
//! configure:
//!   - name: zshrc
//!     config_url: https://github.com/me/dotfiles/blob/main/.zshrc
//!     install_path: ~/.zshrc
//! ```

use serde::Deserialize;
use thiserror::Error;

use super::work_items::{ConfigSource, ConfigureItem, InstallMethod, ToolItem, ToolSource};

/// Top-level document: two ordered lists, either of which may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct SetupDocument {
    #[serde(default)]
    pub tools: Vec<RawTool>,
    #[serde(default)]
    pub configure: Vec<RawConfigureItem>,
}

/// One entry of the `tools` list, as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTool {
    pub name: String,
    /// `cask` selects the alternate package-manager method.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub install_command: Option<String>,
    #[serde(default)]
    pub post_install: Vec<String>,
}

/// One entry of the `configure` list, as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigureItem {
    pub name: String,
    #[serde(default)]
    pub config_url: Option<String>,
    pub install_path: String,
    #[serde(default)]
    pub configure_command: Option<String>,
}

/// Reasons a raw entry cannot become a work item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("entry #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("tool '{name}' has unknown install method '{method}' (expected 'default' or 'cask')")]
    UnknownMethod { name: String, method: String },
    #[error("configure item '{name}' needs either a 'config_url' or a 'configure_command'")]
    MissingSource { name: String },
    #[error("configure item '{name}' has an empty 'install_path'")]
    MissingTarget { name: String },
}

/// Treats blank strings the same as absent ones.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RawTool {
    /// Validates this entry. `index` is its 1-based position, used in messages.
    pub fn into_item(self, index: usize) -> Result<ToolItem, ItemError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ItemError::EmptyName { index });
        }

        let source = match non_blank(&self.install_command) {
            Some(command) => ToolSource::Command(command.to_string()),
            None => {
                let method = match non_blank(&self.method) {
                    None | Some("default") | Some("formula") => InstallMethod::Formula,
                    Some("cask") => InstallMethod::Cask,
                    Some(other) => {
                        return Err(ItemError::UnknownMethod { name, method: other.to_string() });
                    }
                };
                ToolSource::PackageManager(method)
            }
        };

        let post_install = self
            .post_install
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(ToolItem { name, source, post_install })
    }
}

impl RawConfigureItem {
    /// Validates this entry. A custom command takes precedence over the URL.
    pub fn into_item(self, index: usize) -> Result<ConfigureItem, ItemError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ItemError::EmptyName { index });
        }
        let target_path = self.install_path.trim().to_string();
        if target_path.is_empty() {
            return Err(ItemError::MissingTarget { name });
        }

        let source = if let Some(command) = non_blank(&self.configure_command) {
            ConfigSource::Command(command.to_string())
        } else if let Some(url) = non_blank(&self.config_url) {
            ConfigSource::Url(url.to_string())
        } else {
            return Err(ItemError::MissingSource { name });
        };

        Ok(ConfigureItem { name, source, target_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tool_without_command_uses_package_manager() {
        let raw = RawTool { name: "wget".into(), ..Default::default() };
        assert_eq!(raw.into_item(1).unwrap(), ToolItem::package("wget"));
    }

    #[test]
    fn cask_method_is_recognized() {
        let raw = RawTool { name: "iterm2".into(), method: Some("cask".into()), ..Default::default() };
        assert_eq!(
            raw.into_item(1).unwrap().source,
            ToolSource::PackageManager(InstallMethod::Cask)
        );
    }

    #[test]
    fn custom_command_wins_over_method() {
        let raw = RawTool {
            name: "curl".into(),
            method: Some("cask".into()),
            install_command: Some("brew install curl".into()),
            post_install: vec!["  ".into(), "echo done".into()],
        };
        let item = raw.into_item(1).unwrap();
        assert_eq!(item.source, ToolSource::Command("brew install curl".into()));
        assert_eq!(item.post_install, vec!["echo done".to_string()]);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let raw = RawTool { name: "x".into(), method: Some("snap".into()), ..Default::default() };
        assert_eq!(
            raw.into_item(3).unwrap_err(),
            ItemError::UnknownMethod { name: "x".into(), method: "snap".into() }
        );
    }

    #[test]
    fn configure_item_requires_a_source() {
        let raw = RawConfigureItem {
            name: "zshrc".into(),
            install_path: "~/.zshrc".into(),
            config_url: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(raw.into_item(1).unwrap_err(), ItemError::MissingSource { name: "zshrc".into() });
    }

    #[test]
    fn configure_command_takes_precedence_over_url() {
        let raw = RawConfigureItem {
            name: "starship".into(),
            install_path: "~/.config/starship.toml".into(),
            config_url: Some("https://example.com/starship.toml".into()),
            configure_command: Some("starship preset -o out.toml".into()),
        };
        assert_eq!(
            raw.into_item(1).unwrap().source,
            ConfigSource::Command("starship preset -o out.toml".into())
        );
    }

    #[test]
    fn empty_name_reports_position() {
        let raw = RawConfigureItem { name: " ".into(), install_path: "/tmp/x".into(), ..Default::default() };
        assert_eq!(raw.into_item(2).unwrap_err(), ItemError::EmptyName { index: 2 });
    }
}
