use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use thiserror::Error;

use crate::log_debug;
use crate::schemas::setup_config::{ItemError, SetupDocument};
use crate::schemas::work_items::{ConfigureItem, ToolItem, WorkItem};

/// Configuration errors. They are reported before any batch starts, so no stats exist yet.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}. Please ensure the file exists and is readable", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}. Please check its YAML syntax", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid `{section}` entry in {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        section: &'static str,
        #[source]
        source: ItemError,
    },
}

/// The validated content of a setup document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    pub tools: Vec<ToolItem>,
    pub configure: Vec<ConfigureItem>,
}

impl SetupConfig {
    /// All tools followed by all configuration items, as one ordered batch.
    pub fn into_work_items(self) -> Vec<WorkItem> {
        self.tools
            .into_iter()
            .map(WorkItem::Tool)
            .chain(self.configure.into_iter().map(WorkItem::Configure))
            .collect()
    }
}

/// Reads and validates the setup document at `path`.
pub fn load_setup_config(path: &Path) -> Result<SetupConfig, ConfigError> {
    log_debug!("[Config] Loading setup document from {}", path.display().to_string().blue());
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let config = parse_setup_config(&contents, path)?;
    log_debug!(
        "[Config] Loaded {} tool(s) and {} configuration item(s)",
        config.tools.len(),
        config.configure.len()
    );
    Ok(config)
}

/// Parses and validates YAML `contents`. `origin` is only used in error messages.
pub fn parse_setup_config(contents: &str, origin: &Path) -> Result<SetupConfig, ConfigError> {
    // An empty file is an empty document, not a parse error.
    let document: SetupDocument = if contents.trim().is_empty() {
        SetupDocument::default()
    } else {
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })?
    };

    let invalid = |section| move |source| ConfigError::Invalid { path: origin.to_path_buf(), section, source };

    let tools = document
        .tools
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.into_item(i + 1))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid("tools"))?;
    let configure = document
        .configure
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.into_item(i + 1))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid("configure"))?;

    Ok(SetupConfig { tools, configure })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::work_items::{ConfigSource, InstallMethod, ToolSource};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
tools:
  - name: wget
  - name: iterm2
    method: cask
  - name: rustup
    install_command: "curl -sSf https://sh.rustup.rs | sh -s -- -y"
    post_install:
      - "rustup default stable"
configure:
  - name: zshrc
    config_url: https://github.com/me/dotfiles/blob/main/.zshrc
    install_path: ~/.zshrc
  - name: starship
    install_path: ~/.config/starship.toml
    configure_command: "starship preset plain-text-symbols -o /tmp/starship.toml"
"#;

    #[test]
    fn sample_document_is_fully_typed() {
        let config = parse_setup_config(SAMPLE, Path::new("config.yaml")).unwrap();

        assert_eq!(config.tools.len(), 3);
        assert_eq!(config.tools[0], ToolItem::package("wget"));
        assert_eq!(config.tools[1].source, ToolSource::PackageManager(InstallMethod::Cask));
        assert_eq!(config.tools[2].post_install, vec!["rustup default stable".to_string()]);

        assert_eq!(config.configure.len(), 2);
        assert_eq!(
            config.configure[0].source,
            ConfigSource::Url("https://github.com/me/dotfiles/blob/main/.zshrc".into())
        );
        assert_eq!(config.configure[1].target_path, "~/.config/starship.toml");
    }

    #[test]
    fn work_items_keep_tools_before_configs() {
        let config = parse_setup_config(SAMPLE, Path::new("config.yaml")).unwrap();
        let names: Vec<_> = config.into_work_items().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, vec!["wget", "iterm2", "rustup", "zshrc", "starship"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config = parse_setup_config("tools:\n  - name: jq\n", Path::new("c.yaml")).unwrap();
        assert_eq!(config.tools.len(), 1);
        assert!(config.configure.is_empty());
        assert_eq!(parse_setup_config("", Path::new("c.yaml")).unwrap(), SetupConfig::default());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_setup_config("tools: [name: {", Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn invalid_entry_names_its_section() {
        let err = parse_setup_config("configure:\n  - name: x\n    install_path: ~/x\n", Path::new("c.yaml")).unwrap_err();
        match err {
            ConfigError::Invalid { section, source, .. } => {
                assert_eq!(section, "configure");
                assert_eq!(source, ItemError::MissingSource { name: "x".into() });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_setup_config(Path::new("/definitely/not/here/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn file_on_disk_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_setup_config(file.path()).unwrap();
        assert_eq!(config.tools.len(), 3);
    }
}
