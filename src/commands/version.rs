// This file handles version checking for `machine-setup`.
// The local version is baked in at compile time and compared against the tag of the
// latest published release.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use semver::Version;
use serde::Deserialize;

use crate::{log_debug, log_info, log_warn};

/// Latest-release endpoint; `MACHINE_SETUP_RELEASES_URL` overrides it (mirrors, tests).
const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/machine-setup/machine-setup/releases/latest";
const RELEASES_URL_ENV: &str = "MACHINE_SETUP_RELEASES_URL";

/// The subset of a release feed entry we care about.
#[derive(Deserialize)]
struct Release {
    tag_name: String, // e.g. "v0.4.1"
}

/// Result of comparing the running version with the newest release.
#[derive(Debug, PartialEq, Eq)]
enum UpdateStatus {
    UpToDate,
    Newer(Version),
    /// The local build is ahead of the latest release (development build).
    Ahead(Version),
}

/// Parses a release tag, tolerating a leading `v`.
fn parse_tag(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).with_context(|| format!("release tag '{tag}' is not a semantic version"))
}

fn compare(local: &str, latest_tag: &str) -> Result<UpdateStatus> {
    let local = parse_tag(local)?;
    let latest = parse_tag(latest_tag)?;
    Ok(match latest.cmp(&local) {
        std::cmp::Ordering::Greater => UpdateStatus::Newer(latest),
        std::cmp::Ordering::Less => UpdateStatus::Ahead(latest),
        std::cmp::Ordering::Equal => UpdateStatus::UpToDate,
    })
}

fn latest_release_tag() -> Result<String> {
    let url = std::env::var(RELEASES_URL_ENV).unwrap_or_else(|_| DEFAULT_RELEASES_URL.to_string());
    log_debug!("[Version] Querying {}", url);

    let agent = ureq::AgentBuilder::new()
        .user_agent(concat!("machine-setup/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(15))
        .build();
    let response = agent.get(&url).call().context("failed to reach the release feed")?;

    if !response.content_type().contains("json") {
        bail!("release feed returned unexpected content type '{}'", response.content_type());
    }
    let release: Release = response.into_json().context("failed to decode the release feed")?;
    Ok(release.tag_name)
}

/// Prints the local version and tells the user whether a newer release exists.
pub fn run() -> Result<()> {
    let local = env!("CARGO_PKG_VERSION");
    log_info!("[Version] machine-setup {}", local.bold());

    log_info!("[Version] Checking for the latest release...");
    let latest = latest_release_tag()?;
    match compare(local, &latest)? {
        UpdateStatus::UpToDate => log_info!("[Version] You are running the latest version."),
        UpdateStatus::Newer(version) => {
            log_warn!("[Version] A newer version is available: {}. Consider upgrading.", version.to_string().yellow())
        }
        UpdateStatus::Ahead(version) => {
            log_info!("[Version] Local build is ahead of the latest release ({}).", version)
        }
    }
    Ok(())
}
