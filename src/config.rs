//! Configuration types and loading logic.
//!
//! `Config` is a direct 1-to-1 mapping of `bulkbackup.toml`.  Every field has
//! a `Default` impl so the file is entirely optional — running the tool
//! without any config file backs up with the stock Cisco IOS command set and
//! writes into the current directory.
//!
//! # File format
//!
//! ```toml
//! [ssh]
//! port              = 22
//! timeout_secs      = 30
//! save_timeout_secs = 120   # `write memory` can be slow on small boxes
//!
//! [device]
//! device_type       = "cisco_ios"
//! rejection_markers = ["Invalid input detected"]
//!
//! [commands]
//! save   = "write memory"
//! config = ["show startup-config"]
//! info   = ["show version", "show vlan"]
//!
//! [output]
//! dir    = "."
//! header = "Información recopilada el %d/%m/%Y, a las %H:%M:%S"
//! ```

use std::{fmt::Write as _, path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::session::DeviceType;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Semantic problems in an otherwise well-formed config file.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("[output].header is not a valid strftime template: {0:?}")]
    BadHeader(String),

    #[error("[commands].{0} must list at least one command")]
    EmptyCommands(&'static str),

    #[error("[ssh].{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root configuration object, deserialised from `bulkbackup.toml`.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Transport tunables handed to the SSH collaborator.
    #[serde(default)]
    pub ssh: SshConfig,

    /// Vendor profile and response filtering.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Which commands run, in which order.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Where files land and how the info header reads.
    #[serde(default)]
    pub output: OutputConfig,
}

// ─── [ssh] ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SshConfig {
    /// Port used when a host entry carries no explicit `:port` suffix.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect and per-command read timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Read timeout for the save-config command only.
    ///
    /// Writing NVRAM on resource-constrained switches regularly takes longer
    /// than an ordinary `show` command.
    #[serde(default = "default_save_timeout_secs")]
    pub save_timeout_secs: u64,
}

impl SshConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            save_timeout_secs: default_save_timeout_secs(),
        }
    }
}

// ─── [device] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DeviceConfig {
    /// Vendor profile.  Only `cisco_ios` exists today.
    #[serde(default)]
    pub device_type: DeviceType,

    /// Substrings that mark a command as "not recognised by this device".
    ///
    /// Empty means "use the device type's built-in markers".  The exact
    /// wording varies across platforms and firmware, so add markers here
    /// only after seeing them in real output.
    #[serde(default)]
    pub rejection_markers: Vec<String>,
}

impl DeviceConfig {
    /// Markers actually used for filtering.
    pub fn effective_markers(&self) -> Vec<String> {
        if self.rejection_markers.is_empty() {
            self.device_type
                .rejection_markers()
                .iter()
                .map(|m| (*m).to_string())
                .collect()
        } else {
            self.rejection_markers.clone()
        }
    }
}

// ─── [commands] ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CommandsConfig {
    /// Issued before collection when `--write` is passed.
    #[serde(default = "default_save_command")]
    pub save: String,

    /// Output is concatenated verbatim into the `.conf` file.
    #[serde(default = "default_config_commands")]
    pub config: Vec<String>,

    /// Each accepted response becomes one section of the `.info` file.
    #[serde(default = "default_info_commands")]
    pub info: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            save: default_save_command(),
            config: default_config_commands(),
            info: default_info_commands(),
        }
    }
}

// ─── [output] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory the `.conf` / `.info` files are written into.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// chrono strftime template for the first line of every `.info` file.
    #[serde(default = "default_header")]
    pub header: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            header: default_header(),
        }
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

// These free functions are required by `#[serde(default = "…")]` — serde
// cannot call `Default::default()` for individual fields, only for whole
// structs.

pub const fn default_port() -> u16 {
    22
}

pub const fn default_timeout_secs() -> u64 {
    30
}

pub const fn default_save_timeout_secs() -> u64 {
    120
}

pub fn default_save_command() -> String {
    DeviceType::default().save_command().into()
}

pub fn default_config_commands() -> Vec<String> {
    vec!["show startup-config".into()]
}

pub fn default_info_commands() -> Vec<String> {
    [
        "show version",
        "show switch",
        "show vlan",
        "show interface status",
        "show ip interface brief",
        "show cdp neighbor",
        "show cdp neighbor detail",
        "show license all",
        "show ap summary",
        "show ap tag summary",
        "show ap uptime",
        "show redundancy",
        "show chassis",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_output_dir() -> String {
    ".".into()
}

pub fn default_header() -> String {
    "Información recopilada el %d/%m/%Y, a las %H:%M:%S".into()
}

// ─── Validation ───────────────────────────────────────────────────────────────

impl Config {
    /// Reject configs that parse but cannot produce a sensible run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commands.config.is_empty() {
            return Err(ConfigError::EmptyCommands("config"));
        }
        if self.ssh.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("timeout_secs"));
        }
        if self.ssh.save_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("save_timeout_secs"));
        }
        // chrono reports unknown specifiers as a fmt::Error at render time;
        // render once against a fixed instant to surface that up front.
        let probe = NaiveDateTime::default();
        let mut sink = String::new();
        write!(sink, "{}", probe.format(&self.output.header))
            .map_err(|_| ConfigError::BadHeader(self.output.header.clone()))?;
        Ok(())
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read and parse a `Config` from `path`.
///
/// Returns `Ok(None)` when the file does not exist so the caller can decide
/// where to fall back to.  Returns an error if the file exists but cannot be
/// read, is not valid TOML, or fails [`Config::validate`].
pub fn parse_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let cfg: Config =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(Some(cfg))
}

/// Per-user fallback config: `~/.config/bulk-backup-ios/config.toml`.
pub fn global_config_path() -> Option<std::path::PathBuf> {
    dirs_next::config_dir().map(|d| d.join("bulk-backup-ios").join("config.toml"))
}

/// Load the config from `local_path`, falling back to the per-user file and
/// finally to built-in defaults.
///
/// Only the first file found is used; the two are not merged.
pub fn load_config(local_path: &Path) -> Result<Config> {
    if let Some(cfg) = parse_config(local_path)? {
        tracing::debug!(path = %local_path.display(), "loaded config");
        return Ok(cfg);
    }

    if let Some(global) = global_config_path() {
        if let Some(cfg) = parse_config(&global)? {
            tracing::debug!(path = %global.display(), "loaded per-user config");
            return Ok(cfg);
        }
    }

    tracing::warn!(
        path = %local_path.display(),
        "config file not found, using defaults (run 'bulk-backup-ios init' to create one)"
    );
    Ok(Config::default())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
