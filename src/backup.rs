//! Per-device collection and the two output files.
//!
//! Everything here works against a [`CliSession`] and plain values, so the
//! whole workflow is testable with the scripted session.  The terminal
//! stages that drive it live in [`crate::commands::run`].
//!
//! # Output files
//!
//! | File                      | Content                                     |
//! |---------------------------|---------------------------------------------|
//! | `{label}_{stamp}.conf`    | raw output of the config commands, in order |
//! | `{label}_{stamp}.info`    | header line, then one section per command   |
//!
//! `stamp` is `YYYYMMDD_HHMM`, taken once per run and shared by every device.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};

use crate::{
    config::Config,
    session::{CliSession, SessionError},
};

/// Line framing each command name in the `.info` file.
pub const DIVIDER: &str = "###############################";

// ─── Run stamp ────────────────────────────────────────────────────────────────

/// The single timestamp of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp(NaiveDateTime);

impl RunStamp {
    /// Local wall-clock time, captured once at the start of the run.
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub const fn at(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Filename suffix, e.g. `20240101_1200`.
    pub fn suffix(&self) -> String {
        self.0.format("%Y%m%d_%H%M").to_string()
    }

    /// Render the `.info` header from a strftime template.
    pub fn header(&self, template: &str) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", self.0.format(template))
            .map_err(|_| anyhow::anyhow!("invalid header template {template:?}"))?;
        Ok(out)
    }
}

// ─── Command plan ─────────────────────────────────────────────────────────────

/// The save-config step, when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveStep {
    pub command: String,
    pub timeout: Duration,
}

/// What to send to every device, in order.
#[derive(Debug, Clone)]
pub struct CommandPlan {
    pub save: Option<SaveStep>,
    pub config: Vec<String>,
    pub info: Vec<String>,
    pub markers: Vec<String>,
}

impl CommandPlan {
    pub fn from_config(cfg: &Config, write_first: bool) -> Self {
        Self {
            save: write_first.then(|| SaveStep {
                command: cfg.commands.save.clone(),
                timeout: cfg.ssh.save_timeout(),
            }),
            config: cfg.commands.config.clone(),
            info: cfg.commands.info.clone(),
            markers: cfg.device.effective_markers(),
        }
    }
}

// ─── Filtering and formatting ─────────────────────────────────────────────────

/// `true` when the device did not recognise the command.
///
/// Plain substring match against the known markers.  The wording is
/// vendor- and firmware-dependent, so this is only as good as the marker
/// list.
pub fn is_rejected(output: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| output.contains(m.as_str()))
}

/// One `.info` section: divider, command, divider, blank line, output, two
/// blank lines.
pub fn format_section(command: &str, output: &str) -> String {
    format!("{DIVIDER}\n{command}\n{DIVIDER}\n\n{output}\n\n\n")
}

// ─── Collection ───────────────────────────────────────────────────────────────

/// Result of the optional save step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub accepted: bool,
    /// Last non-empty line the device printed, e.g. `[OK]`.
    pub last_line: String,
}

/// Send the save command with its extended timeout.
pub fn save_config(
    session: &mut dyn CliSession,
    step: &SaveStep,
    markers: &[String],
) -> Result<SaveReport, SessionError> {
    let output = session.send_command_timeout(&step.command, step.timeout)?;
    let last_line = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default()
        .to_string();
    Ok(SaveReport {
        accepted: !is_rejected(&output, markers),
        last_line,
    })
}

/// Concatenate the raw output of every config command.
pub fn collect_config(
    session: &mut dyn CliSession,
    commands: &[String],
) -> Result<String, SessionError> {
    let mut text = String::new();
    for command in commands {
        text.push_str(&session.send_command(command)?);
    }
    Ok(text)
}

/// Info text plus the commands the device rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoCollection {
    pub text: String,
    pub skipped: Vec<String>,
}

/// Run every info command, keeping only the ones the device understood.
///
/// A rejected command is left out of the text and recorded in `skipped`;
/// it does not stop the remaining commands.
pub fn collect_info(
    session: &mut dyn CliSession,
    commands: &[String],
    markers: &[String],
    header: &str,
) -> Result<InfoCollection, SessionError> {
    let mut info = InfoCollection {
        text: format!("{header}\n\n"),
        skipped: Vec::new(),
    };
    for command in commands {
        let output = session.send_command(command)?;
        if is_rejected(&output, markers) {
            tracing::info!(command = command.as_str(), "command not supported, skipped");
            info.skipped.push(command.clone());
        } else {
            info.text.push_str(&format_section(command, &output));
        }
    }
    Ok(info)
}

// ─── Result and files ─────────────────────────────────────────────────────────

/// Everything collected from one device, ready to be written.
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub config_text: String,
    pub info_text: String,
    pub timestamp: String,
}

/// The two file paths for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub conf: PathBuf,
    pub info: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, label: &str, suffix: &str) -> Self {
        let stem = format!("{label}_{suffix}");
        Self {
            conf: dir.join(format!("{stem}.conf")),
            info: dir.join(format!("{stem}.info")),
        }
    }
}

/// Write both files, replacing any previous ones.
///
/// Errors name the file that could not be written.
pub fn write_result(paths: &OutputPaths, result: &BackupResult) -> Result<()> {
    std::fs::write(&paths.conf, &result.config_text)
        .with_context(|| format!("writing {}", paths.conf.display()))?;
    std::fs::write(&paths.info, &result.info_text)
        .with_context(|| format!("writing {}", paths.info.display()))?;
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
