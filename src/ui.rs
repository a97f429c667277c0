//! Terminal UI: spinners, per-phase status lines and the run summary.
//!
//! # Design goals
//!
//! - **Clean by default.** While a phase is running the user sees only a spinner and a short label.
//! - **Informative on failure.** A failed phase prints the full error chain right under its ✗ line,
//!   so the operator knows which device and which step broke without digging through logs.
//! - **Data first.** [`StageOutcome`] and [`DeviceOutcome`] are plain values; printing is a
//!   separate step so the runner can be tested without a terminal.
//!
//! # Typical usage
//!
//! ```ignore
//! use crate::ui::run_stage;
//!
//! let (outcome, session) = run_stage("Connect", || Ok(connector.connect(&params)?));
//! outcome.print();
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::hosts::{DeviceTarget, HostsError};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames — same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Green ✓  — printed when a phase succeeds.
fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
/// Red ✗    — printed when a phase fails.
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
/// Yellow !  — non-fatal problems.
fn icon_warn() -> console::StyledObject<&'static str> {
    style("!").yellow().bold()
}
/// Dim –    — phases that were not requested.
fn icon_skip() -> console::StyledObject<&'static str> {
    style("–").dim()
}
/// Cyan ✓   — printed next to the final success summary.
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}

// ─── Stage result ─────────────────────────────────────────────────────────────

/// How a single phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    Skipped,
    /// Failed, but the device carries on.
    Warning,
    Failed,
}

/// The outcome of one phase on one device.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Human-readable phase label, e.g. `"Collect info"`.
    pub label: String,
    pub status: StageStatus,
    /// Extra context shown after the label, e.g. skipped commands.
    pub detail: Option<String>,
    /// Full error chain when the phase failed.
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn ok(label: &str) -> Self {
        Self {
            label: label.into(),
            status: StageStatus::Ok,
            detail: None,
            error: None,
        }
    }

    pub fn failed(label: &str, error: String) -> Self {
        Self {
            label: label.into(),
            status: StageStatus::Failed,
            detail: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Downgrade a failure to a warning.
    #[must_use]
    pub fn non_fatal(mut self) -> Self {
        if self.status == StageStatus::Failed {
            self.status = StageStatus::Warning;
        }
        self
    }

    /// Print the one-line summary (icon + label) to stdout, and the error
    /// underneath it when there is one.
    pub fn print(&self) {
        let icon = match self.status {
            StageStatus::Ok => icon_ok(),
            StageStatus::Skipped => icon_skip(),
            StageStatus::Warning => icon_warn(),
            StageStatus::Failed => icon_err(),
        };
        match &self.detail {
            Some(detail) => println!(
                "    {}  {}  {}",
                icon,
                style(&self.label).bold(),
                style(detail).dim()
            ),
            None => println!("    {}  {}", icon, style(&self.label).bold()),
        }

        if let Some(ref msg) = self.error {
            eprintln!("       {} {}", style("Error:").red().bold(), msg);
        }
    }

    /// Returns `true` if the phase failed fatally.
    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }

    pub fn is_warning(&self) -> bool {
        self.status == StageStatus::Warning
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
///
/// The spinner ticks at ~80 ms and is cleared by the caller with
/// [`ProgressBar::finish_and_clear`].  indicatif hides it when stderr is not
/// a terminal.
fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(st) = ProgressStyle::with_template("    {spinner:.cyan}  {msg}") {
        pb.set_style(st.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── High-level stage runner ──────────────────────────────────────────────────

/// Run one phase behind a spinner.
///
/// Returns the outcome together with the closure's value on success.  The
/// spinner is cleared before returning so the caller can print a clean,
/// static status line.
pub fn run_stage<T>(label: &str, work: impl FnOnce() -> Result<T>) -> (StageOutcome, Option<T>) {
    let spinner = make_spinner(label);
    let result = work();
    spinner.finish_and_clear();

    match result {
        Ok(value) => (StageOutcome::ok(label), Some(value)),
        Err(e) => {
            tracing::debug!(stage = label, error = %format!("{e:#}"), "stage failed");
            (StageOutcome::failed(label, format!("{e:#}")), None)
        },
    }
}

/// A phase that was not requested for this run (e.g. saving without
/// `--write`).  Never counts as a failure.
pub fn skipped_stage(label: &str) -> StageOutcome {
    StageOutcome {
        label: label.into(),
        status: StageStatus::Skipped,
        detail: None,
        error: None,
    }
}

// ─── Devices ──────────────────────────────────────────────────────────────────

/// Everything that happened to one device.
#[derive(Debug, Clone)]
pub struct DeviceOutcome {
    pub target: DeviceTarget,
    pub stages: Vec<StageOutcome>,
    /// Files written for this device (empty unless the write phase ran).
    pub files: Vec<PathBuf>,
    /// Info commands the device did not recognise.
    pub skipped_commands: Vec<String>,
}

impl DeviceOutcome {
    pub const fn new(target: DeviceTarget) -> Self {
        Self {
            target,
            stages: Vec::new(),
            files: Vec::new(),
            skipped_commands: Vec::new(),
        }
    }

    /// Print `stage` and keep it.  Returns whether it failed fatally.
    pub fn record(&mut self, stage: StageOutcome) -> bool {
        stage.print();
        let failed = stage.is_failed();
        self.stages.push(stage);
        failed
    }

    pub fn failed(&self) -> bool {
        self.stages.iter().any(StageOutcome::is_failed)
    }

    pub fn has_warnings(&self) -> bool {
        self.stages.iter().any(StageOutcome::is_warning)
    }
}

/// Heading printed before a device's phases.
pub fn device_banner(target: &DeviceTarget, index: usize, total: usize) {
    println!();
    println!(
        "  {} {}",
        style(format!("[{index}/{total}]")).dim(),
        style(target).cyan().bold()
    );
}

/// Report host-list entries that were skipped.
pub fn print_rejected(rejected: &[HostsError]) {
    for e in rejected {
        eprintln!("  {}  {} {}", icon_warn(), style("Skipping").yellow(), e);
    }
}

// ─── Summary banner ───────────────────────────────────────────────────────────

/// Print the final summary after all devices have run.
///
/// Shows a success banner when every device was backed up, or a failure
/// banner listing the devices that were not.
pub fn print_summary(outcomes: &[DeviceOutcome]) {
    let failed: Vec<&DeviceOutcome> = outcomes.iter().filter(|o| o.failed()).collect();
    let warned: Vec<&DeviceOutcome> = outcomes
        .iter()
        .filter(|o| !o.failed() && o.has_warnings())
        .collect();
    println!();
    if failed.is_empty() {
        println!(
            "  {} {}",
            icon_done(),
            style(format!("{} device(s) backed up.", outcomes.len()))
                .cyan()
                .bold()
        );
    } else {
        eprintln!(
            "  {}  {}",
            icon_err(),
            style(format!(
                "{} of {} device(s) failed.",
                failed.len(),
                outcomes.len()
            ))
            .red()
            .bold()
        );
        for o in &failed {
            eprintln!("    {} {}", icon_err(), style(&o.target).red());
        }
    }
    for o in &warned {
        println!("    {} {} (with warnings)", icon_warn(), style(&o.target).yellow());
    }
    println!();
}

// ─── Tests ────────────────────────────────────────────────────────────────────
