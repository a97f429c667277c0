//! Default pipeline — runs when no subcommand is given.
//!
//! # Phases per device (in order)
//!
//! | # | Phase          | Flag      | On failure                              |
//! |---|----------------|-----------|-----------------------------------------|
//! | 1 | Connect        | —         | device failed, next device              |
//! | 2 | Save config    | `--write` | warning only, collection continues      |
//! | 3 | Collect config | —         | device failed, connection closed        |
//! | 4 | Collect info   | —         | device failed, connection closed        |
//! | 5 | Write files    | —         | device failed, error names the file     |
//!
//! Devices are handled strictly one after another.  One device failing never
//! stops the run; the summary at the end lists every failure and the process
//! exits non-zero if there was any.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use console::Term;

use crate::{
    backup::{
        BackupResult, CommandPlan, OutputPaths, RunStamp, collect_config, collect_info,
        save_config, write_result,
    },
    cli::Cli,
    config::Config,
    credentials::{self, Credentials},
    hosts::{self, DeviceTarget, HostList, Position},
    session::{CliSession, ConnectParams, Connector},
    ssh::SshConnector,
    ui::{
        DeviceOutcome, StageOutcome, device_banner, print_rejected, print_summary, run_stage,
        skipped_stage,
    },
};

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Back up every selected device.
pub fn run(cli: &Cli, cfg: &Config) -> Result<()> {
    let hosts = select_hosts(cli)?;
    print_rejected(&hosts.rejected);
    if hosts.targets.is_empty() {
        bail!("no devices to back up");
    }

    let creds = credentials::resolve(cli.user.clone(), cli.password.clone(), &Term::stdout())?;

    let ctx = RunContext {
        plan: CommandPlan::from_config(cfg, cli.write),
        stamp: RunStamp::now(),
        header_template: cfg.output.header.clone(),
        output_dir: cli
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&cfg.output.dir)),
        port: cfg.ssh.port,
        timeout: cfg.ssh.timeout(),
        device_type: cfg.device.device_type,
    };

    let outcomes = run_all(&SshConnector, &ctx, &creds, &hosts.targets);
    print_summary(&outcomes);

    let failed = outcomes.iter().filter(|o| o.failed()).count();
    if failed > 0 {
        bail!("{failed} of {} device(s) failed", outcomes.len());
    }
    Ok(())
}

/// `--device` values win; otherwise the host list file.
pub fn select_hosts(cli: &Cli) -> Result<HostList> {
    if cli.device.is_empty() {
        hosts::load_hosts(&cli.hosts_path())
    } else {
        Ok(hosts::parse_entries(
            cli.device.iter().map(String::as_str),
            Position::Entry,
        ))
    }
}

// ─── Run context ──────────────────────────────────────────────────────────────

/// Read-only inputs shared by every device of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub plan: CommandPlan,
    pub stamp: RunStamp,
    pub header_template: String,
    pub output_dir: PathBuf,
    pub port: u16,
    pub timeout: std::time::Duration,
    pub device_type: crate::session::DeviceType,
}

/// Back up each target in order and return one outcome per target.
pub fn run_all(
    connector: &dyn Connector,
    ctx: &RunContext,
    creds: &Credentials,
    targets: &[DeviceTarget],
) -> Vec<DeviceOutcome> {
    let total = targets.len();
    targets
        .iter()
        .enumerate()
        .map(|(i, target)| {
            device_banner(target, i + 1, total);
            backup_device(connector, ctx, creds, target)
        })
        .collect()
}

// ─── One device ───────────────────────────────────────────────────────────────

/// Run every phase against one device.
///
/// The session is owned by this function and dropped (closing the
/// connection) on every return path.
pub fn backup_device(
    connector: &dyn Connector,
    ctx: &RunContext,
    creds: &Credentials,
    target: &DeviceTarget,
) -> DeviceOutcome {
    let mut outcome = DeviceOutcome::new(target.clone());
    let span = tracing::info_span!("device", label = %target.label, host = %target.host);
    let _guard = span.enter();

    // 1. Connect
    let params = ConnectParams::new(ctx.device_type, &target.host, ctx.port, creds, ctx.timeout);
    let (stage, session) = run_stage("Connect", || Ok(connector.connect(&params)?));
    if outcome.record(stage) {
        return outcome;
    }
    let Some(mut session) = session else {
        return outcome;
    };

    let collected = collect(session.as_mut(), ctx, &mut outcome);
    if let Err(e) = session.close() {
        tracing::warn!(error = %e, "closing session failed");
    }
    drop(session);

    let Some(result) = collected else {
        return outcome;
    };
    if !outcome.skipped_commands.is_empty() {
        tracing::info!(commands = ?outcome.skipped_commands, "left out of the info file");
    }

    // 5. Write files
    let paths = OutputPaths::new(&ctx.output_dir, &target.label, &result.timestamp);
    let (stage, written) = run_stage("Write files", || {
        write_result(&paths, &result)?;
        Ok(vec![paths.conf.clone(), paths.info.clone()])
    });
    let stage = match &written {
        Some(files) => stage.with_detail(file_names(files)),
        None => stage,
    };
    outcome.record(stage);
    outcome.files = written.unwrap_or_default();
    tracing::info!(files = outcome.files.len(), "device done");
    outcome
}

/// Phases 2–4.  Returns `None` once a fatal phase has failed.
fn collect(
    session: &mut dyn CliSession,
    ctx: &RunContext,
    outcome: &mut DeviceOutcome,
) -> Option<BackupResult> {
    let plan = &ctx.plan;

    // 2. Save config (optional, non-fatal)
    let save = match &plan.save {
        Some(step) => {
            let (stage, report) =
                run_stage("Save config", || Ok(save_config(session, step, &plan.markers)?));
            match report {
                Some(r) if r.accepted => stage.with_detail(r.last_line),
                Some(r) => StageOutcome::failed(
                    "Save config",
                    format!("device rejected '{}': {}", step.command, r.last_line),
                )
                .non_fatal(),
                None => stage.non_fatal(),
            }
        },
        None => skipped_stage("Save config"),
    };
    outcome.record(save);

    // 3. Collect config
    let (stage, config_text) =
        run_stage("Collect config", || Ok(collect_config(session, &plan.config)?));
    if outcome.record(stage) {
        return None;
    }

    // 4. Collect info
    let (stage, info) = run_stage("Collect info", || {
        let header = ctx.stamp.header(&ctx.header_template)?;
        Ok(collect_info(session, &plan.info, &plan.markers, &header)?)
    });
    let stage = match &info {
        Some(info) if !info.skipped.is_empty() => stage.with_detail(format!(
            "{} of {} command(s) not supported",
            info.skipped.len(),
            plan.info.len()
        )),
        _ => stage,
    };
    if outcome.record(stage) {
        return None;
    }
    let info = info?;
    outcome.skipped_commands = info.skipped;

    Some(BackupResult {
        config_text: config_text?,
        info_text: info.text,
        timestamp: ctx.stamp.suffix(),
    })
}

fn file_names(files: &[PathBuf]) -> String {
    files
        .iter()
        .filter_map(|p| Path::file_name(p))
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Tests ────────────────────────────────────────────────────────────────────
