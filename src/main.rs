//! `bulk-backup-ios` — back up Cisco IOS devices over SSH.
//!
//! # Overview
//!
//! Connects to each device of a host list in turn, saves the output of
//! `show startup-config` to `{label}_{YYYYMMDD_HHMM}.conf` and a fixed set
//! of `show` commands to `{label}_{YYYYMMDD_HHMM}.info`.  Commands the
//! device does not recognise are left out of the `.info` file.
//!
//! # Usage
//!
//! ```text
//! bulk-backup-ios                          # hosts from ./BulkBackupIOS.hosts
//! bulk-backup-ios -d site-a.hosts -u admin # prompt for the password only
//! bulk-backup-ios -D 10.0.0.1,core-sw1 -w  # one device, save config first
//! bulk-backup-ios init                     # scaffold bulkbackup.toml
//! bulk-backup-ios --print-config           # show resolved config and exit
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                              |
//! |--------------------------|---------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap               |
//! | [`config`]               | `Config` struct + TOML loader               |
//! | [`hosts`]                | Host list parsing and validation            |
//! | [`credentials`]          | Flags or prompts, zeroed password           |
//! | [`session`]              | Connector / session traits                  |
//! | [`shell`]                | Prompt-driven command exchange              |
//! | [`ssh`]                  | `ssh2` implementation of the session traits |
//! | [`backup`]               | Collection, filtering, output files         |
//! | [`ui`]                   | Spinner, phase lines, summary               |
//! | [`commands::init`]       | `init` subcommand                           |
//! | [`commands::run`]        | Default per-device pipeline                 |

mod backup;
mod cli;
mod commands;
mod config;
mod credentials;
mod hosts;
mod session;
mod shell;
mod ssh;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        // ── init ──────────────────────────────────────────────────────────────
        Some(Subcommand::Init) => {
            commands::init::run(&cli.config)?;
        },

        // ── default pipeline ─────────────────────────────────────────────────
        None => {
            let cfg = config::load_config(&cli.config)?;

            if cli.print_config {
                println!("{cfg:#?}");
                return Ok(());
            }

            commands::run::run(&cli, &cfg)?;
        },
    }

    Ok(())
}

/// Diagnostics go to stderr so stdout stays the progress display.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
