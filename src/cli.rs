//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Host list used when neither `--device`, `--devices` nor a positional path
/// is given.
pub const DEFAULT_HOSTS_FILE: &str = "BulkBackupIOS.hosts";

/// Top-level CLI arguments, shared across every subcommand.
#[derive(Parser, Debug)]
#[command(
    name    = "bulk-backup-ios",
    about   = "Back up Cisco IOS startup configs and device info over SSH",
    version,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Host list file, one `host[,label]` per line.
    ///
    /// Same as `--devices`; the flag wins when both are given.
    #[arg(value_name = "HOSTS_FILE")]
    pub hosts_file: Option<PathBuf>,

    /// Host list file, one `host[,label]` per line.
    ///
    /// The label names the output files and defaults to the host.  Falls
    /// back to `BulkBackupIOS.hosts` in the current directory.
    #[arg(short = 'd', long = "devices", value_name = "PATH")]
    pub devices: Option<PathBuf>,

    /// One or more devices given directly as `host[,label]`.
    ///
    /// Overrides any host list file.
    #[arg(short = 'D', long = "device", value_name = "HOST", num_args = 1..)]
    pub device: Vec<String>,

    /// Login user.  Prompted for when omitted.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Login password.  Prompted for (without echo) when omitted.
    #[arg(short, long)]
    pub password: Option<String>,

    /// Save the running configuration (`write memory`) before collecting.
    ///
    /// A failed save is reported but does not stop the backup.
    #[arg(short, long)]
    pub write: bool,

    /// Path to the configuration file.
    #[arg(short, long, default_value = "bulkbackup.toml")]
    pub config: PathBuf,

    /// Directory for the `.conf` / `.info` files; overrides `[output].dir`.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the resolved configuration and exit without connecting.
    #[arg(long)]
    pub print_config: bool,

    /// More log output on stderr (`-v` info, `-vv` debug).  `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.  Omit to back up the devices.
    #[command(subcommand)]
    pub command: Option<Subcommand>,
}

impl Cli {
    /// The host list file to read when no `--device` was given.
    pub fn hosts_path(&self) -> PathBuf {
        self.devices
            .clone()
            .or_else(|| self.hosts_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_FILE))
    }
}

/// Explicit subcommands.  Running with no subcommand backs up the devices.
#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Subcommand {
    /// Scaffold a `bulkbackup.toml` in the current directory.
    ///
    /// The generated file lists every setting with its default value.
    /// Exits with an error if the file already exists to avoid accidental
    /// overwrites.
    Init,
}
