//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File          | Invocation                  | Description                   |
//! |---------------|-----------------------------|-------------------------------|
//! | `init.rs`     | `bulk-backup-ios init`      | Scaffold a `bulkbackup.toml`  |
//! | `run.rs`      | `bulk-backup-ios` (default) | Back up every listed device   |

pub mod init;
pub mod run;
