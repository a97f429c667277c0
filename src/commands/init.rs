//! `bulk-backup-ios init` — scaffold a starter config file.

use std::path::Path;

use anyhow::{Result, bail};

use crate::{
    config::{Config, default_header},
    ui::run_stage,
};

/// Write a commented `bulkbackup.toml` to `path`.
///
/// Refuses to touch an existing file.
pub fn run(path: &Path) -> Result<()> {
    let (stage, _) = run_stage("Init", || {
        if path.exists() {
            bail!("{} already exists, refusing to overwrite", path.display());
        }
        std::fs::write(path, render_template())?;
        Ok(())
    });
    let stage = if stage.is_failed() {
        stage
    } else {
        stage.with_detail(path.display().to_string())
    };
    stage.print();
    if stage.is_failed() {
        bail!("init failed");
    }
    Ok(())
}

/// The starter file.  Every value equals the built-in default.
pub fn render_template() -> String {
    let cfg = Config::default();
    let quote_list = |items: &[String]| {
        items
            .iter()
            .map(|c| format!("    \"{c}\","))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let markers = quote_list(&cfg.device.effective_markers());
    let config = quote_list(&cfg.commands.config);
    let info = quote_list(&cfg.commands.info);

    format!(
        r#"# bulk-backup-ios configuration

[ssh]
port              = {port}
timeout_secs      = {timeout}
# `write memory` can be slow on small switches
save_timeout_secs = {save_timeout}

[device]
device_type = "{device_type}"
# Responses containing any of these are left out of the .info file.
rejection_markers = [
{markers}
]

[commands]
save = "{save}"
config = [
{config}
]
info = [
{info}
]

[output]
dir    = "{dir}"
# chrono strftime syntax
header = "{header}"
"#,
        port = cfg.ssh.port,
        timeout = cfg.ssh.timeout_secs,
        save_timeout = cfg.ssh.save_timeout_secs,
        device_type = cfg.device.device_type,
        save = cfg.commands.save,
        dir = cfg.output.dir,
        header = default_header(),
    )
}
