//! Host list parsing.
//!
//! One device per line, `host[,label]`.  The label becomes the filename
//! prefix and falls back to the host when absent.  Lines are validated
//! eagerly: a bad line is reported with its line number and skipped, it
//! never takes the run down.
//!
//! ```text
//! # core switches
//! 10.0.0.1,core-sw1
//! 10.0.0.2,core-sw2
//! edge-rtr.lab:2222
//! ```

use std::{fmt, path::Path};

use anyhow::{Context, Result};

/// One device to back up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    /// Address handed to the SSH collaborator, optionally `host:port`.
    pub host: String,
    /// Filename prefix for this device's output files.
    pub label: String,
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host == self.label {
            f.write_str(&self.host)
        } else {
            write!(f, "{} ({})", self.label, self.host)
        }
    }
}

/// Where an entry came from, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// A line of a host-list file.
    Line(usize),
    /// A `--device` value on the command line.
    Entry(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(n) => write!(f, "line {n}"),
            Self::Entry(n) => write!(f, "--device entry {n}"),
        }
    }
}

/// Why a host-list entry was rejected.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HostsError {
    #[error("{at}: missing host field")]
    MissingHost { at: Position },

    #[error("{at}: label {label:?} cannot be used as a file name")]
    BadLabel { at: Position, label: String },
}

/// Result of reading a whole host list.
#[derive(Debug, Default)]
pub struct HostList {
    pub targets: Vec<DeviceTarget>,
    pub rejected: Vec<HostsError>,
}

/// Parse a single entry.
///
/// Returns `Ok(None)` for blank lines and `#` comments.  `at` is only used
/// in error messages.
pub fn parse_entry(raw: &str, at: Position) -> Result<Option<DeviceTarget>, HostsError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return Ok(None);
    }

    let mut fields = raw.split(',').map(str::trim);
    let host = fields.next().unwrap_or_default();
    if host.is_empty() {
        return Err(HostsError::MissingHost { at });
    }

    let label = match fields.next() {
        Some(l) if !l.is_empty() => l,
        _ => host,
    };
    if !is_safe_label(label) {
        return Err(HostsError::BadLabel {
            at,
            label: label.to_string(),
        });
    }

    Ok(Some(DeviceTarget {
        host: host.to_string(),
        label: label.to_string(),
    }))
}

/// Labels end up as file names in the output directory; keep them there.
fn is_safe_label(label: &str) -> bool {
    !label.contains(['/', '\\']) && !label.contains("..")
}

/// Parse every entry, collecting good targets and rejected entries
/// separately.  `position` turns a 1-based index into an error location.
pub fn parse_entries<'a>(
    entries: impl IntoIterator<Item = &'a str>,
    position: fn(usize) -> Position,
) -> HostList {
    let mut list = HostList::default();
    for (idx, raw) in entries.into_iter().enumerate() {
        match parse_entry(raw, position(idx + 1)) {
            Ok(Some(target)) => list.targets.push(target),
            Ok(None) => {},
            Err(e) => list.rejected.push(e),
        }
    }
    list
}

/// Read and parse a host-list file.
pub fn load_hosts(path: &Path) -> Result<HostList> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading host list {}", path.display()))?;
    Ok(parse_entries(text.lines(), Position::Line))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::{Position::Line, *};

    fn target(host: &str, label: &str) -> DeviceTarget {
        DeviceTarget {
            host: host.into(),
            label: label.into(),
        }
    }

    #[test]
    fn label_is_second_field() {
        assert_eq!(
            parse_entry("10.0.0.1,core-sw1", Line(1)).unwrap(),
            Some(target("10.0.0.1", "core-sw1"))
        );
    }

    #[test]
    fn label_defaults_to_host() {
        assert_eq!(
            parse_entry("10.0.0.1", Line(1)).unwrap(),
            Some(target("10.0.0.1", "10.0.0.1"))
        );
    }

    #[test]
    fn empty_label_defaults_to_host() {
        assert_eq!(
            parse_entry("10.0.0.1,", Line(1)).unwrap(),
            Some(target("10.0.0.1", "10.0.0.1"))
        );
    }

    #[test]
    fn whitespace_is_stripped_around_line_and_fields() {
        assert_eq!(
            parse_entry("   sw2.lab ,  access-2  \r", Line(1)).unwrap(),
            Some(target("sw2.lab", "access-2"))
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(
            parse_entry("10.0.0.9,dist-1,building-b", Line(1)).unwrap(),
            Some(target("10.0.0.9", "dist-1"))
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_entry("", Line(1)).unwrap(), None);
        assert_eq!(parse_entry("   ", Line(2)).unwrap(), None);
        assert_eq!(parse_entry("# lab gear", Line(3)).unwrap(), None);
    }

    #[test]
    fn missing_host_is_reported_with_line_number() {
        assert_eq!(
            parse_entry(",orphan-label", Line(7)),
            Err(HostsError::MissingHost { at: Line(7) })
        );
    }

    #[test]
    fn path_like_labels_are_rejected() {
        assert!(matches!(
            parse_entry("10.0.0.1,../etc/passwd", Line(2)),
            Err(HostsError::BadLabel { at: Line(2), .. })
        ));
        assert!(matches!(
            parse_entry("10.0.0.1,a\\b", Line(3)),
            Err(HostsError::BadLabel { .. })
        ));
    }

    #[test]
    fn host_with_port_keeps_port_in_host_and_label() {
        assert_eq!(
            parse_entry("edge.lab:2222", Line(1)).unwrap(),
            Some(target("edge.lab:2222", "edge.lab:2222"))
        );
    }

    #[test]
    fn parse_entries_separates_good_and_bad_lines() {
        let list = parse_entries(["10.0.0.1,a", "", ",b", "10.0.0.2"], Line);
        assert_eq!(list.targets, vec![
            target("10.0.0.1", "a"),
            target("10.0.0.2", "10.0.0.2")
        ]);
        assert_eq!(list.rejected, vec![HostsError::MissingHost { at: Line(3) }]);
    }

    #[test]
    fn parse_entries_preserves_order() {
        let list = parse_entries(["c", "a", "b"], Line);
        let hosts: Vec<_> = list.targets.iter().map(|t| t.host.as_str()).collect();
        assert_eq!(hosts, ["c", "a", "b"]);
    }

    #[test]
    fn load_hosts_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.hosts");
        std::fs::write(&path, "# site A\n10.0.0.1,core-sw1\n10.0.0.2\n").unwrap();

        let list = load_hosts(&path).unwrap();
        assert_eq!(list.targets, vec![
            target("10.0.0.1", "core-sw1"),
            target("10.0.0.2", "10.0.0.2")
        ]);
        assert!(list.rejected.is_empty());
    }

    #[test]
    fn load_hosts_errors_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_hosts(&dir.path().join("nope.hosts")).is_err());
    }

    #[test]
    fn device_values_are_reported_as_entries_not_lines() {
        let list = parse_entries(["10.0.0.1,core", ",bad"], Position::Entry);
        let msgs: Vec<String> = list.rejected.iter().map(ToString::to_string).collect();
        assert_eq!(msgs, ["--device entry 2: missing host field"]);
    }

    #[test]
    fn file_errors_name_the_line() {
        assert_eq!(
            HostsError::BadLabel {
                at: Line(4),
                label: "../x".into()
            }
            .to_string(),
            "line 4: label \"../x\" cannot be used as a file name"
        );
    }

    #[test]
    fn display_shows_label_and_host() {
        assert_eq!(target("10.0.0.1", "core").to_string(), "core (10.0.0.1)");
        assert_eq!(target("sw", "sw").to_string(), "sw");
    }
}
