//! The seam between the backup workflow and whatever actually talks SSH.
//!
//! The workflow only ever needs three things from a device connection: open
//! it, send a command and get its text back, close it.  [`Connector`] and
//! [`CliSession`] capture exactly that so the runner can be exercised against
//! the scripted session in [`mock`] without a network.
//!
//! Sessions close themselves on drop, so a command failing halfway through a
//! device still releases the connection.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Failures raised by the SSH collaborator.
///
/// Messages never contain the password.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection to {host}:{port} failed: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("SSH handshake with {host} failed: {reason}")]
    Handshake { host: String, reason: String },

    #[error("authentication as '{user}' on {host} failed")]
    Authentication { host: String, user: String },

    #[error("command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("session already closed")]
    Closed,
}

// ─── Device type ──────────────────────────────────────────────────────────────

/// Vendor/platform profile the session is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    #[serde(rename = "cisco_ios")]
    CiscoIos,
}

impl DeviceType {
    /// Substrings the device prints when it does not understand a command.
    pub const fn rejection_markers(self) -> &'static [&'static str] {
        match self {
            Self::CiscoIos => &["Invalid input detected"],
        }
    }

    /// Sent once after login, before any collected command.
    pub const fn session_preparation(self) -> &'static [&'static str] {
        match self {
            Self::CiscoIos => &["terminal length 0", "terminal width 511"],
        }
    }

    /// Command that persists the running configuration.
    pub const fn save_command(self) -> &'static str {
        match self {
            Self::CiscoIos => "write memory",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CiscoIos => "cisco_ios",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Connection parameters ────────────────────────────────────────────────────

/// Everything needed to open one device session.
///
/// Built fresh for every device from the immutable run inputs; nothing is
/// carried over from the previous device.
#[derive(Debug, Clone)]
pub struct ConnectParams<'a> {
    pub device_type: DeviceType,
    pub host: String,
    pub port: u16,
    pub credentials: &'a Credentials,
    pub timeout: Duration,
}

impl<'a> ConnectParams<'a> {
    /// Split an optional `:port` suffix off `target_host`.
    ///
    /// Anything with more than one colon is treated as a bare IPv6 address
    /// and keeps `default_port`.
    pub fn new(
        device_type: DeviceType,
        target_host: &str,
        default_port: u16,
        credentials: &'a Credentials,
        timeout: Duration,
    ) -> Self {
        let (host, port) = split_host_port(target_host, default_port);
        Self {
            device_type,
            host,
            port,
            credentials,
            timeout,
        }
    }
}

fn split_host_port(target: &str, default_port: u16) -> (String, u16) {
    if target.matches(':').count() == 1 {
        if let Some((host, port)) = target.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                return (host.to_string(), port);
            }
        }
    }
    (target.to_string(), default_port)
}

// ─── Traits ───────────────────────────────────────────────────────────────────

/// An open CLI session on one device.
pub trait CliSession {
    /// Send `command` using the session's default read timeout.
    fn send_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Send `command` with an explicit read timeout.
    fn send_command_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, SessionError>;

    /// Close the session.  Calling it more than once is harmless.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens [`CliSession`]s.
pub trait Connector {
    fn connect(&self, params: &ConnectParams<'_>) -> Result<Box<dyn CliSession>, SessionError>;
}

// ─── Scripted session (tests) ─────────────────────────────────────────────────


// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credentials, Secret};

    fn creds() -> Credentials {
        Credentials::new("admin", Secret::new("cisco")).unwrap()
    }

    #[test]
    fn cisco_ios_has_observed_marker_only() {
        assert_eq!(DeviceType::CiscoIos.rejection_markers(), &[
            "Invalid input detected"
        ]);
    }

    #[test]
    fn cisco_ios_turns_paging_off_first() {
        assert_eq!(
            DeviceType::CiscoIos.session_preparation().first(),
            Some(&"terminal length 0")
        );
    }

    #[test]
    fn device_type_displays_profile_name() {
        assert_eq!(DeviceType::CiscoIos.to_string(), "cisco_ios");
    }

    #[test]
    fn bare_host_uses_default_port() {
        let c = creds();
        let p = ConnectParams::new(
            DeviceType::CiscoIos,
            "10.0.0.1",
            22,
            &c,
            Duration::from_secs(5),
        );
        assert_eq!(p.host, "10.0.0.1");
        assert_eq!(p.port, 22);
    }

    #[test]
    fn host_with_port_suffix_is_split() {
        let c = creds();
        let p = ConnectParams::new(
            DeviceType::CiscoIos,
            "sw1.lab:2222",
            22,
            &c,
            Duration::from_secs(5),
        );
        assert_eq!(p.host, "sw1.lab");
        assert_eq!(p.port, 2222);
    }

    #[test]
    fn ipv6_literal_keeps_default_port() {
        assert_eq!(split_host_port("fe80::1", 22), ("fe80::1".into(), 22));
    }

    #[test]
    fn non_numeric_port_is_left_in_host() {
        assert_eq!(split_host_port("sw1:ssh", 22), ("sw1:ssh".into(), 22));
    }

    #[test]
    fn scripted_session_records_close_on_drop() {
        use mock::ScriptedConnector;

        let conn = ScriptedConnector::new().reply("show version", "IOS 15.2");
        let c = creds();
        let params = ConnectParams::new(
            DeviceType::CiscoIos,
            "10.0.0.1",
            22,
            &c,
            Duration::from_secs(5),
        );
        {
            let mut s = conn.connect(&params).unwrap();
            assert_eq!(s.send_command("show version").unwrap(), "IOS 15.2");
        }
        assert_eq!(conn.journal.borrow().closes, vec!["10.0.0.1"]);
    }
}
