//! `ssh2`-backed [`Connector`].
//!
//! One authenticated session per device carrying one pty shell.  Commands
//! go through [`PromptShell`]; paging is turned off right after login by
//! the device type's preparation commands.

use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use ssh2::{Channel, Session};

use crate::{
    session::{CliSession, ConnectParams, Connector, SessionError},
    shell::{PromptShell, ShellStream},
};

/// Terminal type requested for the shell.
const PTY_TERM: &str = "vt100";

/// Wide enough that IOS never wraps a line.
const PTY_COLS: u32 = 511;
const PTY_ROWS: u32 = 24;

/// Opens password-authenticated SSH sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

impl Connector for SshConnector {
    fn connect(&self, params: &ConnectParams<'_>) -> Result<Box<dyn CliSession>, SessionError> {
        tracing::debug!(
            host = %params.host,
            port = params.port,
            device_type = %params.device_type,
            user = params.credentials.username(),
            "opening SSH session"
        );

        let connect_err = |reason: String| SessionError::Connect {
            host: params.host.clone(),
            port: params.port,
            reason,
        };

        let addr = (params.host.as_str(), params.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("host did not resolve".into()))?;

        let tcp = TcpStream::connect_timeout(&addr, params.timeout)
            .map_err(|e| connect_err(e.to_string()))?;

        let handshake_err = |reason: String| SessionError::Handshake {
            host: params.host.clone(),
            reason,
        };

        let mut session = Session::new().map_err(|e| handshake_err(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(millis(params.timeout));
        session.handshake().map_err(|e| handshake_err(e.to_string()))?;

        let auth_err = || SessionError::Authentication {
            host: params.host.clone(),
            user: params.credentials.username().to_string(),
        };
        session
            .userauth_password(
                params.credentials.username(),
                params.credentials.password().expose(),
            )
            .map_err(|_| auth_err())?;
        if !session.authenticated() {
            return Err(auth_err());
        }

        let mut channel = session
            .channel_session()
            .map_err(|e| handshake_err(format!("opening channel: {e}")))?;
        channel
            .request_pty(PTY_TERM, None, Some((PTY_COLS, PTY_ROWS, 0, 0)))
            .map_err(|e| handshake_err(format!("requesting pty: {e}")))?;
        channel
            .shell()
            .map_err(|e| handshake_err(format!("starting shell: {e}")))?;

        let shell = PromptShell::open(
            SshChannel { session, channel },
            params.timeout,
            params.device_type.session_preparation(),
        )?;

        tracing::info!(host = %params.host, prompt = shell.prompt(), "SSH session established");
        Ok(Box::new(SshSession {
            host: params.host.clone(),
            shell: Some(shell),
        }))
    }
}

/// The shell channel together with the session that owns its timeout.
pub struct SshChannel {
    session: Session,
    channel: Channel,
}

impl Read for SshChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for SshChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

impl ShellStream for SshChannel {
    fn set_read_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(millis(timeout));
    }
}

/// One device session.  Disconnects on drop.
pub struct SshSession {
    host: String,
    shell: Option<PromptShell<SshChannel>>,
}

impl SshSession {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<String, SessionError> {
        let shell = self.shell.as_mut().ok_or(SessionError::Closed)?;
        let timeout = timeout.unwrap_or_else(|| shell.default_timeout());
        let output = shell.send(command, timeout)?;
        tracing::debug!(host = %self.host, command, bytes = output.len(), "command complete");
        Ok(output)
    }
}

impl CliSession for SshSession {
    fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        self.run(command, None)
    }

    fn send_command_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        self.run(command, Some(timeout))
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if let Some(shell) = self.shell.take() {
            let SshChannel {
                session,
                mut channel,
            } = shell.into_inner();
            if let Err(e) = channel.close() {
                tracing::debug!(host = %self.host, error = %e, "closing shell channel failed");
            }
            session
                .disconnect(None, "backup complete", None)
                .map_err(|e| SessionError::Command {
                    command: "disconnect".into(),
                    reason: e.to_string(),
                })?;
            tracing::debug!(host = %self.host, "SSH session closed");
        }
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(host = %self.host, error = %e, "closing SSH session failed");
        }
    }
}

/// libssh2 takes its timeout as `u32` milliseconds.
fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_converts_and_saturates() {
        assert_eq!(millis(Duration::from_secs(30)), 30_000);
        assert_eq!(millis(Duration::from_secs(u64::MAX / 1000)), u32::MAX);
    }

    #[test]
    fn ssh_timeouts_surface_as_timed_out_reads() {
        let e = io::Error::from(ssh2::Error::new(ssh2::ErrorCode::Session(-9), "timed out"));
        assert_eq!(e.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn connect_to_closed_port_reports_host() {
        use crate::{
            credentials::{Credentials, Secret},
            session::DeviceType,
        };

        // Port 9 on loopback is essentially never listening.
        let creds = Credentials::new("admin", Secret::new("pw")).unwrap();
        let params = ConnectParams::new(
            DeviceType::CiscoIos,
            "127.0.0.1:9",
            22,
            &creds,
            Duration::from_secs(2),
        );
        match SshConnector.connect(&params) {
            Err(SessionError::Connect { host, port, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 9);
            },
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("nothing should be listening on 127.0.0.1:9"),
        }
    }
}
