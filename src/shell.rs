//! Prompt-driven command exchange over an interactive CLI shell.
//!
//! IOS serves a single exec request per SSH connection, so a device session
//! is one pty-backed shell: write the command, then read until the device
//! prints its prompt again.  [`PromptShell`] does that over any
//! [`ShellStream`], which lets the tests drive it with in-memory bytes.
//!
//! Output is decoded lossily.  Banners and interface descriptions are
//! often Latin-1, and one stray byte must not cost the whole backup.

use std::{
    borrow::Cow,
    io::{self, Read, Write},
    time::{Duration, Instant},
};

use crate::session::SessionError;

/// Bytes read per `read` call.
const CHUNK: usize = 4096;

/// Only the end of the buffer is inspected for the prompt.
const TAIL: usize = 256;

/// Longest string still accepted as a prompt.
const MAX_PROMPT: usize = 64;

/// A bidirectional byte stream whose reads can be bounded in time.
pub trait ShellStream: Read + Write {
    /// Bound how long one blocking read may wait.
    fn set_read_timeout(&mut self, timeout: Duration);
}

/// An interactive shell that has shown its prompt at least once.
pub struct PromptShell<S> {
    stream: S,
    prompt: String,
    default_timeout: Duration,
}

impl<S: ShellStream> PromptShell<S> {
    /// Wake the shell, learn its prompt, then run `preparation` (paging
    /// off and the like) before any real command.
    pub fn open(
        stream: S,
        default_timeout: Duration,
        preparation: &[&str],
    ) -> Result<Self, SessionError> {
        let mut shell = Self {
            stream,
            prompt: String::new(),
            default_timeout,
        };

        shell.stream.set_read_timeout(default_timeout);
        write_line(&mut shell.stream, "")?;
        let greeting = read_until(&mut shell.stream, "<prompt>", default_timeout, |buf| {
            find_prompt(&tail(buf)).is_some()
        })?;
        shell.prompt = find_prompt(&decode(&greeting))
            .ok_or_else(|| SessionError::Command {
                command: "<prompt>".into(),
                reason: "no CLI prompt from device".into(),
            })?
            .to_string();
        tracing::debug!(prompt = %shell.prompt, "CLI prompt detected");

        for command in preparation {
            shell.send(command, default_timeout)?;
        }
        Ok(shell)
    }

    /// Send one command and return what it printed, without the echoed
    /// command line and the trailing prompt.
    ///
    /// Anything the device printed before echoing `command` (the late
    /// answer to a command that timed out) is dropped.  `timeout` bounds
    /// this command only; the next call sets its own.
    pub fn send(&mut self, command: &str, timeout: Duration) -> Result<String, SessionError> {
        let Self { stream, prompt, .. } = self;
        let prompt: &str = prompt;
        stream.set_read_timeout(timeout);
        write_line(stream, command)?;
        let raw = read_until(stream, command, timeout, |buf| {
            after_echo(buf, command).is_some_and(|rest| last_line(&tail(rest)) == prompt)
        })?;
        let text = decode(after_echo(&raw, command).unwrap_or(&raw));
        Ok(text.strip_suffix(prompt).unwrap_or(&text).to_string())
    }

    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn write_line<S: Write>(stream: &mut S, command: &str) -> Result<(), SessionError> {
    stream
        .write_all(format!("{command}\n").as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| SessionError::Command {
            command: command.to_string(),
            reason: e.to_string(),
        })
}

/// Read until `done` accepts everything received so far.
fn read_until<S: Read>(
    stream: &mut S,
    command: &str,
    timeout: Duration,
    done: impl Fn(&[u8]) -> bool,
) -> Result<Vec<u8>, SessionError> {
    let timed_out = || SessionError::Timeout {
        command: command.to_string(),
        timeout,
    };
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::new();
    let mut chunk = [0u8; CHUNK];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                return Err(SessionError::Command {
                    command: command.to_string(),
                    reason: "device closed the connection".into(),
                });
            },
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                return Err(timed_out());
            },
            Err(e) => {
                return Err(SessionError::Command {
                    command: command.to_string(),
                    reason: e.to_string(),
                });
            },
        };
        buf.extend_from_slice(&chunk[..n]);
        if done(&buf) {
            return Ok(buf);
        }
        if Instant::now() >= deadline {
            return Err(timed_out());
        }
    }
}

/// Device bytes to text: invalid UTF-8 becomes U+FFFD, line endings
/// become `\n`.
pub fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .replace("\r\n", "\n")
        .replace('\r', "")
}

fn last_line(text: &str) -> &str {
    text.rsplit(['\n', '\r']).next().unwrap_or_default().trim()
}

/// The prompt, if `text` currently ends with one (`sw1#`, `sw1>`).
fn find_prompt(text: &str) -> Option<&str> {
    let last = last_line(text);
    let looks_like_prompt = last.len() > 1
        && last.len() <= MAX_PROMPT
        && last.ends_with(['#', '>'])
        && !last.contains(char::is_whitespace);
    looks_like_prompt.then_some(last)
}

/// The last few hundred bytes of `buf` as text.
fn tail(buf: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(&buf[buf.len().saturating_sub(TAIL)..])
}

/// The bytes following the line in which the device echoed `command`.
fn after_echo<'a>(buf: &'a [u8], command: &str) -> Option<&'a [u8]> {
    let needle = command.as_bytes();
    if needle.is_empty() {
        return Some(buf);
    }
    let at = buf.windows(needle.len()).position(|w| w == needle)?;
    let rest = &buf[at + needle.len()..];
    let eol = rest.iter().position(|&b| b == b'\n')?;
    Some(&rest[eol + 1..])
}

// ─── Tests ────────────────────────────────────────────────────────────────────
