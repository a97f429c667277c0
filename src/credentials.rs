//! Login credentials shared by every device in a run.
//!
//! Taken from `--user` / `--password` when given, otherwise prompted for on
//! the terminal (the password without echo).  They live in memory only; the
//! password buffer is wiped when the value is dropped.

use std::fmt;

use anyhow::{Context, Result};
use console::Term;
use zeroize::Zeroize;

/// Errors from credential validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("username cannot be empty")]
    EmptyUsername,
}

/// A password that zeroes its buffer on drop and never prints itself.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Use sparingly, only to hand the value to the transport.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Username plus password.
#[derive(Clone, Debug)]
pub struct Credentials {
    username: String,
    password: Secret,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Secret) -> Result<Self, CredentialError> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub const fn password(&self) -> &Secret {
        &self.password
    }
}

/// Where missing credentials come from.
///
/// The terminal in production; a canned answer source in tests.
pub trait Prompt {
    fn read_line(&self, prompt: &str) -> Result<String>;
    fn read_secret(&self, prompt: &str) -> Result<String>;
}

impl Prompt for Term {
    fn read_line(&self, prompt: &str) -> Result<String> {
        self.write_str(prompt).context("writing prompt")?;
        Term::read_line(self).context("reading username")
    }

    fn read_secret(&self, prompt: &str) -> Result<String> {
        self.write_str(prompt).context("writing prompt")?;
        self.read_secure_line().context("reading password")
    }
}

/// Fill in whatever the command line did not provide.
pub fn resolve(
    user: Option<String>,
    password: Option<String>,
    prompt: &dyn Prompt,
) -> Result<Credentials> {
    let username = match user {
        Some(u) => u,
        None => prompt.read_line("User: ")?,
    };
    let password = match password {
        Some(p) => Secret::new(p),
        None => Secret::new(prompt.read_secret("Password: ")?),
    };
    Ok(Credentials::new(username, password)?)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
