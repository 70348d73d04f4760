//! Configuration Module
//!
//! Reads the settings the `ses` binary needs from environment variables. The
//! library itself never touches the environment: credentials are always passed
//! in by the embedding application.

use crate::signer::{Credentials, DEFAULT_HOST};
use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

const MAX_TIMEOUT_SECS: u64 = 300;

pub struct Config {
    pub access_key: String,
    pub secret_key: String,
    pub host: String,
    pub timeout: Duration,
}

impl Config {
    /// Creates a new configuration by reading environment variables.
    pub fn new() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Values are trimmed and an
    /// empty value counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        // SES_* names win over the generic AWS_* ones.
        let access_key = get("SES_ACCESS_KEY_ID")
            .or_else(|| get("AWS_ACCESS_KEY_ID"))
            .context("SES_ACCESS_KEY_ID (or AWS_ACCESS_KEY_ID) is not set")?;
        let secret_key = get("SES_SECRET_ACCESS_KEY")
            .or_else(|| get("AWS_SECRET_ACCESS_KEY"))
            .context("SES_SECRET_ACCESS_KEY (or AWS_SECRET_ACCESS_KEY) is not set")?;

        let host = get("SES_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let timeout_secs = match get("SES_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("SES_TIMEOUT_SECS is not a number: {}", raw))?,
            None => 30,
        };
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(anyhow::anyhow!(
                "SES_TIMEOUT_SECS must be between 1 and {}",
                MAX_TIMEOUT_SECS
            ));
        }

        Ok(Config {
            access_key,
            secret_key,
            host,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::with_host(&self.access_key, &self.secret_key, &self.host)
            .context("Invalid credentials")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish()
    }
}
