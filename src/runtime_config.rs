//! # Runtime Configuration Module
//!
//! Settings that affect request handling, loaded from environment variables
//! and optionally from a YAML file.
//!
//! ## Environment Variables
//!
//! ### `TYPEROUTE_MAX_BODY_BYTES`
//!
//! Largest request body the body loader accepts. Accepts values in:
//! - Decimal: `1048576` (1 MiB)
//! - Hexadecimal: `0x100000` (1 MiB)
//!
//! Default: `0x200000` (2 MiB)
//!
//! ### `TYPEROUTE_RECOVER_PANICS`
//!
//! When `true` (default), [`Router::handle`](crate::Router::handle) converts a
//! panicking handler into a `500` response. Set to `false` to let panics unwind
//! into the transport, e.g. under a supervisor that restarts workers.
//!
//! ## Usage
//!
//! ```rust
//! use typeroute::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_yaml_str("max_body_bytes: 1024\n")
//!     .unwrap()
//!     .with_env_overrides();
//! assert!(config.max_body_bytes > 0);
//! ```

use std::env;

use anyhow::Context as _;
use serde::Deserialize;

/// Default request body limit (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 0x20_0000;

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Convert handler panics into `500` responses.
    pub recover_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            recover_panics: true,
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a YAML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this struct.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid runtime configuration")
    }

    /// Load a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Apply `TYPEROUTE_*` environment variables on top of `self`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(size) = lookup("TYPEROUTE_MAX_BODY_BYTES").as_deref().and_then(parse_size) {
            self.max_body_bytes = size;
        }
        if let Some(flag) = lookup("TYPEROUTE_RECOVER_PANICS").as_deref().and_then(parse_flag) {
            self.recover_panics = flag;
        }
        self
    }
}
