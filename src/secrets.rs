//! Scoped credential acquisition
//!
//! The bot password lives in a local file next to the deployment, never in
//! the manifest or the config. Reading it fails loudly when the file is
//! missing or empty instead of being silently tolerated. The value stays in
//! memory for the process lifetime only and is redacted from debug output.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GreetctlError, GreetctlResult};

/// A secret value with redacted Debug/Display
pub struct Secret(String);

impl Secret {
    /// Access the raw value. Callers should pass it straight into the child
    /// environment and drop it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Expand a leading `~` against the current user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if text == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    path.to_path_buf()
}

/// Read a secret from a local file.
///
/// The trailing newline is trimmed. Fails with `SecretNotFound` when the
/// file is absent and `SecretEmpty` when it holds no value.
pub fn acquire(path: &Path) -> GreetctlResult<Secret> {
    let expanded = expand_home(path);
    if !expanded.is_file() {
        return Err(GreetctlError::SecretNotFound { path: expanded });
    }

    let raw = fs::read_to_string(&expanded)?;
    let value = raw.trim_end_matches(['\n', '\r']);
    if value.is_empty() {
        return Err(GreetctlError::SecretEmpty { path: expanded });
    }

    Ok(Secret(value.to_string()))
}
