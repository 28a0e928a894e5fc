// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::{Path, PathBuf};

use davsync_dav::{AuthMethod, DavConfig};

use crate::kind::ResourceKind;

/// The name of the application.
pub const APP_NAME: &str = "davsync";

/// Configuration of the synchronization client.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Path to the local database. Defaults to the state directory.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Accounts to synchronize.
    #[serde(default, rename = "account")]
    pub accounts: Vec<AccountConfig>,
}

impl Config {
    /// Normalize the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be expanded or an account is invalid.
    pub fn normalize(&mut self) -> Result<(), Box<dyn Error>> {
        match &self.database {
            Some(a) => {
                self.database = Some(
                    expand_path(a).map_err(|e| format!("Failed to expand database path: {e}"))?,
                );
            }

            None => match get_state_dir() {
                Ok(a) => self.database = Some(a.join(APP_NAME).join(format!("{APP_NAME}.db"))),
                Err(e) => tracing::warn!(err = %e, "failed to get state directory"),
            },
        }

        for account in &self.accounts {
            if account.collections.is_empty() {
                tracing::warn!(account = account.name, "account has no collections");
            }
            for collection in &account.collections {
                if collection.url.trim().is_empty() {
                    return Err(format!("Empty collection URL in account {}", account.name).into());
                }
            }
        }

        Ok(())
    }

    /// Looks an account up by name.
    #[must_use]
    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name == name)
    }
}

/// One server account and the collections synchronized with it.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AccountConfig {
    /// Name shown in logs and reports.
    pub name: String,

    /// Authentication against the server.
    #[serde(default)]
    pub auth: AuthMethod,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Collections of the account.
    #[serde(default, rename = "collection")]
    pub collections: Vec<CollectionConfig>,
}

impl AccountConfig {
    /// Connection settings of the account.
    #[must_use]
    pub fn dav_config(&self) -> DavConfig {
        let mut config = DavConfig {
            auth: self.auth.clone(),
            ..Default::default()
        };
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        config
    }
}

/// A remote collection mirrored locally.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CollectionConfig {
    /// Absolute URL of the collection.
    pub url: String,

    /// Kind of the stored resources.
    pub kind: ResourceKind,

    /// Name shown to the user.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Handle tilde (~) and environment variables in the path
fn expand_path(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path.to_str().ok_or("Invalid path")?;

    // Handle tilde and home directory
    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    // Handle data directories
    let state_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_STATE_HOME/", "${XDG_STATE_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in state_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_state_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

fn get_home_dir() -> Result<PathBuf, Box<dyn Error>> {
    dirs::home_dir().ok_or_else(|| "User-specific home directory not found".into())
}

fn get_state_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_local_dir();
    state_dir.ok_or_else(|| "User-specific state directory not found".into())
}
