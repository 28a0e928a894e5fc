// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, path::PathBuf};

use tokio::fs;

use davsync_core::{APP_NAME, Config};

const DAVSYNC_CONFIG_ENV: &str = "DAVSYNC_CONFIG";

/// Loads and normalizes the configuration.
///
/// The file is taken from `path`, then from `$DAVSYNC_CONFIG`, then from the
/// user configuration directory.
#[tracing::instrument]
pub async fn parse_config(path: Option<PathBuf>) -> Result<Config, Box<dyn Error>> {
    let path = if let Some(path) = path {
        path
    } else if let Ok(env_path) = std::env::var(DAVSYNC_CONFIG_ENV) {
        PathBuf::from(env_path)
    } else {
        let config = get_config_dir()?.join(APP_NAME).join("config.toml");
        if !config.exists() {
            return Err(format!("No config found at: {}", config.display()).into());
        }
        config
    };

    let content = fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read config file at {}: {}", path.display(), e))?;

    let mut config: Config = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse config file at {}: {}", path.display(), e))?;
    config.normalize()?;

    tracing::debug!(
        database = ?config.database,
        accounts = config.accounts.len(),
        "configuration loaded"
    );
    Ok(config)
}

fn get_config_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| "User-specific config directory not found".into())
}
