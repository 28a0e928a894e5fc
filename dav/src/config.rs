// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Credentials sent with every request of an account.
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Anonymous access.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic {
        /// Account name on the server.
        username: String,
        /// Password or app-specific password.
        password: String,
    },
    /// HTTP Bearer authentication with an OAuth access token.
    Bearer {
        /// Access token.
        token: String,
    },
}

// Secrets stay out of logs.
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthMethod::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Connection settings shared by every collection of one account.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DavConfig {
    /// Credentials.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Timeout of a single request, in seconds.
    #[serde(default = "DavConfig::default_timeout")]
    pub timeout_secs: u64,
    /// Value of the `User-Agent` header.
    #[serde(default = "DavConfig::default_user_agent")]
    pub user_agent: String,
}

impl DavConfig {
    const fn default_timeout() -> u64 {
        30
    }

    fn default_user_agent() -> String {
        concat!("davsync/", env!("CARGO_PKG_VERSION")).to_string()
    }
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            auth: AuthMethod::None,
            timeout_secs: Self::default_timeout(),
            user_agent: Self::default_user_agent(),
        }
    }
}
