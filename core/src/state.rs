// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::CollectionTokens;

/// Version of a whole collection, as last synchronized.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncState {
    /// `CalendarServer` `getctag`.
    CTag {
        /// Opaque token value.
        value: String,
    },
    /// RFC 6578 `sync-token`.
    SyncToken {
        /// Opaque token value.
        value: String,
    },
}

impl SyncState {
    /// Picks the state a server reported; the sync-token wins over the CTag.
    #[must_use]
    pub fn from_tokens(tokens: &CollectionTokens) -> Option<Self> {
        if let Some(value) = &tokens.sync_token {
            return Some(Self::SyncToken {
                value: value.clone(),
            });
        }
        tokens
            .ctag
            .as_ref()
            .map(|value| Self::CTag {
                value: value.clone(),
            })
    }

    /// Decodes a stored state. Values that are not JSON come from older
    /// versions, which stored the bare CTag.
    #[must_use]
    pub fn decode(stored: &str) -> Self {
        serde_json::from_str(stored).unwrap_or_else(|_| Self::CTag {
            value: stored.to_string(),
        })
    }

    /// Encodes the state for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The token value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::CTag { value } | Self::SyncToken { value } => value,
        }
    }

    /// The sync-token, if this is one.
    #[must_use]
    pub fn sync_token(&self) -> Option<&str> {
        match self {
            Self::SyncToken { value } => Some(value),
            Self::CTag { .. } => None,
        }
    }

    /// Whether both states describe the same collection version. A CTag
    /// and a sync-token never do, even with equal values.
    #[must_use]
    pub fn same_version(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::CTag { value: a }, Self::CTag { value: b })
            | (Self::SyncToken { value: a }, Self::SyncToken { value: b }) => a == b,
            _ => false,
        }
    }
}
