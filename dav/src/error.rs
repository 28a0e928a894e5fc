// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

use crate::types::Href;

/// `WebDAV` client errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DavError {
    /// Connection, timeout or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// XML parsing/writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Resource not found (404 or 410).
    #[error("resource not found: {0}")]
    NotFound(Href),

    /// Precondition failed (`ETag` mismatch, 412).
    #[error("precondition failed for {0}")]
    PreconditionFailed(Href),

    /// Conflicting state on the server (409).
    #[error("conflict on {0}")]
    Conflict(Href),

    /// The server answered a `GET` without an `ETag` header.
    #[error("response for {0} carries no ETag")]
    MissingETag(Href),

    /// The server no longer accepts the sync token (RFC 6578 `valid-sync-token`).
    #[error("sync token rejected by server")]
    InvalidSyncToken,

    /// Any other unsuccessful status code.
    #[error("HTTP {status} for {href}: {message}")]
    Status {
        /// Requested resource.
        href: Href,
        /// Returned status code.
        status: StatusCode,
        /// Response body, if readable.
        message: String,
    },

    /// An href or member name that cannot be resolved against the collection.
    #[error("invalid href {0}")]
    InvalidHref(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DavError {
    /// Returns `true` for errors a later attempt may not hit again.
    ///
    /// Network failures and 5xx responses are retry candidates, everything
    /// else describes a request the server will keep rejecting.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Returns `true` for optimistic-concurrency rejections (412 and 409).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed(_) | Self::Conflict(_))
    }
}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
