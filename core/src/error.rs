// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{DavError, Href};

use crate::local::ResourceId;

/// Errors raised by a local collection store. Always fatal to a pass.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The database rejected a query.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed while opening the database.
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The resource does not exist (anymore).
    #[error("resource {0} not found")]
    NotFound(ResourceId),

    /// Any other store failure.
    #[error("{0}")]
    Other(String),
}

/// Errors of a synchronization pass.
///
/// Collection-level errors abort the pass. Resource-level errors are
/// collected into the [`SyncReport`](crate::SyncReport) and the pass goes on,
/// except for [`SyncError::is_fatal`] ones.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The collection URL is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network failure or 5xx response; a later pass may succeed.
    #[error("transport error: {0}")]
    Transport(#[source] DavError),

    /// The server answered in a way the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A conditional write was rejected (412/409).
    #[error("precondition failed for {0}")]
    PreconditionFailed(Href),

    /// A downloaded body could not be parsed.
    #[error("cannot parse {href}: {message}")]
    Parse {
        /// Resource the body belongs to.
        href: Href,
        /// Parser message.
        message: String,
    },

    /// The local store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The pass was cancelled before it could commit.
    #[error("synchronization cancelled")]
    Cancelled,
}

impl SyncError {
    /// Returns `true` if running the pass again later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Cancelled)
    }

    /// Returns `true` for errors that abort a pass even when raised while
    /// processing a single resource.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Storage(_) | Self::Cancelled
        )
    }
}

impl From<DavError> for SyncError {
    fn from(e: DavError) -> Self {
        if e.is_retryable() {
            return Self::Transport(e);
        }

        match e {
            DavError::PreconditionFailed(href) | DavError::Conflict(href) => {
                Self::PreconditionFailed(href)
            }
            DavError::Config(message) => Self::Configuration(message),
            e => Self::Protocol(e.to_string()),
        }
    }
}
