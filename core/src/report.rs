// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use davsync_dav::Href;

use crate::error::SyncError;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote collection had not changed; only local changes were pushed.
    Unchanged,
    /// Remote changes were listed and applied.
    Synchronized,
}

/// Counters of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Resources deleted on the server.
    pub remote_deletes: usize,
    /// Resources uploaded.
    pub uploads: usize,
    /// Uploads and deletions rejected by a precondition.
    pub conflicts: usize,
    /// Resources downloaded and added locally.
    pub local_inserts: usize,
    /// Resources downloaded and updated locally.
    pub local_updates: usize,
    /// Resources deleted locally.
    pub local_deletes: usize,
    /// Downloads that were skipped (bad entry, parse failure, not exactly one entity).
    pub skipped_downloads: usize,
}

/// A failure isolated to one resource; the pass went on without it.
#[derive(Debug)]
pub struct ResourceError {
    /// The resource concerned.
    pub href: Href,
    /// What went wrong.
    pub error: SyncError,
}

/// Result of a completed pass.
#[derive(Debug)]
pub struct SyncReport {
    /// Whether remote changes were looked at.
    pub outcome: SyncOutcome,
    /// Counters.
    pub stats: SyncStats,
    /// Resource-scoped failures.
    pub errors: Vec<ResourceError>,
}

impl SyncReport {
    pub(crate) fn new() -> Self {
        Self {
            outcome: SyncOutcome::Synchronized,
            stats: SyncStats::default(),
            errors: Vec::new(),
        }
    }

    /// Whether every resource was processed without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uploaded, {} deleted remotely, {} added, {} updated, {} deleted locally, {} conflicts, {} skipped",
            self.uploads,
            self.remote_deletes,
            self.local_inserts,
            self.local_updates,
            self.local_deletes,
            self.conflicts,
            self.skipped_downloads,
        )
    }
}
