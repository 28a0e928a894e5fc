// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod deletion;
mod download;
mod fast_path;
mod incremental;

use davsync_core::{LocalCollection, RemoteCollection, ResourceKind, SyncManager, SyncReport};
use tokio_util::sync::CancellationToken;

use crate::common::{MemoryCollection, TASKS_URL};

/// An empty task collection at [`TASKS_URL`].
fn tasks() -> MemoryCollection {
    MemoryCollection::new(ResourceKind::Tasks, Some(TASKS_URL))
}

/// Runs one pass that must succeed.
async fn sync<L, R>(manager: &SyncManager<L, R>) -> SyncReport
where
    L: LocalCollection,
    R: RemoteCollection,
{
    manager
        .synchronize(&CancellationToken::new())
        .await
        .expect("Synchronization failed")
}
