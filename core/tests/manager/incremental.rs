// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_core::{SyncError, SyncManager, SyncOutcome, SyncState};
use davsync_dav::DavError;

use super::{sync, tasks};
use crate::common::{
    Call, FakeRemote, Op, TokenMode, stored_sync_token, todo, todo_body,
};

#[tokio::test]
async fn first_sync_stores_sync_token() {
    let remote = FakeRemote::new(TokenMode::SyncToken);
    remote.upsert("a.ics", &todo_body("a", "A"));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;
    assert_eq!(report.stats.local_inserts, 1);

    let stored = SyncState::decode(&manager.local().stored_token().unwrap());
    assert_eq!(
        stored,
        SyncState::SyncToken {
            value: "sync-1".to_string(),
        }
    );

    let report = sync(&manager).await;
    assert_eq!(report.outcome, SyncOutcome::Unchanged);
    assert_eq!(manager.remote().calls().last(), Some(&Call::QuerySyncState));
}

#[tokio::test]
async fn changes_since_token_are_applied() {
    let remote = FakeRemote::new(TokenMode::SyncToken);
    let etag_a = remote.upsert("a.ics", &todo_body("a", "A"));
    let etag_b = remote.upsert("b.ics", &todo_body("b", "B"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag_a.as_str());
    local.insert_synced("b.ics", todo("b", "B"), etag_b.as_str());
    local.store_token(&stored_sync_token("sync-2"));

    remote.upsert("b.ics", &todo_body("b", "B changed"));
    remote.upsert("c.ics", &todo_body("c", "C"));
    remote.remove("a.ics");

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(
        manager.remote().calls(),
        vec![
            Call::QuerySyncState,
            Call::ListChanges("sync-2".to_string()),
            Call::FetchMany(vec!["b.ics".to_string(), "c.ics".to_string()]),
        ]
    );
    assert_eq!(report.stats.local_updates, 1);
    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(report.stats.local_deletes, 1);
    assert_eq!(manager.local().file_names(), vec!["b.ics", "c.ics"]);
    assert_eq!(
        manager.local().stored_token(),
        Some(stored_sync_token("sync-5"))
    );
}

#[tokio::test]
async fn expired_token_falls_back_to_full_listing() {
    let remote = FakeRemote::new(TokenMode::SyncToken);
    let etag_a = remote.upsert("a.ics", &todo_body("a", "A"));
    let etag_b = remote.upsert("b.ics", &todo_body("b", "B"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag_a.as_str());
    local.insert_synced("b.ics", todo("b", "B"), etag_b.as_str());
    local.store_token(&stored_sync_token("sync-2"));
    remote.upsert("c.ics", &todo_body("c", "C"));
    remote.expire_token("sync-2");

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert!(report.is_clean());
    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(
        manager.remote().calls(),
        vec![
            Call::QuerySyncState,
            Call::ListChanges("sync-2".to_string()),
            Call::ListResources(Some("VTODO".to_string())),
            Call::Fetch("c.ics".to_string()),
        ]
    );
    assert_eq!(
        SyncState::decode(&manager.local().stored_token().unwrap()),
        SyncState::SyncToken {
            value: "sync-3".to_string(),
        }
    );
}

#[tokio::test]
async fn failed_download_is_listed_again_next_pass() {
    let remote = FakeRemote::new(TokenMode::SyncToken);
    let etag_a = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag_a.as_str());
    local.store_token(&stored_sync_token("sync-1"));
    remote.upsert("b.ics", &todo_body("b", "B"));
    remote.fail_next(Op::Fetch, DavError::Transport("connection reset".to_string()));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0].error, SyncError::Transport(_)));
    assert_eq!(manager.local().file_names(), vec!["a.ics"]);
    assert_eq!(
        manager.local().stored_token(),
        Some(stored_sync_token("sync-1"))
    );

    let report = sync(&manager).await;

    assert!(report.is_clean());
    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(
        manager.remote().calls()[3..],
        [
            Call::QuerySyncState,
            Call::ListChanges("sync-1".to_string()),
            Call::Fetch("b.ics".to_string()),
        ]
    );
    assert_eq!(manager.local().file_names(), vec!["a.ics", "b.ics"]);
    assert_eq!(
        manager.local().stored_token(),
        Some(stored_sync_token("sync-2"))
    );
}
