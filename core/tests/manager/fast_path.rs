// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_core::{SyncManager, SyncOutcome};
use davsync_dav::{ETag, Precondition};

use super::{sync, tasks};
use crate::common::{Call, FakeRemote, TokenMode, stored_ctag, todo, todo_body};

#[tokio::test]
async fn unchanged_collection_skips_listing() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.store_token(&stored_ctag("ctag-1"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.outcome, SyncOutcome::Unchanged);
    assert_eq!(manager.remote().calls(), vec![Call::QuerySyncState]);
    assert_eq!(manager.local().token_writes(), 0);
    assert_eq!(manager.local().post_processed(), 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn unchanged_collection_still_pushes_local_edit() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.edit(id, todo("a", "A edited"));
    local.store_token(&stored_ctag("ctag-1"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.outcome, SyncOutcome::Unchanged);
    assert_eq!(report.stats.uploads, 1);
    assert_eq!(
        manager.remote().calls(),
        vec![
            Call::QuerySyncState,
            Call::Put("a.ics".to_string(), Precondition::IfMatch(etag)),
        ]
    );

    let resource = manager.local().resource(id).unwrap();
    assert!(!resource.dirty);
    assert_eq!(resource.etag, Some(ETag::from("\"v2\"")));
    assert!(
        manager
            .remote()
            .body("a.ics")
            .unwrap()
            .contains("SUMMARY:A edited")
    );
    assert_eq!(manager.local().token_writes(), 0);
}

#[tokio::test]
async fn unchanged_collection_still_pushes_local_deletion() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.remove(id);
    local.store_token(&stored_ctag("ctag-1"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.outcome, SyncOutcome::Unchanged);
    assert_eq!(report.stats.remote_deletes, 1);
    assert_eq!(
        manager.remote().calls(),
        vec![
            Call::QuerySyncState,
            Call::Delete("a.ics".to_string(), Some(etag)),
        ]
    );
    assert!(manager.local().resources().is_empty());
    assert!(manager.remote().file_names().is_empty());
}

#[tokio::test]
async fn changed_ctag_lists_collection() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.store_token(&stored_ctag("ctag-0"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.outcome, SyncOutcome::Synchronized);
    assert_eq!(
        manager.remote().calls(),
        vec![
            Call::QuerySyncState,
            Call::ListResources(Some("VTODO".to_string())),
        ]
    );
    assert_eq!(manager.local().stored_token(), Some(stored_ctag("ctag-1")));
}

#[tokio::test]
async fn collection_without_token_is_always_listed() {
    let remote = FakeRemote::new(TokenMode::None);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    local.insert_synced("a.ics", todo("a", "A"), etag.as_str());

    let manager = SyncManager::new(local, remote);
    sync(&manager).await;
    sync(&manager).await;

    let calls = manager.remote().calls();
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::ListResources(_)))
            .count(),
        2
    );
    assert!(!calls.iter().any(|c| matches!(c, Call::Fetch(_) | Call::FetchMany(_))));
    assert_eq!(manager.local().stored_token(), None);
}
