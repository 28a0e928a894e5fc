// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_core::{Entity, SyncError, SyncManager};

use super::{sync, tasks};
use crate::common::{Call, FakeRemote, Op, TokenMode, draft_body, todo, todo_body};

#[tokio::test]
async fn deletion_is_sent_with_if_match() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.remove(id);

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.remote_deletes, 1);
    assert_eq!(report.stats.local_deletes, 0);
    assert!(
        manager
            .remote()
            .calls()
            .contains(&Call::Delete("a.ics".to_string(), Some(etag)))
    );
    assert_eq!(manager.remote().count(Op::Fetch), 0);
    assert!(manager.remote().file_names().is_empty());
    assert!(manager.local().resources().is_empty());
}

#[tokio::test]
async fn deletion_conflict_restores_remote_copy() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.remove(id);
    remote.upsert("a.ics", &todo_body("a", "A changed elsewhere"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.conflicts, 1);
    assert_eq!(report.stats.remote_deletes, 0);
    assert_eq!(report.stats.local_inserts, 1);
    assert!(report.is_clean());

    let restored = manager.local().by_name("a.ics").unwrap();
    assert_ne!(restored.id, id);
    assert!(!restored.deleted);
    assert!(restored.entity.body.contains("SUMMARY:A changed elsewhere"));
    assert_eq!(manager.remote().file_names(), vec!["a.ics"]);
}

#[tokio::test]
async fn deletion_of_vanished_member_completes_locally() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), "\"v9\"");
    local.remove(id);

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.remote_deletes, 0);
    assert_eq!(report.stats.local_deletes, 1);
    assert!(report.is_clean());
    assert!(manager.local().resources().is_empty());
}

#[tokio::test]
async fn deletion_never_uploaded_is_discarded() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let local = tasks();
    let id = local.insert_new(Entity::new(None, draft_body("Scratch")));
    local.remove(id);

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_deletes, 1);
    assert_eq!(manager.remote().count(Op::Put), 0);
    assert_eq!(manager.remote().count(Op::Delete), 0);
    assert!(manager.local().resources().is_empty());
}

#[tokio::test]
async fn deletion_with_unusable_name_is_reported() {
    let remote = FakeRemote::new(TokenMode::CTag).rejecting_name("bad.ics");
    let etag_bad = remote.upsert("bad.ics", &todo_body("bad", "Bad"));
    let etag_good = remote.upsert("good.ics", &todo_body("good", "Good"));
    let local = tasks();
    let bad = local.insert_synced("bad.ics", todo("bad", "Bad"), etag_bad.as_str());
    let good = local.insert_synced("good.ics", todo("good", "Good"), etag_good.as_str());
    local.remove(bad);
    local.remove(good);

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].href.file_name(), "bad.ics");
    assert!(matches!(report.errors[0].error, SyncError::Protocol(_)));
    assert_eq!(report.stats.remote_deletes, 1);
    assert_eq!(manager.remote().file_names(), vec!["bad.ics"]);
    assert!(manager.local().resource(bad).is_some_and(|r| r.deleted));
}
