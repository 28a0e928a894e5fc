// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_core::{MAX_MULTIGET_RESOURCES, ResourceKind, SyncError, SyncManager};
use davsync_dav::DavError;

use super::{sync, tasks};
use crate::common::{
    Call, FakeRemote, MemoryCollection, Op, TASKS_URL, TokenMode, recurring_event_body,
    stored_ctag, todo, todo_body, two_todos_body,
};

fn seed(remote: &FakeRemote, count: usize) {
    for i in 0..count {
        remote.upsert(&format!("r{i:02}.ics"), &todo_body(&format!("r{i}"), "Task"));
    }
}

fn multiget_sizes(remote: &FakeRemote) -> Vec<usize> {
    remote
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::FetchMany(names) => Some(names.len()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn new_members_are_downloaded_together() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("a.ics", &todo_body("a", "A"));
    remote.upsert("b.ics", &todo_body("b", "B"));
    remote.upsert("c.ics", &todo_body("c", "C"));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_inserts, 3);
    assert!(report.is_clean());
    assert_eq!(
        manager.remote().calls().last(),
        Some(&Call::FetchMany(vec![
            "a.ics".to_string(),
            "b.ics".to_string(),
            "c.ics".to_string(),
        ]))
    );
    assert_eq!(
        manager.local().file_names(),
        vec!["a.ics", "b.ics", "c.ics"]
    );

    let a = manager.local().by_name("a.ics").unwrap();
    assert_eq!(a.entity.uid.as_deref(), Some("a"));
    assert_eq!(a.etag, manager.remote().etag("a.ics"));
    assert!(a.is_remotely_present());
    assert!(!a.dirty);
}

#[tokio::test]
async fn downloads_are_chunked() {
    let remote = FakeRemote::new(TokenMode::CTag);
    seed(&remote, 23);

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_inserts, 23);
    assert_eq!(
        multiget_sizes(manager.remote()),
        vec![MAX_MULTIGET_RESOURCES, MAX_MULTIGET_RESOURCES, 3]
    );
}

#[tokio::test]
async fn single_leftover_is_fetched_alone() {
    let remote = FakeRemote::new(TokenMode::CTag);
    seed(&remote, 21);

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_inserts, 21);
    assert_eq!(multiget_sizes(manager.remote()), vec![10, 10]);
    assert_eq!(manager.remote().count(Op::Fetch), 1);
    assert!(
        manager
            .remote()
            .calls()
            .contains(&Call::Fetch("r20.ics".to_string()))
    );
}

#[tokio::test]
async fn changed_member_updates_local_resource() {
    let remote = FakeRemote::new(TokenMode::CTag);
    let etag = remote.upsert("a.ics", &todo_body("a", "A"));
    remote.upsert("b.ics", &todo_body("b", "B"));
    let local = tasks();
    let id = local.insert_synced("a.ics", todo("a", "A"), etag.as_str());
    local.insert_synced("b.ics", todo("b", "B"), "\"v2\"");
    let newer = remote.upsert("a.ics", &todo_body("a", "A changed"));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_updates, 1);
    assert_eq!(report.stats.local_inserts, 0);
    assert_eq!(manager.remote().count(Op::Fetch), 1);

    let resource = manager.local().resource(id).unwrap();
    assert_eq!(resource.etag, Some(newer));
    assert!(resource.entity.body.contains("SUMMARY:A changed"));
}

#[tokio::test]
async fn body_with_several_items_is_skipped() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("both.ics", &two_todos_body());

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 1);
    assert_eq!(report.stats.local_inserts, 0);
    assert!(report.is_clean());
    assert!(manager.local().resources().is_empty());
}

#[tokio::test]
async fn body_without_matching_component_is_skipped() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("event.ics", &recurring_event_body("standup"));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 1);
    assert!(manager.local().resources().is_empty());
}

#[tokio::test]
async fn invalid_body_is_reported() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("bad.ics", "this is not a calendar");
    remote.upsert("good.ics", &todo_body("good", "Good"));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(report.stats.skipped_downloads, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        &report.errors[0].error,
        SyncError::Parse { href, .. } if href.file_name() == "bad.ics"
    ));
    assert_eq!(manager.local().file_names(), vec!["good.ics"]);
    assert_eq!(manager.local().stored_token(), Some(stored_ctag("ctag-2")));
}

#[tokio::test]
async fn fetch_without_etag_is_reported() {
    let remote = FakeRemote::new(TokenMode::CTag).without_get_etag();
    remote.upsert("a.ics", &todo_body("a", "A"));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0].error, SyncError::Protocol(_)));
    assert!(manager.local().resources().is_empty());
    assert_eq!(manager.local().token_writes(), 0);
}

#[tokio::test]
async fn failed_fetch_is_retried_next_pass() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("a.ics", &todo_body("a", "A"));
    remote.fail_next(Op::Fetch, DavError::Transport("connection reset".to_string()));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].error.is_retryable());
    assert!(manager.local().resources().is_empty());
    assert_eq!(manager.local().stored_token(), None);

    let report = sync(&manager).await;

    assert!(report.is_clean());
    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(manager.local().file_names(), vec!["a.ics"]);
    assert_eq!(manager.local().stored_token(), Some(stored_ctag("ctag-1")));
}

#[tokio::test]
async fn multiget_failure_reports_every_member() {
    let remote = FakeRemote::new(TokenMode::CTag);
    seed(&remote, 3);
    remote.fail_next(
        Op::FetchMany,
        DavError::Transport("connection reset".to_string()),
    );

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 3);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors.iter().all(|e| e.error.is_retryable()));
    assert_eq!(
        report
            .errors
            .iter()
            .map(|e| e.href.file_name())
            .collect::<Vec<_>>(),
        vec!["r00.ics", "r01.ics", "r02.ics"]
    );
    assert!(manager.local().resources().is_empty());
    assert_eq!(manager.local().token_writes(), 0);
    assert_eq!(manager.local().post_processed(), 1);

    let report = sync(&manager).await;

    assert!(report.is_clean());
    assert_eq!(report.stats.local_inserts, 3);
    assert_eq!(manager.local().stored_token(), Some(stored_ctag("ctag-3")));
}

#[tokio::test]
async fn multiget_rejected_is_protocol_error() {
    let remote = FakeRemote::new(TokenMode::CTag);
    seed(&remote, 2);
    remote.fail_next(Op::FetchMany, DavError::Xml("unexpected EOF".to_string()));

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.errors.len(), 2);
    assert!(
        report
            .errors
            .iter()
            .all(|e| matches!(e.error, SyncError::Protocol(_)))
    );
    assert_eq!(manager.local().token_writes(), 0);
}

#[tokio::test]
async fn multiget_entry_without_etag_is_reported() {
    let remote = FakeRemote::new(TokenMode::CTag).without_multiget_etag();
    seed(&remote, 2);

    let manager = SyncManager::new(tasks(), remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.skipped_downloads, 2);
    assert_eq!(report.stats.local_inserts, 0);
    assert_eq!(report.errors.len(), 2);
    assert!(matches!(
        &report.errors[0].error,
        SyncError::Protocol(message) if message.contains("no ETag")
    ));
    assert_eq!(report.errors[1].href.file_name(), "r01.ics");
    assert!(manager.local().resources().is_empty());
    assert_eq!(manager.local().token_writes(), 0);
}

#[tokio::test]
async fn recurring_event_is_one_item() {
    let remote = FakeRemote::new(TokenMode::CTag);
    remote.upsert("standup.ics", &recurring_event_body("standup"));
    let local = MemoryCollection::new(ResourceKind::Events, Some(TASKS_URL));

    let manager = SyncManager::new(local, remote);
    let report = sync(&manager).await;

    assert_eq!(report.stats.local_inserts, 1);
    assert_eq!(
        manager.remote().calls()[1],
        Call::ListResources(Some("VEVENT".to_string()))
    );
    let event = manager.local().by_name("standup.ics").unwrap();
    assert_eq!(event.entity.uid.as_deref(), Some("standup"));
    assert!(event.entity.body.contains("RECURRENCE-ID:20260112T090000Z"));
}
