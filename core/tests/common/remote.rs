// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted remote collection recording every call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use davsync_core::{RemoteCollection, SyncState};
use davsync_dav::{DavError, ETag, FetchedResource, Href, Precondition, RemoteChanges, RemoteEntry};
use tokio_util::sync::CancellationToken;

use super::fixtures::TASKS_PATH;

/// Which change token the collection reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    None,
    CTag,
    SyncToken,
}

/// Remote operations, for failure and cancellation hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    QuerySyncState,
    ListResources,
    ListChanges,
    Fetch,
    FetchMany,
    Put,
    Delete,
}

/// A recorded call. Members are identified by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    QuerySyncState,
    ListResources(Option<String>),
    ListChanges(String),
    Fetch(String),
    FetchMany(Vec<String>),
    Put(String, Precondition),
    Delete(String, Option<ETag>),
}

impl Call {
    const fn op(&self) -> Op {
        match self {
            Self::QuerySyncState => Op::QuerySyncState,
            Self::ListResources(_) => Op::ListResources,
            Self::ListChanges(_) => Op::ListChanges,
            Self::Fetch(_) => Op::Fetch,
            Self::FetchMany(_) => Op::FetchMany,
            Self::Put(..) => Op::Put,
            Self::Delete(..) => Op::Delete,
        }
    }
}

/// Counts passes talking to remotes at the same time.
#[derive(Debug, Default)]
pub struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
struct Member {
    etag: ETag,
    body: String,
    version: u64,
}

#[derive(Debug, Default)]
struct Server {
    version: u64,
    members: BTreeMap<String, Member>,
    removed: Vec<(String, u64)>,
    expired_tokens: HashSet<String>,
}

impl Server {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// A remote collection kept in memory.
///
/// `ETag`s are `"v<version>"`, CTags `ctag-<version>` and sync-tokens
/// `sync-<version>`, where the version grows with every change.
#[derive(Debug)]
pub struct FakeRemote {
    mode: TokenMode,
    server: Mutex<Server>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, DavError>>,
    cancel_on: Mutex<Option<(Op, CancellationToken)>>,
    omit_put_etag: bool,
    omit_get_etag: bool,
    omit_multiget_etag: bool,
    rejected_name: Option<String>,
    delay: Option<Duration>,
    gauge: Arc<Gauge>,
}

impl FakeRemote {
    pub fn new(mode: TokenMode) -> Self {
        Self {
            mode,
            server: Mutex::new(Server::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            cancel_on: Mutex::new(None),
            omit_put_etag: false,
            omit_get_etag: false,
            omit_multiget_etag: false,
            rejected_name: None,
            delay: None,
            gauge: Arc::new(Gauge::default()),
        }
    }

    /// PUT responses carry no `ETag`.
    #[must_use]
    pub fn without_put_etag(mut self) -> Self {
        self.omit_put_etag = true;
        self
    }

    /// GET responses carry no `ETag`.
    #[must_use]
    pub fn without_get_etag(mut self) -> Self {
        self.omit_get_etag = true;
        self
    }

    /// Multiget entries of existing members carry no `ETag`.
    #[must_use]
    pub fn without_multiget_etag(mut self) -> Self {
        self.omit_multiget_etag = true;
        self
    }

    /// No href can be built for `file_name`.
    #[must_use]
    pub fn rejecting_name(mut self, file_name: &str) -> Self {
        self.rejected_name = Some(file_name.to_string());
        self
    }

    /// Every token query takes `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration, gauge: Arc<Gauge>) -> Self {
        self.delay = Some(delay);
        self.gauge = gauge;
        self
    }

    /// Stores a member as if another client uploaded it. Returns its `ETag`.
    pub fn upsert(&self, file_name: &str, body: &str) -> ETag {
        let mut server = self.server.lock().unwrap();
        let version = server.bump();
        let etag = ETag::new(format!("\"v{version}\""));
        server.members.insert(
            file_name.to_string(),
            Member {
                etag: etag.clone(),
                body: body.to_string(),
                version,
            },
        );
        etag
    }

    /// Removes a member as if another client deleted it.
    pub fn remove(&self, file_name: &str) {
        let mut server = self.server.lock().unwrap();
        let version = server.bump();
        server.members.remove(file_name);
        server.removed.push((file_name.to_string(), version));
    }

    /// Makes the server reject a sync-token as expired.
    pub fn expire_token(&self, token: &str) {
        let mut server = self.server.lock().unwrap();
        server.expired_tokens.insert(token.to_string());
    }

    /// The next call of `op` fails with `error`.
    pub fn fail_next(&self, op: Op, error: DavError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    /// The first call of `op` cancels `token`.
    pub fn cancel_on(&self, op: Op, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((op, token));
    }

    pub fn body(&self, file_name: &str) -> Option<String> {
        let server = self.server.lock().unwrap();
        server.members.get(file_name).map(|m| m.body.clone())
    }

    pub fn etag(&self, file_name: &str) -> Option<ETag> {
        let server = self.server.lock().unwrap();
        server.members.get(file_name).map(|m| m.etag.clone())
    }

    pub fn file_names(&self) -> Vec<String> {
        let server = self.server.lock().unwrap();
        server.members.keys().cloned().collect()
    }

    /// The state the collection reports right now.
    pub fn state(&self) -> Option<SyncState> {
        let version = self.server.lock().unwrap().version;
        match self.mode {
            TokenMode::None => None,
            TokenMode::CTag => Some(SyncState::CTag {
                value: format!("ctag-{version}"),
            }),
            TokenMode::SyncToken => Some(SyncState::SyncToken {
                value: format!("sync-{version}"),
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    fn record(&self, call: Call) -> Result<(), DavError> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        let mut cancel_on = self.cancel_on.lock().unwrap();
        if matches!(cancel_on.as_ref(), Some((o, _)) if *o == op) {
            if let Some((_, token)) = cancel_on.take() {
                token.cancel();
            }
        }
        drop(cancel_on);

        match self.failures.lock().unwrap().remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn href(file_name: &str) -> Href {
        Href::new(format!("{TASKS_PATH}{file_name}"))
    }
}

#[async_trait]
impl RemoteCollection for FakeRemote {
    fn member_href(&self, file_name: &str) -> Result<Href, DavError> {
        if self.rejected_name.as_deref() == Some(file_name) {
            return Err(DavError::InvalidHref(file_name.to_string()));
        }
        Ok(Self::href(file_name))
    }

    async fn query_sync_state(&self) -> Result<Option<SyncState>, DavError> {
        if let Some(delay) = self.delay {
            self.gauge.enter();
            tokio::time::sleep(delay).await;
            self.gauge.leave();
        }
        self.record(Call::QuerySyncState)?;
        Ok(self.state())
    }

    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<RemoteEntry>, DavError> {
        self.record(Call::ListResources(filter.map(str::to_string)))?;
        let server = self.server.lock().unwrap();
        Ok(server
            .members
            .iter()
            .map(|(name, m)| RemoteEntry::new(Self::href(name), m.etag.clone()))
            .collect())
    }

    async fn list_changes(&self, sync_token: &str) -> Result<RemoteChanges, DavError> {
        self.record(Call::ListChanges(sync_token.to_string()))?;
        let server = self.server.lock().unwrap();
        if server.expired_tokens.contains(sync_token) {
            return Err(DavError::InvalidSyncToken);
        }
        let since: u64 = sync_token
            .strip_prefix("sync-")
            .and_then(|v| v.parse().ok())
            .ok_or(DavError::InvalidSyncToken)?;

        let changed = server
            .members
            .iter()
            .filter(|(_, m)| m.version > since)
            .map(|(name, m)| RemoteEntry::new(Self::href(name), m.etag.clone()))
            .collect();
        let removed = server
            .removed
            .iter()
            .filter(|(name, version)| *version > since && !server.members.contains_key(name))
            .map(|(name, _)| Self::href(name))
            .collect();

        Ok(RemoteChanges {
            changed,
            removed,
            sync_token: Some(format!("sync-{}", server.version)),
        })
    }

    async fn fetch(&self, href: &Href) -> Result<FetchedResource, DavError> {
        let name = href.file_name().to_string();
        self.record(Call::Fetch(name.clone()))?;
        if self.omit_get_etag {
            return Err(DavError::MissingETag(href.clone()));
        }

        let server = self.server.lock().unwrap();
        let member = server
            .members
            .get(&name)
            .ok_or_else(|| DavError::NotFound(href.clone()))?;
        Ok(FetchedResource {
            href: href.clone(),
            etag: Some(member.etag.clone()),
            data: Some(member.body.clone()),
            success: true,
        })
    }

    async fn fetch_many(&self, hrefs: &[Href]) -> Result<Vec<FetchedResource>, DavError> {
        let names = hrefs.iter().map(|h| h.file_name().to_string()).collect();
        self.record(Call::FetchMany(names))?;

        let server = self.server.lock().unwrap();
        Ok(hrefs
            .iter()
            .map(|href| match server.members.get(href.file_name()) {
                Some(member) => FetchedResource {
                    href: href.clone(),
                    etag: (!self.omit_multiget_etag).then(|| member.etag.clone()),
                    data: Some(member.body.clone()),
                    success: true,
                },
                None => FetchedResource {
                    href: href.clone(),
                    etag: None,
                    data: None,
                    success: false,
                },
            })
            .collect())
    }

    async fn put(
        &self,
        href: &Href,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError> {
        let name = href.file_name().to_string();
        self.record(Call::Put(name.clone(), precondition.clone()))?;

        {
            let server = self.server.lock().unwrap();
            let current = server.members.get(&name).map(|m| &m.etag);
            let holds = match precondition {
                Precondition::IfMatch(etag) => current == Some(etag),
                Precondition::IfNoneMatch => current.is_none(),
                Precondition::None => true,
            };
            if !holds {
                return Err(DavError::PreconditionFailed(href.clone()));
            }
        }

        let etag = self.upsert(&name, &body);
        Ok((!self.omit_put_etag).then_some(etag))
    }

    async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        let name = href.file_name().to_string();
        self.record(Call::Delete(name.clone(), etag.cloned()))?;

        {
            let server = self.server.lock().unwrap();
            let current = server
                .members
                .get(&name)
                .ok_or_else(|| DavError::NotFound(href.clone()))?;
            if etag.is_some_and(|e| *e != current.etag) {
                return Err(DavError::PreconditionFailed(href.clone()));
            }
        }

        self.remove(&name);
        Ok(())
    }
}
