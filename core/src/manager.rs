// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The synchronization pass.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use davsync_dav::{DavError, FetchedResource, Href, Url};
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::kind::ResourceKind;
use crate::local::{FLAG_REMOTELY_PRESENT, LocalCollection};
use crate::plan::{Deletion, Listing, SyncPlan, Upload, compare};
use crate::remote::RemoteCollection;
use crate::report::{ResourceError, SyncOutcome, SyncReport};
use crate::state::SyncState;

/// Most resources requested by one multiget.
pub const MAX_MULTIGET_RESOURCES: usize = 10;

/// Phases of a pass, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Validate the collection URL.
    Prepare,
    /// Query the remote change token.
    QueryCapabilities,
    /// List remote members.
    ListRemote,
    /// Build the plan.
    Compare,
    /// Push local deletions and changes.
    UploadLocal,
    /// Fetch new and changed members.
    DownloadRemote,
    /// Remove local resources gone from the server.
    DeleteOrphans,
    /// Run the store's post-processing hook.
    PostProcess,
    /// Committed.
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::QueryCapabilities => "query-capabilities",
            Self::ListRemote => "list-remote",
            Self::Compare => "compare",
            Self::UploadLocal => "upload-local",
            Self::DownloadRemote => "download-remote",
            Self::DeleteOrphans => "delete-orphans",
            Self::PostProcess => "post-process",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Reconciles one local collection with its remote counterpart.
#[derive(Debug)]
pub struct SyncManager<L, R> {
    local: L,
    remote: R,
}

impl<L: LocalCollection, R: RemoteCollection> SyncManager<L, R> {
    /// Creates a manager for a local collection and its remote collection.
    pub const fn new(local: L, remote: R) -> Self {
        Self { local, remote }
    }

    /// The local collection.
    pub const fn local(&self) -> &L {
        &self.local
    }

    /// The remote collection.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Runs one synchronization pass.
    ///
    /// The new change token is stored only if every phase completed and
    /// every planned download succeeded, so a failed or cancelled pass is
    /// simply repeated next time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be synchronized at all:
    /// invalid configuration, failure to query or list the collection, a
    /// local store failure, or cancellation. Failures of single resources are
    /// reported in [`SyncReport::errors`] instead.
    #[tracing::instrument(skip_all, fields(url = %self.local.url().unwrap_or_default(), kind = %self.local.kind()))]
    pub async fn synchronize(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let pass = Pass {
            local: &self.local,
            remote: &self.remote,
            kind: self.local.kind(),
            cancel,
            report: SyncReport::new(),
            missed_downloads: false,
        };

        match pass.run().await {
            Ok(report) => {
                tracing::info!(outcome = ?report.outcome, stats = %report.stats, errors = report.errors.len(), "synchronization finished");
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(err = %e, "synchronization failed");
                Err(e)
            }
        }
    }
}

struct Pass<'a, L, R> {
    local: &'a L,
    remote: &'a R,
    kind: ResourceKind,
    cancel: &'a CancellationToken,
    report: SyncReport,
    /// Set when a planned download failed for a reason other than the
    /// member's content, so the listing must be repeated.
    missed_downloads: bool,
}

impl<L: LocalCollection, R: RemoteCollection> Pass<'_, L, R> {
    async fn run(mut self) -> Result<SyncReport, SyncError> {
        self.enter(SyncPhase::Prepare)?;
        self.prepare()?;

        self.enter(SyncPhase::QueryCapabilities)?;
        let remote_state = self.race(self.remote.query_sync_state()).await??;
        let stored_state = self
            .local
            .change_token()
            .await?
            .map(|token| SyncState::decode(&token));
        tracing::debug!(?remote_state, ?stored_state, "change tokens");

        self.name_new_resources().await?;
        let deleted = self.local.list_deleted().await?;
        let dirty = self.local.list_dirty().await?;

        let unchanged = match (&stored_state, &remote_state) {
            (Some(stored), Some(remote)) => stored.same_version(remote),
            _ => false,
        };

        let listing = if unchanged {
            tracing::info!("remote collection unchanged, skipping listing");
            self.report.outcome = SyncOutcome::Unchanged;
            Listing::Skipped
        } else {
            self.enter(SyncPhase::ListRemote)?;
            self.list_remote(stored_state.as_ref(), remote_state.as_ref())
                .await?
        };

        self.enter(SyncPhase::Compare)?;
        let all = match listing {
            Listing::Skipped => Vec::new(),
            _ => self.local.list_all().await?,
        };
        let plan = compare(deleted, dirty, &all, &listing);
        tracing::debug!(
            deletions = plan.deletions.len(),
            uploads = plan.uploads.len(),
            downloads = plan.downloads.len(),
            orphans = plan.orphans.len(),
            "compared local and remote state"
        );

        let SyncPlan {
            deletions,
            discards,
            uploads,
            mut downloads,
            orphans,
        } = plan;

        self.enter(SyncPhase::UploadLocal)?;
        for resource in discards {
            self.checkpoint()?;
            self.local.delete(resource.id).await?;
            self.report.stats.local_deletes += 1;
        }
        for deletion in deletions {
            self.delete_remote(deletion, &mut downloads).await?;
        }
        for upload in uploads {
            self.upload(upload, &mut downloads).await?;
        }

        self.enter(SyncPhase::DownloadRemote)?;
        let downloaded = self.download(downloads).await?;

        self.enter(SyncPhase::DeleteOrphans)?;
        let mut seen = HashSet::new();
        for orphan in orphans {
            self.checkpoint()?;
            let name = orphan.file_name.as_deref().unwrap_or_default();
            if downloaded.contains(name) || !seen.insert(orphan.id) {
                continue;
            }
            tracing::debug!(file_name = name, "deleting resource gone from the server");
            self.local.delete(orphan.id).await?;
            self.report.stats.local_deletes += 1;
        }

        self.enter(SyncPhase::PostProcess)?;
        self.local.post_process().await?;

        self.checkpoint()?;
        if self.missed_downloads {
            tracing::warn!(
                "some members could not be downloaded, keeping the previous change token"
            );
        } else if !unchanged {
            let new_state = match &listing {
                Listing::Incremental(changes) => changes
                    .sync_token
                    .clone()
                    .map(|value| SyncState::SyncToken { value })
                    .or(remote_state),
                _ => remote_state,
            };
            self.commit(new_state.as_ref()).await?;
        }

        tracing::debug!(phase = %SyncPhase::Done, "entering phase");
        Ok(self.report)
    }

    fn enter(&self, phase: SyncPhase) -> Result<(), SyncError> {
        self.checkpoint()?;
        tracing::debug!(%phase, "entering phase");
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), SyncError> {
        match self.cancel.is_cancelled() {
            true => Err(SyncError::Cancelled),
            false => Ok(()),
        }
    }

    /// Runs a remote call, dropping it if the pass is cancelled meanwhile.
    async fn race<T>(
        &self,
        call: impl Future<Output = Result<T, DavError>>,
    ) -> Result<Result<T, DavError>, SyncError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = call => Ok(result),
        }
    }

    fn prepare(&self) -> Result<(), SyncError> {
        let url = self
            .local
            .url()
            .ok_or_else(|| SyncError::Configuration("collection has no URL".to_string()))?;

        let parsed = Url::parse(&url)
            .map_err(|e| SyncError::Configuration(format!("invalid collection URL {url}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SyncError::Configuration(format!(
                "unsupported URL scheme {scheme} in {url}"
            ))),
        }
    }

    /// Gives resources created locally a file name and a UID.
    async fn name_new_resources(&mut self) -> Result<(), SyncError> {
        for resource in self.local.list_unnamed().await? {
            self.checkpoint()?;
            if resource.deleted {
                continue;
            }

            let file_name = self.kind.new_file_name();
            let uid = resource
                .entity
                .uid
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let entity = self.kind.assign_uid(&resource.entity, &uid);

            tracing::debug!(id = resource.id, file_name, "assigning file name");
            self.local
                .assign_name(resource.id, &file_name, &entity)
                .await?;
        }
        Ok(())
    }

    async fn list_remote(
        &mut self,
        stored: Option<&SyncState>,
        remote: Option<&SyncState>,
    ) -> Result<Listing, SyncError> {
        let stored_token = stored.and_then(SyncState::sync_token);
        if let (Some(token), Some(_)) = (stored_token, remote.and_then(SyncState::sync_token)) {
            match self.race(self.remote.list_changes(token)).await? {
                Ok(changes) => {
                    tracing::info!(
                        changed = changes.changed.len(),
                        removed = changes.removed.len(),
                        "listed changes since last sync"
                    );
                    return Ok(Listing::Incremental(changes));
                }
                Err(DavError::InvalidSyncToken) => {
                    tracing::info!("sync token expired, falling back to full listing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.list_complete().await
    }

    async fn list_complete(&mut self) -> Result<Listing, SyncError> {
        for resource in self.local.list_all().await? {
            if resource.is_remotely_present() {
                self.local
                    .update_flags(resource.id, resource.flags & !FLAG_REMOTELY_PRESENT)
                    .await?;
            }
        }

        let entries = self
            .race(self.remote.list_resources(self.kind.component()))
            .await??;
        tracing::info!(members = entries.len(), "listed remote collection");

        for entry in &entries {
            self.checkpoint()?;
            if let Some(resource) = self.local.find_by_name(entry.href.file_name()).await? {
                self.local
                    .update_flags(resource.id, resource.flags | FLAG_REMOTELY_PRESENT)
                    .await?;
            }
        }

        Ok(Listing::Complete(entries))
    }

    async fn delete_remote(
        &mut self,
        deletion: Deletion,
        downloads: &mut BTreeMap<String, Href>,
    ) -> Result<(), SyncError> {
        self.checkpoint()?;
        let Deletion {
            resource,
            file_name,
        } = deletion;
        let href = match self.remote.member_href(&file_name) {
            Ok(href) => href,
            Err(e) => return self.resource_error(Href::new(file_name), e.into()),
        };

        match self
            .race(self.remote.delete(&href, resource.etag.as_ref()))
            .await?
        {
            Ok(()) => {
                tracing::debug!(%href, "deleted remotely");
                self.local.delete(resource.id).await?;
                self.report.stats.remote_deletes += 1;
            }
            Err(DavError::NotFound(_)) => {
                tracing::debug!(%href, "already gone from the server");
                self.local.delete(resource.id).await?;
                self.report.stats.local_deletes += 1;
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(%href, "remote copy changed since local deletion, keeping it");
                self.local.delete(resource.id).await?;
                self.report.stats.conflicts += 1;
                downloads.insert(file_name, href);
            }
            Err(e) => self.resource_error(href, e.into())?,
        }
        Ok(())
    }

    async fn upload(
        &mut self,
        upload: Upload,
        downloads: &mut BTreeMap<String, Href>,
    ) -> Result<(), SyncError> {
        self.checkpoint()?;
        let Upload {
            resource,
            file_name,
            precondition,
        } = upload;
        let href = match self.remote.member_href(&file_name) {
            Ok(href) => href,
            Err(e) => return self.resource_error(Href::new(file_name), e.into()),
        };

        let body = self.kind.serialize(&resource.entity);
        match self
            .race(self.remote.put(&href, body, &precondition))
            .await?
        {
            Ok(etag) => {
                tracing::debug!(%href, ?etag, "uploaded");
                self.local.clear_dirty(resource.id, etag.as_ref()).await?;
                self.local
                    .update_flags(resource.id, resource.flags | FLAG_REMOTELY_PRESENT)
                    .await?;
                downloads.remove(&file_name);
                self.report.stats.uploads += 1;
            }
            Err(e) if e.is_conflict() => {
                self.report.stats.conflicts += 1;
                match downloads.contains_key(&file_name) {
                    true => tracing::warn!(%href, "upload rejected, taking the newer remote version"),
                    false => tracing::warn!(%href, "upload rejected, keeping local changes"),
                }
                self.resource_error(href, e.into())?;
            }
            Err(e) => self.resource_error(href, e.into())?,
        }
        Ok(())
    }

    /// Downloads and applies the planned members. Returns the file names
    /// that were applied.
    async fn download(
        &mut self,
        downloads: BTreeMap<String, Href>,
    ) -> Result<HashSet<String>, SyncError> {
        let hrefs: Vec<Href> = downloads.into_values().collect();
        let mut applied = HashSet::new();

        for chunk in hrefs.chunks(MAX_MULTIGET_RESOURCES) {
            self.checkpoint()?;
            match chunk {
                [href] => match self.race(self.remote.fetch(href)).await? {
                    Ok(fetched) => self.apply(fetched, &mut applied).await?,
                    Err(DavError::NotFound(_)) => {
                        tracing::info!(%href, "member vanished before download");
                        self.report.stats.skipped_downloads += 1;
                    }
                    Err(e) => {
                        self.report.stats.skipped_downloads += 1;
                        self.missed_downloads = true;
                        self.resource_error(href.clone(), e.into())?;
                    }
                },
                batch => match self.race(self.remote.fetch_many(batch)).await? {
                    Ok(fetched) => {
                        for resource in fetched {
                            self.checkpoint()?;
                            self.apply(resource, &mut applied).await?;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, count = batch.len(), "multiget failed");
                        let e = SyncError::from(e);
                        if e.is_fatal() {
                            return Err(e);
                        }

                        self.missed_downloads = true;
                        let message = e.to_string();
                        for href in batch {
                            let error = match e.is_retryable() {
                                true => SyncError::Transport(DavError::Transport(message.clone())),
                                false => SyncError::Protocol(message.clone()),
                            };
                            self.report.stats.skipped_downloads += 1;
                            self.report.errors.push(ResourceError {
                                href: href.clone(),
                                error,
                            });
                        }
                    }
                },
            }
        }

        Ok(applied)
    }

    async fn apply(
        &mut self,
        fetched: FetchedResource,
        applied: &mut HashSet<String>,
    ) -> Result<(), SyncError> {
        let FetchedResource {
            href,
            etag,
            data,
            success,
        } = fetched;

        let (etag, data) = match (success, etag, data) {
            (true, Some(etag), Some(data)) => (etag, data),
            (false, ..) => {
                tracing::info!(%href, "member vanished before download");
                self.report.stats.skipped_downloads += 1;
                return Ok(());
            }
            (true, etag, data) => {
                tracing::warn!(
                    %href,
                    has_etag = etag.is_some(),
                    has_data = data.is_some(),
                    "incomplete multiget entry"
                );
                self.report.stats.skipped_downloads += 1;
                self.missed_downloads = true;
                let message = match etag {
                    None => format!("multiget entry for {href} carries no ETag"),
                    Some(_) => format!("multiget entry for {href} carries no data"),
                };
                return self.resource_error(href, SyncError::Protocol(message));
            }
        };

        let entities = match self.kind.parse(&data) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(%href, err = %e, "ignoring invalid body");
                self.report.stats.skipped_downloads += 1;
                let message = e.to_string();
                return self.resource_error(href.clone(), SyncError::Parse { href, message });
            }
        };

        let mut entities = entities.into_iter();
        let (Some(entity), None) = (entities.next(), entities.next()) else {
            tracing::warn!(%href, "body does not hold exactly one item, ignoring");
            self.report.stats.skipped_downloads += 1;
            return Ok(());
        };

        let file_name = href.file_name().to_string();
        match self.local.find_by_name(&file_name).await? {
            Some(existing) => {
                tracing::debug!(%href, %etag, "updating local resource");
                self.local.update(existing.id, entity, &etag).await?;
                self.report.stats.local_updates += 1;
            }
            None => {
                tracing::debug!(%href, %etag, "adding local resource");
                self.local
                    .add(&file_name, entity, &etag, FLAG_REMOTELY_PRESENT)
                    .await?;
                self.report.stats.local_inserts += 1;
            }
        }
        applied.insert(file_name);
        Ok(())
    }

    async fn commit(&self, state: Option<&SyncState>) -> Result<(), SyncError> {
        let encoded = state
            .map(SyncState::encode)
            .transpose()
            .map_err(|e| SyncError::Protocol(format!("cannot encode sync state: {e}")))?;
        tracing::debug!(state = ?encoded, "storing change token");
        self.local.set_change_token(encoded.as_deref()).await?;
        Ok(())
    }

    /// Records a failure of one resource, or aborts the pass if it is fatal.
    fn resource_error(&mut self, href: Href, error: SyncError) -> Result<(), SyncError> {
        if error.is_fatal() {
            return Err(error);
        }
        tracing::warn!(%href, err = %error, "resource failed");
        self.report.errors.push(ResourceError { href, error });
        Ok(())
    }
}
