// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The remote side of a pass.

use std::sync::Arc;

use async_trait::async_trait;
use davsync_dav::{
    DavCollection, DavError, ETag, FetchedResource, Href, Precondition, RemoteChanges, RemoteEntry,
};

use crate::state::SyncState;

/// Operations the sync manager needs from a remote collection.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Href of the member stored under `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be turned into an href.
    fn member_href(&self, file_name: &str) -> Result<Href, DavError>;

    /// Queries the collection's change token.
    async fn query_sync_state(&self) -> Result<Option<SyncState>, DavError>;

    /// Lists every member, restricted to `filter` components for calendars.
    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<RemoteEntry>, DavError>;

    /// Lists members changed or removed since `sync_token`.
    ///
    /// Fails with [`DavError::InvalidSyncToken`] if the token expired.
    async fn list_changes(&self, sync_token: &str) -> Result<RemoteChanges, DavError>;

    /// Downloads one member; the response must carry an `ETag`.
    async fn fetch(&self, href: &Href) -> Result<FetchedResource, DavError>;

    /// Downloads several members at once.
    async fn fetch_many(&self, hrefs: &[Href]) -> Result<Vec<FetchedResource>, DavError>;

    /// Uploads a member body; returns the new `ETag` if the server sent one.
    async fn put(
        &self,
        href: &Href,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError>;

    /// Deletes a member, conditionally on `etag`.
    async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError>;
}

#[async_trait]
impl RemoteCollection for DavCollection {
    fn member_href(&self, file_name: &str) -> Result<Href, DavError> {
        DavCollection::member_href(self, file_name)
    }

    async fn query_sync_state(&self) -> Result<Option<SyncState>, DavError> {
        let tokens = self.query_tokens().await?;
        Ok(SyncState::from_tokens(&tokens))
    }

    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<RemoteEntry>, DavError> {
        self.list(filter).await
    }

    async fn list_changes(&self, sync_token: &str) -> Result<RemoteChanges, DavError> {
        self.sync_collection(Some(sync_token)).await
    }

    async fn fetch(&self, href: &Href) -> Result<FetchedResource, DavError> {
        self.get(href).await
    }

    async fn fetch_many(&self, hrefs: &[Href]) -> Result<Vec<FetchedResource>, DavError> {
        self.multiget(hrefs).await
    }

    async fn put(
        &self,
        href: &Href,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError> {
        DavCollection::put(self, href, body, precondition).await
    }

    async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        DavCollection::delete(self, href, etag).await
    }
}

#[async_trait]
impl<T: RemoteCollection + ?Sized> RemoteCollection for Arc<T> {
    fn member_href(&self, file_name: &str) -> Result<Href, DavError> {
        (**self).member_href(file_name)
    }

    async fn query_sync_state(&self) -> Result<Option<SyncState>, DavError> {
        (**self).query_sync_state().await
    }

    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<RemoteEntry>, DavError> {
        (**self).list_resources(filter).await
    }

    async fn list_changes(&self, sync_token: &str) -> Result<RemoteChanges, DavError> {
        (**self).list_changes(sync_token).await
    }

    async fn fetch(&self, href: &Href) -> Result<FetchedResource, DavError> {
        (**self).fetch(href).await
    }

    async fn fetch_many(&self, hrefs: &[Href]) -> Result<Vec<FetchedResource>, DavError> {
        (**self).fetch_many(hrefs).await
    }

    async fn put(
        &self,
        href: &Href,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError> {
        (**self).put(href, body, precondition).await
    }

    async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        (**self).delete(href, etag).await
    }
}
