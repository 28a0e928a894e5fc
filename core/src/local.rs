// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The contract between the sync manager and a local store.

use std::sync::Arc;

use async_trait::async_trait;
use davsync_dav::ETag;

use crate::error::StorageError;
use crate::kind::{Entity, ResourceKind};

/// Local identifier of a resource.
pub type ResourceId = i64;

/// Set on resources seen in the latest complete remote listing.
pub const FLAG_REMOTELY_PRESENT: u32 = 1;

/// One locally stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResource {
    /// Local identifier.
    pub id: ResourceId,
    /// File name within the remote collection; `None` until first upload.
    pub file_name: Option<String>,
    /// Last `ETag` known to match the remote copy.
    pub etag: Option<ETag>,
    /// Modified locally since the last successful sync.
    pub dirty: bool,
    /// Deleted locally, pending remote deletion.
    pub deleted: bool,
    /// Bit set, see [`FLAG_REMOTELY_PRESENT`].
    pub flags: u32,
    /// The stored item.
    pub entity: Entity,
}

impl LocalResource {
    /// Whether the resource was present in the latest complete listing.
    #[must_use]
    pub const fn is_remotely_present(&self) -> bool {
        self.flags & FLAG_REMOTELY_PRESENT != 0
    }
}

/// A local collection of resources sharing one remote URL, one resource kind
/// and one stored change token.
///
/// Every method failing with [`StorageError`] aborts the running pass.
#[async_trait]
pub trait LocalCollection: Send + Sync {
    /// Kind of the stored resources.
    fn kind(&self) -> ResourceKind;

    /// URL of the remote collection, as recorded with the local collection.
    fn url(&self) -> Option<String>;

    /// Resources deleted locally and not yet deleted remotely.
    async fn list_deleted(&self) -> Result<Vec<LocalResource>, StorageError>;

    /// Resources that have no file name yet (never uploaded), excluding
    /// deleted ones.
    async fn list_unnamed(&self) -> Result<Vec<LocalResource>, StorageError>;

    /// Resources modified locally, excluding deleted ones.
    async fn list_dirty(&self) -> Result<Vec<LocalResource>, StorageError>;

    /// Every resource, deleted ones included.
    async fn list_all(&self) -> Result<Vec<LocalResource>, StorageError>;

    /// The stored change token, if any.
    async fn change_token(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the stored change token.
    async fn set_change_token(&self, token: Option<&str>) -> Result<(), StorageError>;

    /// Looks a resource up by its file name.
    async fn find_by_name(&self, file_name: &str) -> Result<Option<LocalResource>, StorageError>;

    /// Gives an unnamed resource its file name and an entity carrying a UID.
    /// The resource stays dirty.
    async fn assign_name(
        &self,
        id: ResourceId,
        file_name: &str,
        entity: &Entity,
    ) -> Result<(), StorageError>;

    /// Adds a resource downloaded from the server; it is not dirty.
    async fn add(
        &self,
        file_name: &str,
        entity: Entity,
        etag: &ETag,
        flags: u32,
    ) -> Result<ResourceId, StorageError>;

    /// Replaces a resource with the downloaded version: stores the entity and
    /// `ETag`, clears the dirty flag and sets [`FLAG_REMOTELY_PRESENT`].
    async fn update(&self, id: ResourceId, entity: Entity, etag: &ETag)
    -> Result<(), StorageError>;

    /// Marks a resource as uploaded with the given `ETag`.
    async fn clear_dirty(&self, id: ResourceId, etag: Option<&ETag>) -> Result<(), StorageError>;

    /// Replaces the flag bits of a resource.
    async fn update_flags(&self, id: ResourceId, flags: u32) -> Result<(), StorageError>;

    /// Removes a resource for good.
    async fn delete(&self, id: ResourceId) -> Result<(), StorageError>;

    /// Hook run after the remote changes were applied.
    async fn post_process(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl<T: LocalCollection + ?Sized> LocalCollection for Arc<T> {
    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn url(&self) -> Option<String> {
        (**self).url()
    }

    async fn list_deleted(&self) -> Result<Vec<LocalResource>, StorageError> {
        (**self).list_deleted().await
    }

    async fn list_unnamed(&self) -> Result<Vec<LocalResource>, StorageError> {
        (**self).list_unnamed().await
    }

    async fn list_dirty(&self) -> Result<Vec<LocalResource>, StorageError> {
        (**self).list_dirty().await
    }

    async fn list_all(&self) -> Result<Vec<LocalResource>, StorageError> {
        (**self).list_all().await
    }

    async fn change_token(&self) -> Result<Option<String>, StorageError> {
        (**self).change_token().await
    }

    async fn set_change_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        (**self).set_change_token(token).await
    }

    async fn find_by_name(&self, file_name: &str) -> Result<Option<LocalResource>, StorageError> {
        (**self).find_by_name(file_name).await
    }

    async fn assign_name(
        &self,
        id: ResourceId,
        file_name: &str,
        entity: &Entity,
    ) -> Result<(), StorageError> {
        (**self).assign_name(id, file_name, entity).await
    }

    async fn add(
        &self,
        file_name: &str,
        entity: Entity,
        etag: &ETag,
        flags: u32,
    ) -> Result<ResourceId, StorageError> {
        (**self).add(file_name, entity, etag, flags).await
    }

    async fn update(&self, id: ResourceId, entity: Entity, etag: &ETag)
    -> Result<(), StorageError> {
        (**self).update(id, entity, etag).await
    }

    async fn clear_dirty(&self, id: ResourceId, etag: Option<&ETag>) -> Result<(), StorageError> {
        (**self).clear_dirty(id, etag).await
    }

    async fn update_flags(&self, id: ResourceId, flags: u32) -> Result<(), StorageError> {
        (**self).update_flags(id, flags).await
    }

    async fn delete(&self, id: ResourceId) -> Result<(), StorageError> {
        (**self).delete(id).await
    }

    async fn post_process(&self) -> Result<(), StorageError> {
        (**self).post_process().await
    }
}
