// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed local collections.

mod collections;
mod resources;

use std::path::Path;

use async_trait::async_trait;
use davsync_dav::ETag;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use crate::localdb::collections::CollectionRecord;
use crate::localdb::collections::Collections;
use crate::localdb::resources::{EntityChange, NewResource, ResourceFilter, Resources};

use crate::error::StorageError;
use crate::kind::{Entity, ResourceKind};
use crate::local::{LocalCollection, LocalResource, ResourceId};

/// Color given to calendars that have none.
const DEFAULT_CALENDAR_COLOR: &str = "#C3EA6E";

/// The local database holding every mirrored collection.
#[derive(Debug, Clone)]
pub struct LocalDb {
    pool: SqlitePool,

    collections: Collections,
    resources: Resources,
}

impl LocalDb {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(filename: Option<&Path>) -> Result<Self, StorageError> {
        let pool = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Other(format!(
                        "Failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }

            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await?
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            // every connection would get its own empty database
            let options = SqliteConnectOptions::new().in_memory(true);
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        let collections = Collections::new(pool.clone());
        let resources = Resources::new(pool.clone());
        Ok(Self {
            pool,
            collections,
            resources,
        })
    }

    /// Opens the local side of a remote collection, registering it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn collection(
        &self,
        url: &str,
        kind: ResourceKind,
        display_name: Option<&str>,
    ) -> Result<SqliteCollection, StorageError> {
        let record = self
            .collections
            .upsert(url, kind.tag(), display_name)
            .await?;
        tracing::debug!(id = record.id, url, %kind, "opened local collection");

        Ok(SqliteCollection {
            id: record.id,
            url: record.url,
            kind,
            collections: self.collections.clone(),
            resources: self.resources.clone(),
        })
    }

    /// Every registered collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_collections(&self) -> Result<Vec<CollectionRecord>, StorageError> {
        Ok(self.collections.list().await?)
    }

    /// Forgets a collection and every resource it holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn remove_collection(&self, url: &str) -> Result<bool, StorageError> {
        let found = self
            .collections
            .list()
            .await?
            .into_iter()
            .find(|c| c.url == url);
        match found {
            Some(record) => {
                self.collections.delete(record.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Closes the database connection.
    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

/// Pending local changes of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Live resources.
    pub resources: i64,
    /// Resources modified since the last sync.
    pub dirty: i64,
    /// Resources deleted since the last sync.
    pub deleted: i64,
}

/// One collection of the local database.
#[derive(Debug, Clone)]
pub struct SqliteCollection {
    id: i64,
    url: String,
    kind: ResourceKind,
    collections: Collections,
    resources: Resources,
}

impl SqliteCollection {
    /// Local identifier of the collection.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// The stored collection metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection was removed meanwhile.
    pub async fn record(&self) -> Result<CollectionRecord, StorageError> {
        self.collections
            .get(self.id)
            .await?
            .ok_or_else(|| StorageError::Other(format!("collection {} was removed", self.url)))
    }

    /// Stores an item created locally. It is uploaded by the next pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create(&self, entity: Entity) -> Result<ResourceId, StorageError> {
        let id = self
            .resources
            .insert(
                self.id,
                &NewResource {
                    file_name: None,
                    entity: &entity,
                    etag: None,
                    dirty: true,
                    flags: 0,
                },
            )
            .await?;
        tracing::debug!(id, "created local resource");
        Ok(id)
    }

    /// Replaces an item with a local edit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the resource does not exist or
    /// is deleted.
    pub async fn edit(&self, id: ResourceId, entity: Entity) -> Result<(), StorageError> {
        self.ensure_owned(id).await?;
        match self
            .resources
            .update_entity(id, &entity, EntityChange::Local)
            .await?
        {
            0 => Err(StorageError::NotFound(id)),
            _ => Ok(()),
        }
    }

    /// Deletes an item locally. The deletion is pushed by the next pass.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the resource does not exist.
    pub async fn remove(&self, id: ResourceId) -> Result<(), StorageError> {
        self.ensure_owned(id).await?;
        self.resources.mark_deleted(id).await?;
        Ok(())
    }

    /// Looks a resource up by its local identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: ResourceId) -> Result<Option<LocalResource>, StorageError> {
        let record = self.resources.get(self.id, id).await?;
        Ok(record.map(LocalResource::from))
    }

    /// Counts of live, modified and deleted resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending(&self) -> Result<PendingChanges, StorageError> {
        Ok(PendingChanges {
            resources: self.resources.count(self.id, ResourceFilter::All).await?,
            dirty: self.resources.count(self.id, ResourceFilter::Dirty).await?,
            deleted: self.resources.count(self.id, ResourceFilter::Deleted).await?,
        })
    }

    async fn list(&self, filter: ResourceFilter) -> Result<Vec<LocalResource>, StorageError> {
        let records = self.resources.list(self.id, filter).await?;
        Ok(records.into_iter().map(LocalResource::from).collect())
    }

    async fn ensure_owned(&self, id: ResourceId) -> Result<(), StorageError> {
        match self.resources.get(self.id, id).await? {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(id)),
        }
    }

    fn expect_one(id: ResourceId, affected: u64) -> Result<(), StorageError> {
        match affected {
            0 => Err(StorageError::NotFound(id)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl LocalCollection for SqliteCollection {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn url(&self) -> Option<String> {
        Some(self.url.clone())
    }

    async fn list_deleted(&self) -> Result<Vec<LocalResource>, StorageError> {
        self.list(ResourceFilter::Deleted).await
    }

    async fn list_unnamed(&self) -> Result<Vec<LocalResource>, StorageError> {
        self.list(ResourceFilter::Unnamed).await
    }

    async fn list_dirty(&self) -> Result<Vec<LocalResource>, StorageError> {
        self.list(ResourceFilter::Dirty).await
    }

    async fn list_all(&self) -> Result<Vec<LocalResource>, StorageError> {
        self.list(ResourceFilter::All).await
    }

    async fn change_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.collections.change_token(self.id).await?)
    }

    async fn set_change_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        Ok(self.collections.set_change_token(self.id, token).await?)
    }

    async fn find_by_name(&self, file_name: &str) -> Result<Option<LocalResource>, StorageError> {
        let record = self.resources.get_by_name(self.id, file_name).await?;
        Ok(record.map(LocalResource::from))
    }

    async fn assign_name(
        &self,
        id: ResourceId,
        file_name: &str,
        entity: &Entity,
    ) -> Result<(), StorageError> {
        let affected = self.resources.assign_name(id, file_name, entity).await?;
        Self::expect_one(id, affected)
    }

    async fn add(
        &self,
        file_name: &str,
        entity: Entity,
        etag: &ETag,
        flags: u32,
    ) -> Result<ResourceId, StorageError> {
        let id = self
            .resources
            .insert(
                self.id,
                &NewResource {
                    file_name: Some(file_name),
                    entity: &entity,
                    etag: Some(etag),
                    dirty: false,
                    flags,
                },
            )
            .await?;
        Ok(id)
    }

    async fn update(
        &self,
        id: ResourceId,
        entity: Entity,
        etag: &ETag,
    ) -> Result<(), StorageError> {
        let affected = self
            .resources
            .update_entity(id, &entity, EntityChange::Remote(etag))
            .await?;
        Self::expect_one(id, affected)
    }

    async fn clear_dirty(&self, id: ResourceId, etag: Option<&ETag>) -> Result<(), StorageError> {
        let affected = self.resources.clear_dirty(id, etag).await?;
        Self::expect_one(id, affected)
    }

    async fn update_flags(&self, id: ResourceId, flags: u32) -> Result<(), StorageError> {
        let affected = self.resources.set_flags(id, flags).await?;
        Self::expect_one(id, affected)
    }

    async fn delete(&self, id: ResourceId) -> Result<(), StorageError> {
        self.resources.delete(id).await?;
        Ok(())
    }

    async fn post_process(&self) -> Result<(), StorageError> {
        if self.kind.is_calendar() {
            self.collections
                .ensure_color(self.id, DEFAULT_CALENDAR_COLOR)
                .await?;
        }
        Ok(())
    }
}
