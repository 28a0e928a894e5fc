// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::ETag;
use sqlx::SqlitePool;

use crate::kind::Entity;
use crate::local::{FLAG_REMOTELY_PRESENT, LocalResource};

const COLUMNS: &str = "id, file_name, uid, etag, dirty, deleted, flags, body";

#[derive(Debug, Clone)]
pub struct Resources {
    pool: SqlitePool,
}

impl Resources {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        collection_id: i64,
        id: i64,
    ) -> Result<Option<ResourceRecord>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM resources WHERE collection_id = ? AND id = ?;");

        sqlx::query_as(&sql)
            .bind(collection_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_name(
        &self,
        collection_id: i64,
        file_name: &str,
    ) -> Result<Option<ResourceRecord>, sqlx::Error> {
        let sql =
            format!("SELECT {COLUMNS} FROM resources WHERE collection_id = ? AND file_name = ?;");

        sqlx::query_as(&sql)
            .bind(collection_id)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(
        &self,
        collection_id: i64,
        filter: ResourceFilter,
    ) -> Result<Vec<ResourceRecord>, sqlx::Error> {
        let condition = match filter {
            ResourceFilter::All => "",
            ResourceFilter::Deleted => "AND deleted = 1",
            ResourceFilter::Dirty => "AND dirty = 1 AND deleted = 0",
            ResourceFilter::Unnamed => "AND file_name IS NULL AND deleted = 0",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM resources WHERE collection_id = ? {condition} ORDER BY id;"
        );

        sqlx::query_as(&sql)
            .bind(collection_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count(
        &self,
        collection_id: i64,
        filter: ResourceFilter,
    ) -> Result<i64, sqlx::Error> {
        let condition = match filter {
            ResourceFilter::All => "AND deleted = 0",
            ResourceFilter::Deleted => "AND deleted = 1",
            ResourceFilter::Dirty => "AND dirty = 1 AND deleted = 0",
            ResourceFilter::Unnamed => "AND file_name IS NULL AND deleted = 0",
        };
        let sql = format!("SELECT COUNT(*) FROM resources WHERE collection_id = ? {condition};");

        sqlx::query_scalar(&sql)
            .bind(collection_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Inserts a resource. Remote resources come with a file name and `ETag`,
    /// local ones without.
    pub async fn insert(
        &self,
        collection_id: i64,
        record: &NewResource<'_>,
    ) -> Result<i64, sqlx::Error> {
        const SQL: &str = "
INSERT INTO resources (collection_id, file_name, uid, etag, dirty, deleted, flags, body)
VALUES (?, ?, ?, ?, ?, 0, ?, ?)
RETURNING id;
";

        sqlx::query_scalar(SQL)
            .bind(collection_id)
            .bind(record.file_name)
            .bind(record.entity.uid.as_deref())
            .bind(record.etag.map(ETag::as_str))
            .bind(record.dirty)
            .bind(i64::from(record.flags))
            .bind(record.entity.body.as_str())
            .fetch_one(&self.pool)
            .await
    }

    /// Stores a new body. Local edits mark the resource dirty, downloads
    /// replace the `ETag` and clear it.
    pub async fn update_entity(
        &self,
        id: i64,
        entity: &Entity,
        change: EntityChange<'_>,
    ) -> Result<u64, sqlx::Error> {
        let result = match change {
            EntityChange::Local => {
                const SQL: &str = "
UPDATE resources SET uid = ?, body = ?, dirty = 1
WHERE id = ? AND deleted = 0;
";
                sqlx::query(SQL)
                    .bind(entity.uid.as_deref())
                    .bind(entity.body.as_str())
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            EntityChange::Remote(etag) => {
                const SQL: &str = "
UPDATE resources SET uid = ?, body = ?, etag = ?, dirty = 0, flags = flags | ?
WHERE id = ?;
";
                sqlx::query(SQL)
                    .bind(entity.uid.as_deref())
                    .bind(entity.body.as_str())
                    .bind(etag.as_str())
                    .bind(i64::from(FLAG_REMOTELY_PRESENT))
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    pub async fn assign_name(
        &self,
        id: i64,
        file_name: &str,
        entity: &Entity,
    ) -> Result<u64, sqlx::Error> {
        const SQL: &str = "
UPDATE resources SET file_name = ?, uid = ?, body = ?
WHERE id = ?;
";

        let result = sqlx::query(SQL)
            .bind(file_name)
            .bind(entity.uid.as_deref())
            .bind(entity.body.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Marks a resource as uploaded; the `ETag` is replaced, or forgotten if
    /// the server sent none.
    pub async fn clear_dirty(&self, id: i64, etag: Option<&ETag>) -> Result<u64, sqlx::Error> {
        const SQL: &str = "UPDATE resources SET dirty = 0, etag = ? WHERE id = ?;";

        let result = sqlx::query(SQL)
            .bind(etag.map(ETag::as_str))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_flags(&self, id: i64, flags: u32) -> Result<u64, sqlx::Error> {
        const SQL: &str = "UPDATE resources SET flags = ? WHERE id = ?;";

        let result = sqlx::query(SQL)
            .bind(i64::from(flags))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_deleted(&self, id: i64) -> Result<u64, sqlx::Error> {
        const SQL: &str = "UPDATE resources SET deleted = 1 WHERE id = ?;";

        let result = sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        const SQL: &str = "DELETE FROM resources WHERE id = ?;";

        let result = sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Subsets of a collection's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFilter {
    All,
    Deleted,
    Dirty,
    Unnamed,
}

/// Origin of a body update.
#[derive(Debug, Clone, Copy)]
pub enum EntityChange<'a> {
    /// Edited locally.
    Local,
    /// Downloaded with the given `ETag`.
    Remote(&'a ETag),
}

#[derive(Debug)]
pub struct NewResource<'a> {
    pub file_name: Option<&'a str>,
    pub entity: &'a Entity,
    pub etag: Option<&'a ETag>,
    pub dirty: bool,
    pub flags: u32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ResourceRecord {
    pub id: i64,
    pub file_name: Option<String>,
    pub uid: Option<String>,
    pub etag: Option<String>,
    pub dirty: bool,
    pub deleted: bool,
    pub flags: i64,
    pub body: String,
}

impl From<ResourceRecord> for LocalResource {
    fn from(record: ResourceRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            etag: record.etag.map(ETag::from),
            dirty: record.dirty,
            deleted: record.deleted,
            flags: u32::try_from(record.flags).unwrap_or_default(),
            entity: Entity::new(record.uid, record.body),
        }
    }
}
