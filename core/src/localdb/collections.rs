// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct Collections {
    pool: SqlitePool,
}

impl Collections {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a collection, or refreshes its kind and display name.
    pub async fn upsert(
        &self,
        url: &str,
        kind: &str,
        display_name: Option<&str>,
    ) -> Result<CollectionRecord, sqlx::Error> {
        const SQL: &str = "
INSERT INTO collections (url, kind, display_name)
VALUES (?, ?, ?)
ON CONFLICT(url) DO UPDATE SET
    kind = excluded.kind,
    display_name = COALESCE(excluded.display_name, collections.display_name)
RETURNING id, url, kind, display_name, color, change_token;
";

        sqlx::query_as(SQL)
            .bind(url)
            .bind(kind)
            .bind(display_name)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<CollectionRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT id, url, kind, display_name, color, change_token
FROM collections
WHERE id = ?;
";

        sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<CollectionRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT id, url, kind, display_name, color, change_token
FROM collections
ORDER BY id;
";

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }

    pub async fn change_token(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        const SQL: &str = "SELECT change_token FROM collections WHERE id = ?;";

        let token: Option<Option<String>> = sqlx::query_scalar(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token.flatten())
    }

    pub async fn set_change_token(&self, id: i64, token: Option<&str>) -> Result<(), sqlx::Error> {
        const SQL: &str = "UPDATE collections SET change_token = ? WHERE id = ?;";

        sqlx::query(SQL)
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gives the collection a color unless it already has one.
    pub async fn ensure_color(&self, id: i64, color: &str) -> Result<(), sqlx::Error> {
        const SQL: &str = "UPDATE collections SET color = ? WHERE id = ? AND color IS NULL;";

        sqlx::query(SQL)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        const SQL: &str = "DELETE FROM collections WHERE id = ?;";

        sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

/// A locally mirrored collection.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CollectionRecord {
    /// Local identifier.
    pub id: i64,
    /// URL of the remote collection.
    pub url: String,
    /// Collection type tag, see [`ResourceKind::tag`](crate::ResourceKind::tag).
    pub kind: String,
    /// Name shown to the user.
    pub display_name: Option<String>,
    /// Display color of calendars.
    pub color: Option<String>,
    /// Stored sync state.
    pub change_token: Option<String>,
}
