//! PostgreSQL implementation of the menu item repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::models::{DepthUpdate, MenuItem};
use super::repository::MenuItemRepository;
use crate::utils::error::MenuError;

const COLUMNS: &str = "id, name, parent_id, depth, created_at, updated_at";

pub struct PgMenuItemRepository {
    pool: PgPool,
}

impl PgMenuItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> MenuError {
    error!("Database error {}: {}", context, e);
    MenuError::Database(e.to_string())
}

/// The UNIQUE constraint on `name` is the source of truth for uniqueness;
/// the service-level check is only the fast path surface.
fn map_write_error(name: &str, e: sqlx::Error) -> MenuError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some("23505") {
            return MenuError::DuplicateName(name.to_string());
        }
    }
    db_error("writing menu item", e)
}

#[async_trait]
impl MenuItemRepository for PgMenuItemRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItem>, MenuError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {COLUMNS} FROM menu_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding item by id", e))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<MenuItem>, MenuError> {
        // Exact, case-sensitive match.
        sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {COLUMNS} FROM menu_items WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding item by name", e))
    }

    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<MenuItem>, MenuError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {COLUMNS} FROM menu_items WHERE parent_id = $1 ORDER BY created_at, id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding children", e))
    }

    async fn list_all(&self) -> Result<Vec<MenuItem>, MenuError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {COLUMNS} FROM menu_items ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing items", e))
    }

    async fn count(&self) -> Result<u64, MenuError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting items", e))?;
        Ok(count as u64)
    }

    async fn insert(&self, item: &MenuItem) -> Result<MenuItem, MenuError> {
        sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            INSERT INTO menu_items (id, name, parent_id, depth, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(item.id)
        .bind(&item.name)
        .bind(item.parent_id)
        .bind(item.depth)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(&item.name, e))
    }

    async fn update_with_depths(
        &self,
        item: &MenuItem,
        cascade: &[DepthUpdate],
        touched_at: DateTime<Utc>,
    ) -> Result<MenuItem, MenuError> {
        // One transaction: the item row and the whole depth cascade land
        // together or not at all.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("starting transaction", e))?;

        let updated = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            UPDATE menu_items
            SET name = $2, parent_id = $3, depth = $4, updated_at = $5
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(item.id)
        .bind(&item.name)
        .bind(item.parent_id)
        .bind(item.depth)
        .bind(item.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(&item.name, e))?
        .ok_or(MenuError::NotFound)?;

        for update in cascade {
            sqlx::query("UPDATE menu_items SET depth = $2, updated_at = $3 WHERE id = $1")
                .bind(update.id)
                .bind(update.depth)
                .bind(touched_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("cascading depth update", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("committing update", e))?;
        Ok(updated)
    }

    async fn delete_all(&self, ids: &[Uuid]) -> Result<u64, MenuError> {
        // Single statement, so the closed descendant set goes atomically
        // and the self-FK is satisfied regardless of row order.
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting items", e))?;
        Ok(result.rows_affected())
    }
}
