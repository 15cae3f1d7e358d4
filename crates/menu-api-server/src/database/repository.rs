//! Menu item repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{DepthUpdate, MenuItem};
use crate::utils::error::MenuError;

/// Persistence port for the tree store. Lookups return items in persistence
/// order (`created_at` ascending). The batched operations
/// (`update_with_depths`, `delete_all`) must be atomic: either every row
/// change lands or none does.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItem>, MenuError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<MenuItem>, MenuError>;
    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<MenuItem>, MenuError>;
    async fn list_all(&self) -> Result<Vec<MenuItem>, MenuError>;
    async fn count(&self) -> Result<u64, MenuError>;
    async fn insert(&self, item: &MenuItem) -> Result<MenuItem, MenuError>;

    /// Persist an updated item together with the depth cascade for its
    /// descendants. Cascaded rows also get `updated_at` refreshed to
    /// `touched_at`.
    async fn update_with_depths(
        &self,
        item: &MenuItem,
        cascade: &[DepthUpdate],
        touched_at: DateTime<Utc>,
    ) -> Result<MenuItem, MenuError>;

    /// Delete every listed id, returning the number of rows removed.
    async fn delete_all(&self, ids: &[Uuid]) -> Result<u64, MenuError>;
}
