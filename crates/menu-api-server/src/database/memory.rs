//! In-memory repository backing the `memory` database backend and the test
//! suite. A single lock over an insertion-ordered Vec makes each batched
//! operation atomic, mirroring the transaction guarantees of the Postgres
//! implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::models::{DepthUpdate, MenuItem};
use super::repository::MenuItemRepository;
use crate::utils::error::MenuError;

#[derive(Default)]
pub struct InMemoryMenuItemRepository {
    items: RwLock<Vec<MenuItem>>,
}

impl InMemoryMenuItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MenuItemRepository for InMemoryMenuItemRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItem>, MenuError> {
        Ok(self.items.read().iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<MenuItem>, MenuError> {
        Ok(self.items.read().iter().find(|i| i.name == name).cloned())
    }

    async fn find_children(&self, parent_id: Uuid) -> Result<Vec<MenuItem>, MenuError> {
        Ok(self
            .items
            .read()
            .iter()
            .filter(|i| i.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<MenuItem>, MenuError> {
        Ok(self.items.read().clone())
    }

    async fn count(&self) -> Result<u64, MenuError> {
        Ok(self.items.read().len() as u64)
    }

    async fn insert(&self, item: &MenuItem) -> Result<MenuItem, MenuError> {
        let mut items = self.items.write();
        // Same guarantee as the UNIQUE constraint on menu_items.name.
        if items.iter().any(|i| i.name == item.name) {
            return Err(MenuError::DuplicateName(item.name.clone()));
        }
        items.push(item.clone());
        Ok(item.clone())
    }

    async fn update_with_depths(
        &self,
        item: &MenuItem,
        cascade: &[DepthUpdate],
        touched_at: DateTime<Utc>,
    ) -> Result<MenuItem, MenuError> {
        let mut items = self.items.write();
        if items
            .iter()
            .any(|i| i.name == item.name && i.id != item.id)
        {
            return Err(MenuError::DuplicateName(item.name.clone()));
        }
        let row = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or(MenuError::NotFound)?;
        *row = item.clone();
        for update in cascade {
            if let Some(row) = items.iter_mut().find(|i| i.id == update.id) {
                row.depth = update.depth;
                row.updated_at = touched_at;
            }
        }
        Ok(item.clone())
    }

    async fn delete_all(&self, ids: &[Uuid]) -> Result<u64, MenuError> {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|i| !ids.contains(&i.id));
        Ok((before - items.len()) as u64)
    }
}
