//! The tree store: create/update/retrieve/list/delete orchestration over
//! the repository port, with derived depth, recursive depth propagation,
//! root lookup and the two deletion policies.
//!
//! All descendant walks use explicit worklists instead of call-stack
//! recursion, and every revisited node is treated as a fatal
//! `CycleDetected` instead of looping.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::database::{DepthUpdate, MenuItem, MenuItemRepository};
use crate::services::tree::{build_forest, build_subtree, MenuTreeNode};
use crate::utils::error::MenuError;

/// Which deletion contract is active.
///
/// `Cascade` removes an item together with its entire descendant subtree in
/// one atomic operation. `Protect` is the strict alternative: deleting an
/// item with children is refused and leaves must go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    Cascade,
    Protect,
}

/// Read model for responses: `parent` carries the parent's *name*, while
/// the write side accepts a parent id.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemView {
    pub id: Uuid,
    pub name: String,
    pub parent: Option<String>,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MenuListing {
    pub data: Vec<MenuItemView>,
    pub hierarchy_tree: Vec<MenuTreeNode>,
}

#[derive(Debug, Serialize)]
pub struct MenuDetail {
    pub data: MenuItemView,
    pub depth: i32,
    pub root_item: String,
    pub hierarchy_tree: Vec<MenuTreeNode>,
}

/// Partial update. `parent` is tri-state: `None` keeps the current parent,
/// `Some(None)` moves the item to the top level, `Some(Some(id))`
/// reparents.
#[derive(Debug, Default)]
pub struct MenuItemChanges {
    pub name: Option<String>,
    pub parent: Option<Option<Uuid>>,
}

pub struct MenuService {
    repository: Arc<dyn MenuItemRepository>,
    delete_policy: DeletePolicy,
}

impl MenuService {
    pub fn new(repository: Arc<dyn MenuItemRepository>, delete_policy: DeletePolicy) -> Self {
        Self {
            repository,
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub async fn create(
        &self,
        name: String,
        parent: Option<Uuid>,
    ) -> Result<MenuItemView, MenuError> {
        if name.trim().is_empty() {
            return Err(MenuError::BlankName);
        }

        let parent_item = match parent {
            Some(pid) => Some(
                self.repository
                    .find_by_id(pid)
                    .await?
                    .ok_or(MenuError::ParentNotFound)?,
            ),
            None => None,
        };

        self.ensure_name_free(&name, None).await?;

        let item = MenuItem::new(name, parent_item.as_ref());
        let created = self.repository.insert(&item).await?;
        info!("Created menu item '{}' at depth {}", created.name, created.depth);
        Ok(view(created, parent_item.map(|p| p.name)))
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: MenuItemChanges,
    ) -> Result<MenuItemView, MenuError> {
        let item = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(MenuError::NotFound)?;

        let new_parent = match changes.parent {
            // Field absent: parent unchanged.
            None => match item.parent_id {
                Some(pid) => Some(self.repository.find_by_id(pid).await?.ok_or_else(|| {
                    MenuError::Database(format!("parent {} of item {} is missing", pid, id))
                })?),
                None => None,
            },
            // Explicit null: promote to a root.
            Some(None) => None,
            Some(Some(pid)) => {
                let parent = self
                    .repository
                    .find_by_id(pid)
                    .await?
                    .ok_or(MenuError::ParentNotFound)?;
                self.ensure_not_own_descendant(&item, &parent).await?;
                Some(parent)
            }
        };

        let new_name = match changes.name {
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(MenuError::BlankName);
                }
                if name != item.name {
                    self.ensure_name_free(&name, Some(id)).await?;
                }
                name
            }
            None => item.name.clone(),
        };

        let new_depth = new_parent.as_ref().map(|p| p.depth + 1).unwrap_or(0);
        let now = Utc::now();
        let updated = MenuItem {
            id: item.id,
            name: new_name,
            parent_id: new_parent.as_ref().map(|p| p.id),
            depth: new_depth,
            created_at: item.created_at,
            updated_at: now,
        };

        // The item's own depth changed, so every transitive descendant has
        // to be re-derived from it.
        let cascade = if new_depth != item.depth {
            self.depth_cascade(&updated).await?
        } else {
            Vec::new()
        };

        let saved = self
            .repository
            .update_with_depths(&updated, &cascade, now)
            .await?;
        if !cascade.is_empty() {
            info!(
                "Recomputed depth for {} descendant(s) of '{}'",
                cascade.len(),
                saved.name
            );
        }
        Ok(view(saved, new_parent.map(|p| p.name)))
    }

    pub async fn get(&self, id: Uuid) -> Result<MenuDetail, MenuError> {
        let item = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(MenuError::NotFound)?;

        let root = self.find_root(&item).await?;
        let items = self.repository.list_all().await?;
        let hierarchy_tree = build_subtree(&items, id)?
            .map(|tree| vec![tree])
            .unwrap_or_default();
        let parent_name = item
            .parent_id
            .and_then(|pid| items.iter().find(|i| i.id == pid).map(|i| i.name.clone()));
        let depth = item.depth;

        Ok(MenuDetail {
            data: view(item, parent_name),
            depth,
            root_item: root.name,
            hierarchy_tree,
        })
    }

    pub async fn list(&self) -> Result<MenuListing, MenuError> {
        let items = self.repository.list_all().await?;
        let names: HashMap<Uuid, String> =
            items.iter().map(|i| (i.id, i.name.clone())).collect();
        let hierarchy_tree = build_forest(&items);
        let data = items
            .into_iter()
            .map(|item| {
                let parent = item.parent_id.and_then(|pid| names.get(&pid).cloned());
                view(item, parent)
            })
            .collect();
        Ok(MenuListing {
            data,
            hierarchy_tree,
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), MenuError> {
        let item = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(MenuError::NotFound)?;

        let ids = match self.delete_policy {
            DeletePolicy::Protect => {
                if !self.repository.find_children(id).await?.is_empty() {
                    return Err(MenuError::HasChildren);
                }
                vec![id]
            }
            DeletePolicy::Cascade => {
                let mut ids = self.closed_descendant_set(&item).await?;
                // Children before the node itself.
                ids.reverse();
                ids
            }
        };

        let removed = self.repository.delete_all(&ids).await?;
        info!("Deleted {} menu item(s) rooted at '{}'", removed, item.name);
        Ok(())
    }

    /// Walk the parent chain to the parentless ancestor. Iteration is
    /// bounded by the total item count so a corrupted chain fails instead
    /// of spinning.
    pub async fn find_root(&self, item: &MenuItem) -> Result<MenuItem, MenuError> {
        let bound = self.repository.count().await?;
        let mut current = item.clone();
        let mut hops: u64 = 0;
        while let Some(pid) = current.parent_id {
            hops += 1;
            if hops > bound {
                return Err(MenuError::CycleDetected);
            }
            let child_id = current.id;
            current = self.repository.find_by_id(pid).await?.ok_or_else(|| {
                MenuError::Database(format!(
                    "parent {} referenced by item {} is missing",
                    pid, child_id
                ))
            })?;
        }
        Ok(current)
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), MenuError> {
        if let Some(existing) = self.repository.find_by_name(name).await? {
            if exclude != Some(existing.id) {
                return Err(MenuError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }

    /// Reparenting onto self or any transitive descendant would close a
    /// cycle; reject before anything is written.
    async fn ensure_not_own_descendant(
        &self,
        item: &MenuItem,
        new_parent: &MenuItem,
    ) -> Result<(), MenuError> {
        if new_parent.id == item.id {
            return Err(MenuError::CycleDetected);
        }
        let bound = self.repository.count().await?;
        let mut hops: u64 = 0;
        let mut cursor = new_parent.parent_id;
        while let Some(pid) = cursor {
            if pid == item.id {
                return Err(MenuError::CycleDetected);
            }
            hops += 1;
            if hops > bound {
                return Err(MenuError::CycleDetected);
            }
            cursor = self
                .repository
                .find_by_id(pid)
                .await?
                .and_then(|ancestor| ancestor.parent_id);
        }
        Ok(())
    }

    /// Breadth-first depth re-derivation for every descendant, each level
    /// computed from the just-derived depth of its parent.
    async fn depth_cascade(&self, item: &MenuItem) -> Result<Vec<DepthUpdate>, MenuError> {
        let mut updates = Vec::new();
        let mut seen = HashSet::from([item.id]);
        let mut queue = VecDeque::from([(item.id, item.depth)]);
        while let Some((id, depth)) = queue.pop_front() {
            for child in self.repository.find_children(id).await? {
                if !seen.insert(child.id) {
                    return Err(MenuError::CycleDetected);
                }
                updates.push(DepthUpdate {
                    id: child.id,
                    depth: depth + 1,
                });
                queue.push_back((child.id, depth + 1));
            }
        }
        Ok(updates)
    }

    /// The item plus all transitive children, parent-first.
    async fn closed_descendant_set(&self, item: &MenuItem) -> Result<Vec<Uuid>, MenuError> {
        let mut ids = vec![item.id];
        let mut seen = HashSet::from([item.id]);
        let mut queue = VecDeque::from([item.id]);
        while let Some(id) = queue.pop_front() {
            for child in self.repository.find_children(id).await? {
                if !seen.insert(child.id) {
                    return Err(MenuError::CycleDetected);
                }
                ids.push(child.id);
                queue.push_back(child.id);
            }
        }
        Ok(ids)
    }
}

fn view(item: MenuItem, parent_name: Option<String>) -> MenuItemView {
    MenuItemView {
        id: item.id,
        name: item.name,
        parent: parent_name,
        depth: item.depth,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::MockMenuItemRepository;
    use crate::database::InMemoryMenuItemRepository;

    fn service(policy: DeletePolicy) -> MenuService {
        MenuService::new(Arc::new(InMemoryMenuItemRepository::new()), policy)
    }

    async fn seed_chain(service: &MenuService) -> (Uuid, Uuid, Uuid) {
        let root = service.create("Root".into(), None).await.unwrap();
        let child = service.create("Child".into(), Some(root.id)).await.unwrap();
        let grandchild = service
            .create("Grandchild".into(), Some(child.id))
            .await
            .unwrap();
        (root.id, child.id, grandchild.id)
    }

    #[tokio::test]
    async fn create_derives_depth_from_parent_chain() {
        let service = service(DeletePolicy::Cascade);
        let (root, child, grandchild) = seed_chain(&service).await;

        let listing = service.list().await.unwrap();
        let depth_of = |id: Uuid| listing.data.iter().find(|i| i.id == id).unwrap().depth;
        assert_eq!(depth_of(root), 0);
        assert_eq!(depth_of(child), 1);
        assert_eq!(depth_of(grandchild), 2);
    }

    #[tokio::test]
    async fn create_sets_both_timestamps_to_the_same_instant() {
        let service = service(DeletePolicy::Cascade);
        let item = service.create("Root".into(), None).await.unwrap();
        assert_eq!(item.created_at, item.updated_at);
    }

    #[tokio::test]
    async fn create_serializes_parent_as_name() {
        let service = service(DeletePolicy::Cascade);
        let root = service.create("Root".into(), None).await.unwrap();
        assert_eq!(root.parent, None);

        let child = service.create("Child".into(), Some(root.id)).await.unwrap();
        assert_eq!(child.parent.as_deref(), Some("Root"));
    }

    #[tokio::test]
    async fn create_with_unknown_parent_writes_nothing() {
        let service = service(DeletePolicy::Cascade);
        let err = service
            .create("Orphan".into(), Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::ParentNotFound));
        assert!(service.list().await.unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_leaves_store_unchanged() {
        let service = service(DeletePolicy::Cascade);
        let root = service.create("Root".into(), None).await.unwrap();
        service.create("Child".into(), Some(root.id)).await.unwrap();

        let err = service.create("Child".into(), None).await.unwrap_err();
        assert!(matches!(err, MenuError::DuplicateName(_)));
        assert_eq!(service.list().await.unwrap().data.len(), 2);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = service(DeletePolicy::Cascade);
        let err = service.create("   ".into(), None).await.unwrap_err();
        assert!(matches!(err, MenuError::BlankName));
    }

    #[tokio::test]
    async fn root_lookup_is_idempotent() {
        let service = service(DeletePolicy::Cascade);
        let (root_id, _, grandchild_id) = seed_chain(&service).await;

        let detail = service.get(grandchild_id).await.unwrap();
        assert_eq!(detail.root_item, "Root");
        assert_eq!(detail.depth, 2);

        // root(root(item)) == root(item)
        let root_detail = service.get(root_id).await.unwrap();
        assert_eq!(root_detail.root_item, "Root");
    }

    #[tokio::test]
    async fn retrieve_returns_the_single_subtree() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, _) = seed_chain(&service).await;

        let detail = service.get(child_id).await.unwrap();
        assert_eq!(detail.hierarchy_tree.len(), 1);
        assert_eq!(detail.hierarchy_tree[0].name, "Child");
        assert_eq!(detail.hierarchy_tree[0].node_count(), 2);
        assert_eq!(detail.data.parent.as_deref(), Some("Root"));
    }

    #[tokio::test]
    async fn retrieve_unknown_id_is_not_found() {
        let service = service(DeletePolicy::Cascade);
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MenuError::NotFound));
    }

    #[tokio::test]
    async fn listing_builds_one_tree_per_root() {
        let service = service(DeletePolicy::Cascade);
        seed_chain(&service).await;

        let listing = service.list().await.unwrap();
        assert_eq!(listing.data.len(), 3);
        assert_eq!(listing.hierarchy_tree.len(), 1);
        assert_eq!(listing.hierarchy_tree[0].node_count(), 3);
    }

    #[tokio::test]
    async fn cascade_delete_removes_exactly_the_closed_descendant_set() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, grandchild_id) = seed_chain(&service).await;
        let bystander = service.create("Bystander".into(), None).await.unwrap();

        service.delete(child_id).await.unwrap();

        let listing = service.list().await.unwrap();
        let ids: Vec<Uuid> = listing.data.iter().map(|i| i.id).collect();
        assert!(!ids.contains(&child_id));
        assert!(!ids.contains(&grandchild_id));
        assert!(ids.contains(&bystander.id));
        assert!(matches!(
            service.get(grandchild_id).await.unwrap_err(),
            MenuError::NotFound
        ));
    }

    #[tokio::test]
    async fn cascade_delete_of_root_empties_the_store() {
        let service = service(DeletePolicy::Cascade);
        let (root_id, _, _) = seed_chain(&service).await;

        service.delete(root_id).await.unwrap();
        let listing = service.list().await.unwrap();
        assert!(listing.data.is_empty());
        assert!(listing.hierarchy_tree.is_empty());
    }

    #[tokio::test]
    async fn protect_policy_refuses_parents_and_allows_leaves() {
        let service = service(DeletePolicy::Protect);
        let (root_id, _, grandchild_id) = seed_chain(&service).await;

        let err = service.delete(root_id).await.unwrap_err();
        assert!(matches!(err, MenuError::HasChildren));
        assert_eq!(service.list().await.unwrap().data.len(), 3);

        service.delete(grandchild_id).await.unwrap();
        assert_eq!(service.list().await.unwrap().data.len(), 2);
    }

    #[tokio::test]
    async fn reparenting_recomputes_descendant_depths() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, grandchild_id) = seed_chain(&service).await;
        let other = service.create("Other".into(), None).await.unwrap();
        let anchor = service
            .create("Anchor".into(), Some(other.id))
            .await
            .unwrap();

        // Move Child (and with it Grandchild) under Anchor (depth 1).
        let updated = service
            .update(
                child_id,
                MenuItemChanges {
                    name: None,
                    parent: Some(Some(anchor.id)),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.depth, 2);
        assert_eq!(updated.parent.as_deref(), Some("Anchor"));

        let listing = service.list().await.unwrap();
        let grandchild = listing
            .data
            .iter()
            .find(|i| i.id == grandchild_id)
            .unwrap();
        assert_eq!(grandchild.depth, 3);
    }

    #[tokio::test]
    async fn clearing_the_parent_promotes_the_subtree() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, grandchild_id) = seed_chain(&service).await;

        let updated = service
            .update(
                child_id,
                MenuItemChanges {
                    name: None,
                    parent: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.depth, 0);
        assert_eq!(updated.parent, None);

        let listing = service.list().await.unwrap();
        assert_eq!(listing.hierarchy_tree.len(), 2);
        let grandchild = listing
            .data
            .iter()
            .find(|i| i.id == grandchild_id)
            .unwrap();
        assert_eq!(grandchild.depth, 1);
    }

    #[tokio::test]
    async fn rename_keeps_parent_and_depth() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, _) = seed_chain(&service).await;

        let updated = service
            .update(
                child_id,
                MenuItemChanges {
                    name: Some("Renamed".into()),
                    parent: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.depth, 1);
        assert_eq!(updated.parent.as_deref(), Some("Root"));
    }

    #[tokio::test]
    async fn rename_to_existing_name_is_rejected() {
        let service = service(DeletePolicy::Cascade);
        let (_, child_id, _) = seed_chain(&service).await;

        let err = service
            .update(
                child_id,
                MenuItemChanges {
                    name: Some("Root".into()),
                    parent: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn reparenting_under_own_descendant_is_rejected() {
        let service = service(DeletePolicy::Cascade);
        let (root_id, _, grandchild_id) = seed_chain(&service).await;

        let err = service
            .update(
                root_id,
                MenuItemChanges {
                    name: None,
                    parent: Some(Some(grandchild_id)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::CycleDetected));

        // Self-parenting is the degenerate case of the same cycle.
        let err = service
            .update(
                root_id,
                MenuItemChanges {
                    name: None,
                    parent: Some(Some(root_id)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::CycleDetected));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let service = service(DeletePolicy::Cascade);
        let err = service
            .update(Uuid::new_v4(), MenuItemChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::NotFound));
    }

    #[tokio::test]
    async fn repository_failures_surface_as_database_errors() {
        let mut mock = MockMenuItemRepository::new();
        mock.expect_find_by_id()
            .returning(|_| Err(MenuError::Database("connection reset".into())));
        let service = MenuService::new(Arc::new(mock), DeletePolicy::Cascade);

        let err = service
            .create("Child".into(), Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::Database(_)));
    }
}
