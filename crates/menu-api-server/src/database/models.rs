use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A node in the menu forest. `depth` is derived from the parent chain and
/// never accepted from clients; `parent_id == None` iff `depth == 0`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Build a fresh item under the given parent (or a new root).
    /// `created_at` and `updated_at` are set to the same instant.
    pub fn new(name: impl Into<String>, parent: Option<&MenuItem>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id: parent.map(|p| p.id),
            depth: parent.map(|p| p.depth + 1).unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One step of a depth cascade: the new depth for a descendant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthUpdate {
    pub id: Uuid,
    pub depth: i32,
}
