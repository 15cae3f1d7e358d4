//! Hierarchical tree construction.
//!
//! Trees are assembled from flat item lists without call-stack recursion:
//! nodes are folded into their parents in descending-depth order, which is
//! safe for arbitrarily deep or wide forests. Sibling order is whatever
//! order the items arrive in (persistence order from the repository).

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use uuid::Uuid;

use crate::database::MenuItem;
use crate::utils::error::MenuError;

/// Wire shape of one tree node.
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    pub id: Uuid,
    pub name: String,
    pub parent: Option<String>,
    pub depth: i32,
    pub children: Vec<MenuTreeNode>,
}

impl MenuTreeNode {
    /// Total number of nodes in this tree, itself included. Worklist
    /// traversal, no recursion.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Build one tree per parentless item.
pub fn build_forest(items: &[MenuItem]) -> Vec<MenuTreeNode> {
    let names = name_index(items);
    assemble(items.iter().collect(), &names)
}

/// Build the single tree rooted at `root_id`, or None if the root is not in
/// `items`. The root's own parent name is resolved against the full item
/// list even though the parent lies outside the subtree.
pub fn build_subtree(items: &[MenuItem], root_id: Uuid) -> Result<Option<MenuTreeNode>, MenuError> {
    if !items.iter().any(|i| i.id == root_id) {
        return Ok(None);
    }

    let mut children_of: HashMap<Uuid, Vec<&MenuItem>> = HashMap::new();
    for item in items {
        if let Some(pid) = item.parent_id {
            children_of.entry(pid).or_default().push(item);
        }
    }

    // Closed descendant set, breadth-first with a revisit guard.
    let mut in_subtree: HashSet<Uuid> = HashSet::new();
    let mut queue = VecDeque::from([root_id]);
    while let Some(id) = queue.pop_front() {
        if !in_subtree.insert(id) {
            return Err(MenuError::CycleDetected);
        }
        if let Some(children) = children_of.get(&id) {
            queue.extend(children.iter().map(|c| c.id));
        }
    }

    let names = name_index(items);
    let subset: Vec<&MenuItem> = items.iter().filter(|i| in_subtree.contains(&i.id)).collect();
    let mut roots = assemble(subset, &names);
    Ok(roots.pop())
}

fn name_index(items: &[MenuItem]) -> HashMap<Uuid, String> {
    items.iter().map(|i| (i.id, i.name.clone())).collect()
}

/// Fold leaf-first: iterating in descending-depth order guarantees every
/// node's children are complete before the node is pushed into its own
/// parent. The sort is stable, so siblings keep their incoming order.
/// Returned are the nodes whose parent is not part of `items`.
fn assemble(items: Vec<&MenuItem>, names: &HashMap<Uuid, String>) -> Vec<MenuTreeNode> {
    let mut nodes: HashMap<Uuid, MenuTreeNode> = items
        .iter()
        .map(|item| {
            (
                item.id,
                MenuTreeNode {
                    id: item.id,
                    name: item.name.clone(),
                    parent: item.parent_id.and_then(|pid| names.get(&pid).cloned()),
                    depth: item.depth,
                    children: Vec::new(),
                },
            )
        })
        .collect();

    let in_set: HashSet<Uuid> = items.iter().map(|i| i.id).collect();

    // Top-level ids in incoming (persistence) order.
    let top_ids: Vec<Uuid> = items
        .iter()
        .filter(|i| !i.parent_id.is_some_and(|pid| in_set.contains(&pid)))
        .map(|i| i.id)
        .collect();

    let mut order: Vec<&MenuItem> = items;
    order.sort_by_key(|i| std::cmp::Reverse(i.depth));

    for item in order {
        if let Some(pid) = item.parent_id.filter(|pid| in_set.contains(pid)) {
            if let Some(node) = nodes.remove(&item.id) {
                if let Some(parent) = nodes.get_mut(&pid) {
                    parent.children.push(node);
                }
            }
        }
    }

    top_ids
        .into_iter()
        .filter_map(|id| nodes.remove(&id))
        .collect()
}
