pub mod menu_service;
pub mod tree;

pub use menu_service::{DeletePolicy, MenuItemChanges, MenuService};
pub use tree::MenuTreeNode;
