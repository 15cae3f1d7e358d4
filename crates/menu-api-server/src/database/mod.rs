pub mod memory;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryMenuItemRepository;
pub use models::{DepthUpdate, MenuItem};
pub use pool::DbPool;
pub use postgres::PgMenuItemRepository;
pub use repository::MenuItemRepository;
