use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use menu_api_server::build_router;
use menu_api_server::config::{Settings, StoreBackend};
use menu_api_server::database::{
    DbPool, InMemoryMenuItemRepository, MenuItemRepository, PgMenuItemRepository,
};
use menu_api_server::services::MenuService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,menu_api_server=debug".to_string()),
        )
        .with_target(true)
        .init();

    info!("🚀 Starting menu API server...");

    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let repository: Arc<dyn MenuItemRepository> = match settings.database.backend {
        StoreBackend::Postgres => {
            let db_pool = DbPool::new(&settings.database).await?;
            db_pool.run_migrations().await?;
            info!("✅ Database connection established");
            Arc::new(PgMenuItemRepository::new(db_pool.get_pool().clone()))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; items will not survive a restart");
            Arc::new(InMemoryMenuItemRepository::new())
        }
    };

    let service = Arc::new(MenuService::new(
        repository,
        settings.menu.delete_policy,
    ));
    info!(
        "Delete policy: {:?}",
        service.delete_policy()
    );

    let app = build_router(service);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
