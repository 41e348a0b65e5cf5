//! Shared snapshot sync server.
//! Central store for the template tree, checklist, and doctor registry.

use std::sync::Arc;

use sync_server::{router, AppState, SnapshotStore};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("sync_server=debug,tower_http=info")
        .init();

    let data_dir = std::env::var("SYNC_DATA_DIR").unwrap_or_else(|_| "sync_data".to_string());
    let bind_addr =
        std::env::var("SYNC_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

    let store = Arc::new(SnapshotStore::new(&data_dir)?);
    info!("Storage initialized at: {}", data_dir);

    let app = router(AppState::new(store));

    info!("Sync server listening on http://{}", bind_addr);
    info!("  GET/POST /api/data      - template tree snapshot");
    info!("  GET/POST /api/checklist - checklist document");
    info!("  GET/POST /api/doctors   - doctor color registry");
    info!("  GET      /ws            - push event stream");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
