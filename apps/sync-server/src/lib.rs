//! Shared snapshot sync server.
//! Persists the template tree, checklist, and doctor registry, and pushes
//! full replacement snapshots to every connected client.

pub mod api;
pub mod storage;
pub mod ws;

use std::sync::Arc;

use axum::{routing::get, Router};
use replication::PushEvent;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

pub use storage::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub events: broadcast::Sender<PushEvent>,
}

impl AppState {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { store, events }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/data",
            get(api::get_templates).post(api::update_templates),
        )
        .route(
            "/api/checklist",
            get(api::get_checklist).post(api::update_checklist),
        )
        .route(
            "/api/doctors",
            get(api::get_doctors).post(api::update_doctors),
        )
        .route("/ws", get(ws::ws_handler))
        // CORS for local development
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
