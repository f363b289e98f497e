//! A thin HTTP façade over a remote object store. Each endpoint validates its
//! parameters, performs one delegated call to the [`storage::ObjectStore`]
//! client, and translates the outcome into an HTTP status plus JSON body.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::GatewayConfig;
use crate::storage::ObjectStore;

pub mod config;
pub mod endpoints;
pub mod model;
pub mod storage;

/// Shared per-request state: the store client and the configuration loaded
/// once at startup. Both are read-only after construction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub config: GatewayConfig,
}

/// The canonical route table. Every storage operation is registered here and
/// nowhere else.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/file/listfiles", get(endpoints::list_files))
        .route("/file/listdir", get(endpoints::list_directories))
        .route("/file/download", get(endpoints::download))
        .route("/file/upload", post(endpoints::upload))
        .route("/file/delete/file", post(endpoints::delete_file))
        .route("/file/delete/directory", post(endpoints::delete_directory))
        .route("/file/copy", post(endpoints::copy_file))
        .route("/file/move", post(endpoints::move_file))
        .route("/file/mkdir", post(endpoints::make_directory))
        .with_state(state)
}
