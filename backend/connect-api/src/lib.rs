pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod gateways;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod utils;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::gateways::{Gateways, IdentityVerifier, PushGateway, RealtimeStore};
use crate::repository::Repositories;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub identity: Arc<dyn IdentityVerifier>,
    pub push: Arc<dyn PushGateway>,
    pub realtime: Arc<dyn RealtimeStore>,
}

impl AppState {
    pub fn new(repos: Repositories, gateways: Gateways) -> Self {
        Self {
            repos,
            identity: gateways.identity,
            push: gateways.push,
            realtime: gateways.realtime,
        }
    }
}

/// Full HTTP application: health check plus the authenticated API
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
