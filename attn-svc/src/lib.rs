//! attn-svc library - Attendance Reconciliation Service
//!
//! Kiosks post a student id and a selfie; the service marks the student
//! present in today's column of the attendance sheet and replaces their
//! stored photo, one submission at a time.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod blob;
pub mod config;
pub mod error;
pub mod lock;
pub mod photo;
pub mod reconcile;
pub mod sheet;

use blob::BlobStore;
use reconcile::ReconciliationService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReconciliationService>,
    /// Same store the service writes to; used to serve photo links
    pub blobs: Arc<dyn BlobStore>,
    pub startup_time: DateTime<Utc>,
    /// Most recent failed submission, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
    pub body_limit_bytes: usize,
}

impl AppState {
    pub fn new(
        service: Arc<ReconciliationService>,
        blobs: Arc<dyn BlobStore>,
        body_limit_bytes: usize,
    ) -> Self {
        Self {
            service,
            blobs,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            body_limit_bytes,
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.body_limit_bytes;

    Router::new()
        .merge(api::attendance_routes())
        .merge(api::photo_routes())
        .merge(api::roster_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
