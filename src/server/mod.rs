//! HTTP API in front of the recommendation model

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::TrainingConfig;
use crate::metrics::ServiceMetrics;
use crate::models::{ModelStore, RecommendationModel};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Served model; replaced wholesale on retrain
    pub model: Arc<RwLock<RecommendationModel>>,
    pub store: Arc<ModelStore>,
    /// Settings used when retraining
    pub training: TrainingConfig,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        model: RecommendationModel,
        store: ModelStore,
        training: TrainingConfig,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            model: Arc::new(RwLock::new(model)),
            store: Arc::new(store),
            training,
            metrics,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/recommend", post(handlers::recommend))
        .route("/model/info", get(handlers::model_info))
        .route("/model/retrain", post(handlers::retrain))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
