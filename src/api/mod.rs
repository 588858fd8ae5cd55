//! HTTP API for listings and their reviews.

mod auth;
mod error;
mod json;
mod listings;
mod reviews;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::geocode::{Geocoder, GeometryReconciler};
use crate::store::ListingStore;

pub use auth::{CurrentUser, USER_HEADER};
pub use error::ApiError;
pub use json::ApiJson;

/// Application state shared across handlers
pub struct AppState {
    pub store: ListingStore,
    pub reconciler: GeometryReconciler,
}

impl AppState {
    pub fn new(store: ListingStore, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            store,
            reconciler: GeometryReconciler::new(geocoder),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/listings",
            get(listings::index).post(listings::create_listing),
        )
        .route(
            "/listings/{id}",
            get(listings::show_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/listings/{id}/edit", get(listings::edit_listing))
        .route("/listings/{id}/reviews", post(reviews::create_review))
        .route(
            "/listings/{id}/reviews/{review_id}",
            delete(reviews::delete_review),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
pub(crate) fn test_state(geocoder: Arc<dyn Geocoder>) -> Arc<AppState> {
    let store = ListingStore::temporary().expect("temporary store");
    Arc::new(AppState::new(store, geocoder))
}
