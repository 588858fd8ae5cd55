//! Wanderlust - property listings with geocoded map locations
//!
//! This library provides the shared models, storage, geocoding and HTTP API
//! for the server and seed binaries.

pub mod api;
pub mod config;
pub mod geocode;
pub mod models;
pub mod store;

pub use geocode::{Geocoder, GeometryReconciler, NominatimClient, Reconciliation};
pub use models::{Geometry, Listing, Review, FALLBACK_COORDINATE};
pub use store::ListingStore;
