//! Geocoding client and listing geometry reconciliation.

mod client;
mod reconcile;

pub use client::{
    GeocodeError, Geocoder, NominatimClient, DEFAULT_GEOCODER_URL, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use reconcile::{GeometryReconciler, ReconcilePath, Reconciliation};
