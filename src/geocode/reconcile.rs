//! Decides when a listing's stored geometry must be (re)computed.
//!
//! Create, read and update all go through [`GeometryReconciler::reconcile`].
//! The paths differ on purpose:
//!
//! - create always geocodes a non-empty location and falls back to
//!   [`FALLBACK_COORDINATE`] on a miss;
//! - read only geocodes missing, malformed or fallback geometry, and falls
//!   back only when nothing was stored at all;
//! - update geocodes when the location text changed or the geometry is
//!   missing or on the fallback, and leaves the geometry alone on a miss.

use std::sync::Arc;

use geo_types::Coord;
use tracing::{debug, info, warn};

use super::Geocoder;
use crate::models::{is_fallback, is_incomplete, Geometry};

/// Which handler is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePath<'a> {
    Create,
    Read,
    Update { previous_location: Option<&'a str> },
}

/// Outcome of a reconciliation: the geometry to keep and whether it must be
/// written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub geometry: Option<Geometry>,
    pub needs_persist: bool,
}

impl Reconciliation {
    fn unchanged(current: Option<&Geometry>) -> Self {
        Self {
            geometry: current.cloned(),
            needs_persist: false,
        }
    }

    fn replaced(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            needs_persist: true,
        }
    }
}

#[derive(Clone)]
pub struct GeometryReconciler {
    geocoder: Arc<dyn Geocoder>,
}

impl GeometryReconciler {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn on_create(&self, location: &str) -> Reconciliation {
        self.reconcile(None, location, ReconcilePath::Create).await
    }

    pub async fn on_read(&self, current: Option<&Geometry>, location: &str) -> Reconciliation {
        self.reconcile(current, location, ReconcilePath::Read).await
    }

    pub async fn on_update(
        &self,
        current: Option<&Geometry>,
        location: &str,
        previous_location: Option<&str>,
    ) -> Reconciliation {
        self.reconcile(current, location, ReconcilePath::Update { previous_location })
            .await
    }

    /// Never fails: lookup errors count as "no match".
    pub async fn reconcile(
        &self,
        current: Option<&Geometry>,
        location: &str,
        path: ReconcilePath<'_>,
    ) -> Reconciliation {
        if location.trim().is_empty() {
            return Reconciliation::unchanged(current);
        }

        let should_lookup = match path {
            ReconcilePath::Create => true,
            ReconcilePath::Read => is_incomplete(current) || is_fallback(current),
            ReconcilePath::Update { previous_location } => {
                previous_location != Some(location) || is_fallback(current) || current.is_none()
            }
        };

        if !should_lookup {
            debug!(?path, "Stored geometry is current, skipping geocode");
            return Reconciliation::unchanged(current);
        }

        let found = self.lookup(location).await;

        match (path, found) {
            (ReconcilePath::Create, Some(coord)) => Reconciliation::replaced(Geometry::point(coord)),
            (ReconcilePath::Create, None) => {
                info!("No geocoding match for {:?}, using fallback", location);
                Reconciliation::replaced(Geometry::fallback())
            }

            (ReconcilePath::Read, Some(coord)) => {
                if current.and_then(Geometry::coord) == Some(coord) {
                    Reconciliation::unchanged(current)
                } else {
                    info!("Backfilled geometry for {:?}", location);
                    Reconciliation::replaced(Geometry::point(coord))
                }
            }
            (ReconcilePath::Read, None) => {
                if current.map_or(true, |g| !g.has_coordinates()) {
                    info!("Fallback geometry used for {:?}", location);
                    Reconciliation::replaced(Geometry::fallback())
                } else {
                    Reconciliation::unchanged(current)
                }
            }

            (ReconcilePath::Update { .. }, Some(coord)) => {
                Reconciliation::replaced(Geometry::point(coord))
            }
            // An update miss keeps whatever is stored, even nothing
            (ReconcilePath::Update { .. }, None) => Reconciliation::unchanged(current),
        }
    }

    async fn lookup(&self, location: &str) -> Option<Coord<f64>> {
        match self.geocoder.lookup(location).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Geocoding {:?} failed: {}", location, e);
                None
            }
        }
    }
}
