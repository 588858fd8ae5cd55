//! Core data models for listings, reviews and their geometry.

pub mod geometry;
pub mod listing;
pub mod review;

use thiserror::Error;

pub use geometry::{is_fallback, is_incomplete, Geometry, GeometryKind, FALLBACK_COORDINATE};
pub use listing::{Image, Listing, ListingDetail, ListingInput};
pub use review::{Review, ReviewInput};

/// Submitted data rejected by input validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
