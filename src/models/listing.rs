//! Listing document stored in the listings tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Geometry, Review, ValidationError};

pub const DEFAULT_IMAGE_FILENAME: &str = "listingimage";
pub const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1500530855697-b586d89ba3ee";

/// Hosted image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_url", deserialize_with = "url_or_default")]
    pub url: String,
}

fn default_filename() -> String {
    DEFAULT_IMAGE_FILENAME.to_string()
}

fn default_url() -> String {
    DEFAULT_IMAGE_URL.to_string()
}

fn url_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let url = String::deserialize(deserializer)?;
    Ok(if url.is_empty() { default_url() } else { url })
}

impl Image {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            filename: filename.into(),
            url: if url.is_empty() { default_url() } else { url },
        }
    }

    /// Lower-resolution variant for the edit form preview.
    pub fn thumbnail_url(&self) -> String {
        self.url.replacen("/upload", "/upload/w_250", 1)
    }
}

impl Default for Image {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            url: default_url(),
        }
    }
}

/// A property listing.
///
/// `geometry` is `None` only for legacy documents written before coordinates
/// were tracked; new listings always carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Image,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub reviews: Vec<Uuid>,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl Listing {
    /// Create a listing from validated input. Geometry is left unset; the
    /// caller decides it through the reconciler.
    pub fn new(input: ListingInput, owner: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            image: input.image.unwrap_or_default(),
            price: input.price,
            location: input.location,
            country: input.country,
            reviews: Vec::new(),
            owner: owner.to_string(),
            geometry: None,
        }
    }

    /// Overwrite the editable fields. The image is replaced only when a new
    /// one is supplied.
    pub fn apply(&mut self, input: ListingInput) {
        self.title = input.title;
        self.description = input.description;
        self.price = input.price;
        self.location = input.location;
        self.country = input.country;
        if let Some(image) = input.image {
            self.image = image;
        }
    }

    /// Fill in the stored default for listings that end up without geometry.
    pub fn with_default_geometry(mut self) -> Self {
        if self.geometry.is_none() {
            self.geometry = Some(Geometry::default());
        }
        self
    }

    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner == user
    }
}

/// Submitted listing fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country: String,
}

impl ListingInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("\"title\" is required"));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(ValidationError::new(
                    "\"price\" must be greater than or equal to 0",
                ));
            }
        }
        Ok(())
    }
}

/// Listing with its reviews resolved, as returned by the show endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub review_details: Vec<Review>,
}
