//! Embedded document store for listings and reviews.
//!
//! Each tree maps a UUID key to the JSON-encoded document.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Geometry, Listing, Review};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Case-insensitive country match, as typed into the search box
#[derive(Debug, Clone)]
pub enum CountryFilter {
    Pattern(Regex),
    /// Lowercased text for input that is not a valid pattern
    Literal(String),
}

impl CountryFilter {
    pub fn new(text: &str) -> Self {
        match RegexBuilder::new(text).case_insensitive(true).build() {
            Ok(regex) => Self::Pattern(regex),
            Err(_) => Self::Literal(text.to_lowercase()),
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(&listing.country),
            Self::Literal(text) => listing.country.to_lowercase().contains(text.as_str()),
        }
    }
}

#[derive(Clone)]
pub struct ListingStore {
    db: sled::Db,
    listings: sled::Tree,
    reviews: sled::Tree,
}

impl ListingStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        info!("Opening listing store at {}", path.as_ref().display());
        Self::from_db(sled::open(path)?)
    }

    /// Store backed by a temporary directory removed on drop
    pub fn temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let listings = db.open_tree("listings")?;
        let reviews = db.open_tree("reviews")?;
        Ok(Self {
            db,
            listings,
            reviews,
        })
    }

    pub fn find_listings(&self, filter: Option<&CountryFilter>) -> StoreResult<Vec<Listing>> {
        let mut listings = Vec::new();
        for entry in self.listings.iter() {
            let (_, data) = entry?;
            let listing: Listing = serde_json::from_slice(&data)?;
            if filter.map_or(true, |f| f.matches(&listing)) {
                listings.push(listing);
            }
        }
        Ok(listings)
    }

    pub fn find_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        get(&self.listings, id)
    }

    /// Insert or replace a listing
    pub fn save_listing(&self, listing: &Listing) -> StoreResult<()> {
        put(&self.listings, listing.id, listing)?;
        debug!("Saved listing {}", listing.id);
        Ok(())
    }

    /// Apply `change` to the currently stored document and write it back
    /// atomically. Returns the updated listing, or `None` if it does not
    /// exist. `change` may run more than once under contention.
    pub fn modify_listing<F>(&self, id: Uuid, mut change: F) -> StoreResult<Option<Listing>>
    where
        F: FnMut(&mut Listing),
    {
        let mut failure = None;
        let updated = self.listings.update_and_fetch(id.as_bytes(), |current| {
            failure = None;
            let data = current?;
            let encoded = serde_json::from_slice::<Listing>(data).and_then(|mut listing| {
                change(&mut listing);
                serde_json::to_vec(&listing)
            });
            match encoded {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    failure = Some(e);
                    Some(data.to_vec())
                }
            }
        })?;

        if let Some(e) = failure {
            return Err(e.into());
        }
        match updated {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Replace only the geometry of the stored listing
    pub fn set_geometry(&self, id: Uuid, geometry: Option<Geometry>) -> StoreResult<Option<Listing>> {
        self.modify_listing(id, |listing| listing.geometry = geometry.clone())
    }

    /// Remove a listing and every review attached to it
    pub fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let Some(data) = self.listings.remove(id.as_bytes())? else {
            return Ok(None);
        };
        let listing: Listing = serde_json::from_slice(&data)?;

        for review_id in &listing.reviews {
            self.reviews.remove(review_id.as_bytes())?;
        }
        debug!(
            "Deleted listing {} and {} reviews",
            listing.id,
            listing.reviews.len()
        );
        Ok(Some(listing))
    }

    /// Store a review and attach it to the listing. Returns the updated
    /// listing, or `None` (and stores nothing) if the listing is gone.
    pub fn insert_review(&self, listing_id: Uuid, review: &Review) -> StoreResult<Option<Listing>> {
        put(&self.reviews, review.id, review)?;

        let updated = self.modify_listing(listing_id, |listing| {
            if !listing.reviews.contains(&review.id) {
                listing.reviews.push(review.id);
            }
        })?;

        if updated.is_none() {
            self.reviews.remove(review.id.as_bytes())?;
        }
        Ok(updated)
    }

    pub fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        get(&self.reviews, id)
    }

    /// Detach a review from its listing and delete it. Returns the removed
    /// review, or `None` when the listing does not exist or does not hold it.
    pub fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> StoreResult<Option<Review>> {
        let mut attached = false;
        self.modify_listing(listing_id, |listing| {
            attached = listing.reviews.contains(&review_id);
            listing.reviews.retain(|id| *id != review_id);
        })?;

        if !attached {
            return Ok(None);
        }
        match self.reviews.remove(review_id.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Resolve the review ids on a listing, skipping dangling references
    pub fn reviews_for(&self, listing: &Listing) -> StoreResult<Vec<Review>> {
        let mut reviews = Vec::with_capacity(listing.reviews.len());
        for id in &listing.reviews {
            if let Some(review) = self.find_review(*id)? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }

    /// Drop all listings and reviews, then insert the given listings
    pub fn replace_listings(&self, listings: &[Listing]) -> StoreResult<usize> {
        self.listings.clear()?;
        self.reviews.clear()?;
        for listing in listings {
            put(&self.listings, listing.id, listing)?;
        }
        self.flush()?;
        Ok(listings.len())
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, id: Uuid) -> StoreResult<Option<T>> {
    match tree.get(id.as_bytes())? {
        Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
        None => Ok(None),
    }
}

fn put<T: Serialize>(tree: &sled::Tree, id: Uuid, value: &T) -> StoreResult<()> {
    let data = serde_json::to_vec(value)?;
    tree.insert(id.as_bytes(), data)?;
    Ok(())
}
