//! Listing handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::{ApiError, ApiJson, AppState, CurrentUser};
use crate::models::{Listing, ListingDetail, ListingInput};
use crate::store::CountryFilter;

const LISTING_MISSING: &str = "The listing you requested does not exist!";

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditForm {
    pub listing: Listing,
    pub original_image_url: String,
}

/// All listings, optionally filtered by country
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IndexParams>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let filter = params
        .country
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(CountryFilter::new);

    let listings = state.store.find_listings(filter.as_ref())?;

    if listings.is_empty() && filter.is_some() {
        return Err(ApiError::NotFound("No listings found for your search!"));
    }

    Ok(Json(listings))
}

/// Show one listing, backfilling its geometry when missing or on the fallback
pub async fn show_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingDetail>, ApiError> {
    let listing = state
        .store
        .find_listing(id)?
        .ok_or(ApiError::NotFound(LISTING_MISSING))?;

    let outcome = state
        .reconciler
        .on_read(listing.geometry.as_ref(), &listing.location)
        .await;

    // Only the geometry is written; the document may have changed during the lookup
    let listing = if outcome.needs_persist {
        match state.store.set_geometry(id, outcome.geometry.clone()) {
            Ok(Some(updated)) => {
                info!("Updated geometry for listing: {}", updated.title);
                updated
            }
            Ok(None) => return Err(ApiError::NotFound(LISTING_MISSING)),
            Err(e) => {
                error!("Failed to store geometry for listing {}: {}", id, e);
                Listing {
                    geometry: outcome.geometry,
                    ..listing
                }
            }
        }
    } else {
        listing
    };

    let review_details = state.store.reviews_for(&listing)?;
    Ok(Json(ListingDetail {
        listing,
        review_details,
    }))
}

pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    input.validate()?;

    let mut listing = Listing::new(input, user.name());
    let outcome = state.reconciler.on_create(&listing.location).await;
    listing.geometry = outcome.geometry;
    let listing = listing.with_default_geometry();

    state.store.save_listing(&listing)?;
    info!("New listing created: {} ({})", listing.title, listing.id);

    Ok((StatusCode::CREATED, Json(listing)))
}

/// Listing data for the edit form, with a preview-sized image
pub async fn edit_listing(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EditForm>, ApiError> {
    let listing = state
        .store
        .find_listing(id)?
        .ok_or(ApiError::NotFound(LISTING_MISSING))?;
    ensure_owner(&listing, &user)?;

    let original_image_url = listing.image.thumbnail_url();
    Ok(Json(EditForm {
        listing,
        original_image_url,
    }))
}

pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<Json<Listing>, ApiError> {
    let current = state
        .store
        .find_listing(id)?
        .ok_or(ApiError::NotFound("Listing not found!"))?;
    ensure_owner(&current, &user)?;
    input.validate()?;

    let outcome = state
        .reconciler
        .on_update(
            current.geometry.as_ref(),
            &input.location,
            Some(&current.location),
        )
        .await;

    let listing = state
        .store
        .modify_listing(id, |listing| {
            listing.apply(input.clone());
            if outcome.needs_persist {
                listing.geometry = outcome.geometry.clone();
            }
        })?
        .ok_or(ApiError::NotFound("Listing not found!"))?;
    info!("Listing updated: {}", listing.id);

    Ok(Json(listing))
}

pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Listing>, ApiError> {
    let listing = state
        .store
        .find_listing(id)?
        .ok_or(ApiError::NotFound(LISTING_MISSING))?;
    ensure_owner(&listing, &user)?;

    let deleted = state
        .store
        .delete_listing(id)?
        .ok_or(ApiError::NotFound(LISTING_MISSING))?;
    info!(
        "Listing deleted: {} with {} reviews",
        deleted.id,
        deleted.reviews.len()
    );

    Ok(Json(deleted))
}

fn ensure_owner(listing: &Listing, user: &CurrentUser) -> Result<(), ApiError> {
    if listing.is_owned_by(user.name()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state;
    use crate::geocode::testing::StubGeocoder;
    use crate::geocode::{GeocodeError, Geocoder};
    use crate::models::{Geometry, Review, ReviewInput, FALLBACK_COORDINATE};
    use crate::store::ListingStore;
    use async_trait::async_trait;
    use geo_types::Coord;

    /// Geocoder during whose lookup a guest posts a review on the listing
    struct ReviewDuringLookup {
        store: ListingStore,
        listing_id: Uuid,
    }

    #[async_trait]
    impl Geocoder for ReviewDuringLookup {
        async fn lookup(&self, _query: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
            let review = Review::new(
                ReviewInput {
                    comment: "Posted meanwhile".into(),
                    rating: Some(4.0),
                },
                "guest",
            );
            self.store
                .insert_review(self.listing_id, &review)
                .expect("insert review");
            Ok(Some(Coord { x: 10.0, y: 20.0 }))
        }
    }

    fn state_with_concurrent_review(listing: &Listing) -> Arc<AppState> {
        let store = ListingStore::temporary().unwrap();
        store.save_listing(listing).unwrap();
        let geocoder = ReviewDuringLookup {
            store: store.clone(),
            listing_id: listing.id,
        };
        Arc::new(AppState::new(store, Arc::new(geocoder)))
    }

    fn owner() -> CurrentUser {
        CurrentUser("mirza".into())
    }

    fn input(location: &str) -> ListingInput {
        ListingInput {
            title: "Seaside flat".into(),
            location: location.into(),
            country: "France".into(),
            price: Some(120.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_geocodes_location() {
        let state = test_state(StubGeocoder::matching(2.3522, 48.8566));

        let (status, Json(listing)) =
            create_listing(State(state.clone()), owner(), ApiJson(input("Paris, France")))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(listing.owner, "mirza");
        assert_eq!(
            listing.geometry.as_ref().and_then(Geometry::coord),
            Some(Coord { x: 2.3522, y: 48.8566 })
        );
        assert_eq!(state.store.find_listing(listing.id).unwrap(), Some(listing));
    }

    #[tokio::test]
    async fn test_create_without_location_gets_default_geometry() {
        let stub = StubGeocoder::matching(1.0, 1.0);
        let state = test_state(stub.clone());

        let (_, Json(listing)) = create_listing(State(state), owner(), ApiJson(input("")))
            .await
            .unwrap();

        assert_eq!(listing.geometry, Some(Geometry::fallback()));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let state = test_state(StubGeocoder::no_match());
        let mut bad = input("Paris");
        bad.title = String::new();

        let err = create_listing(State(state), owner(), ApiJson(bad))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_show_backfills_legacy_listing() {
        let state = test_state(StubGeocoder::matching(10.0, 20.0));
        let mut legacy = Listing::new(input("Somewhere"), "mirza");
        legacy.geometry = None;
        state.store.save_listing(&legacy).unwrap();

        let Json(detail) = show_listing(State(state.clone()), Path(legacy.id))
            .await
            .unwrap();
        let expected = Some(Geometry::point(Coord { x: 10.0, y: 20.0 }));
        assert_eq!(detail.listing.geometry, expected);

        let stored = state.store.find_listing(legacy.id).unwrap().unwrap();
        assert_eq!(stored.geometry, expected);
    }

    #[tokio::test]
    async fn test_show_keeps_fallback_when_lookup_fails() {
        let state = test_state(StubGeocoder::failing());
        let listing = Listing::new(input("Atlantis"), "mirza").with_default_geometry();
        state.store.save_listing(&listing).unwrap();

        let Json(detail) = show_listing(State(state), Path(listing.id))
            .await
            .unwrap();
        assert_eq!(
            detail.listing.geometry.and_then(|g| g.coord()),
            Some(FALLBACK_COORDINATE)
        );
    }

    #[tokio::test]
    async fn test_show_missing_listing() {
        let state = test_state(StubGeocoder::no_match());
        let err = show_listing(State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), LISTING_MISSING);
    }

    #[tokio::test]
    async fn test_index_country_filter() {
        let state = test_state(StubGeocoder::no_match());
        state
            .store
            .save_listing(&Listing::new(input("Paris"), "mirza"))
            .unwrap();

        let params = IndexParams {
            country: Some("fRaNcE".into()),
        };
        let Json(found) = index(State(state.clone()), Query(params)).await.unwrap();
        assert_eq!(found.len(), 1);

        let params = IndexParams {
            country: Some("Japan".into()),
        };
        let err = index(State(state.clone()), Query(params)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let Json(all) = index(State(state), Query(IndexParams::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_update_miss_keeps_geometry() {
        let state = test_state(StubGeocoder::no_match());
        let mut listing = Listing::new(input("Paris"), "mirza");
        listing.geometry = Some(Geometry::point(Coord { x: 2.3522, y: 48.8566 }));
        state.store.save_listing(&listing).unwrap();

        let Json(updated) = update_listing(
            State(state),
            owner(),
            Path(listing.id),
            ApiJson(input("Zzzqq Nonexistent Place")),
        )
        .await
        .unwrap();

        assert_eq!(updated.location, "Zzzqq Nonexistent Place");
        assert_eq!(updated.geometry, listing.geometry);
    }

    #[tokio::test]
    async fn test_update_changed_location_regeocodes() {
        let state = test_state(StubGeocoder::matching(-0.1276, 51.5072));
        let mut listing = Listing::new(input("Paris"), "mirza");
        listing.geometry = Some(Geometry::point(Coord { x: 2.3522, y: 48.8566 }));
        state.store.save_listing(&listing).unwrap();

        let Json(updated) = update_listing(
            State(state.clone()),
            owner(),
            Path(listing.id),
            ApiJson(input("London")),
        )
        .await
        .unwrap();

        let expected = Some(Geometry::point(Coord { x: -0.1276, y: 51.5072 }));
        assert_eq!(updated.geometry, expected);
        let stored = state.store.find_listing(listing.id).unwrap().unwrap();
        assert_eq!(stored.geometry, expected);
    }

    #[tokio::test]
    async fn test_show_keeps_review_added_during_lookup() {
        let mut legacy = Listing::new(input("Somewhere"), "mirza");
        legacy.geometry = None;
        let state = state_with_concurrent_review(&legacy);

        let Json(detail) = show_listing(State(state.clone()), Path(legacy.id))
            .await
            .unwrap();
        assert_eq!(detail.listing.reviews.len(), 1);
        assert_eq!(detail.review_details.len(), 1);

        let stored = state.store.find_listing(legacy.id).unwrap().unwrap();
        assert_eq!(stored.reviews.len(), 1);
        assert_eq!(
            stored.geometry,
            Some(Geometry::point(Coord { x: 10.0, y: 20.0 }))
        );
    }

    #[tokio::test]
    async fn test_update_keeps_review_added_during_lookup() {
        let listing = Listing::new(input("Paris"), "mirza").with_default_geometry();
        let state = state_with_concurrent_review(&listing);

        let Json(updated) = update_listing(
            State(state.clone()),
            owner(),
            Path(listing.id),
            ApiJson(input("Somewhere else")),
        )
        .await
        .unwrap();
        assert_eq!(updated.location, "Somewhere else");
        assert_eq!(updated.reviews.len(), 1);
        assert_eq!(
            updated.geometry,
            Some(Geometry::point(Coord { x: 10.0, y: 20.0 }))
        );

        let stored = state.store.find_listing(listing.id).unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let state = test_state(StubGeocoder::no_match());
        let listing = Listing::new(input("Paris"), "mirza");
        state.store.save_listing(&listing).unwrap();

        let err = update_listing(
            State(state),
            CurrentUser("someone-else".into()),
            Path(listing.id),
            ApiJson(input("London")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_edit_form_thumbnail() {
        let state = test_state(StubGeocoder::no_match());
        let mut listing = Listing::new(input("Paris"), "mirza");
        listing.image.url = "https://res.cloudinary.com/x/image/upload/a.png".into();
        state.store.save_listing(&listing).unwrap();

        let Json(form) = edit_listing(State(state), owner(), Path(listing.id))
            .await
            .unwrap();
        assert_eq!(
            form.original_image_url,
            "https://res.cloudinary.com/x/image/upload/w_250/a.png"
        );
    }

    #[tokio::test]
    async fn test_delete_listing() {
        let state = test_state(StubGeocoder::no_match());
        let listing = Listing::new(input("Paris"), "mirza");
        state.store.save_listing(&listing).unwrap();

        let Json(deleted) = delete_listing(State(state.clone()), owner(), Path(listing.id))
            .await
            .unwrap();
        assert_eq!(deleted.id, listing.id);
        assert_eq!(state.store.find_listing(listing.id).unwrap(), None);
    }
}
