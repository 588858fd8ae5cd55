//! Forward geocoding against a Nominatim-compatible search endpoint.

use std::time::Duration;

use async_trait::async_trait;
use geo_types::Coord;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "Wanderlust/0.1 (listings geocoder)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("geocoder response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("geocoder returned an invalid coordinate: lat={lat:?} lon={lon:?}")]
    Coordinate { lat: String, lon: String },
    #[error("invalid geocoder url: {0}")]
    Url(#[from] url::ParseError),
}

/// Resolves free-text place descriptions to a coordinate.
///
/// The returned coordinate has longitude in `x` and latitude in `y`.
/// `Ok(None)` means the service had no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Option<Coord<f64>>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// HTTP client for the Nominatim `/search` API
pub struct NominatimClient {
    client: Client,
    search_url: Url,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        // A trailing slash keeps any path prefix on the base when joining
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let search_url = Url::parse(&base)?.join("search")?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, search_url })
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        let response = self.client.get(self.request_url(query)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let hits: Vec<SearchHit> = serde_json::from_slice(&body)?;

        let Some(hit) = hits.into_iter().next() else {
            debug!("No geocoding match for {:?}", query);
            return Ok(None);
        };

        parse_hit(hit).map(Some)
    }
}

fn parse_hit(hit: SearchHit) -> Result<Coord<f64>, GeocodeError> {
    let lat = hit.lat.trim().parse::<f64>().ok();
    let lon = hit.lon.trim().parse::<f64>().ok();

    match (lon, lat) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
        _ => Err(GeocodeError::Coordinate {
            lat: hit.lat,
            lon: hit.lon,
        }),
    }
}
