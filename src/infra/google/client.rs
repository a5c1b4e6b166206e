use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GoogleConfig;
use crate::error::{DashboardError, Result};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::model::Coordinate;
use crate::services::distance_api::{DistanceApi, DrivingLeg};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: u64,
}

/// Google Maps Geocoding + Distance Matrix client.
///
/// The API key travels as the `key` query parameter via [`UrlParam`].
pub struct GoogleMapsClient<C> {
    http: UrlParam<C>,
    base_url: String,
}

impl GoogleMapsClient<BasicClient> {
    /// Builds a client from config and an optional key.
    ///
    /// # Errors
    ///
    /// [`DashboardError::ServiceUnavailable`] when the key is missing or the
    /// HTTP client cannot be constructed.
    pub fn from_config(config: &GoogleConfig, api_key: Option<String>) -> Result<Self> {
        let key = api_key.ok_or_else(|| {
            DashboardError::ServiceUnavailable(format!(
                "{} is not set",
                crate::config::API_KEY_ENV
            ))
        })?;
        let http = BasicClient::with_timeout(config.timeout())
            .map_err(|e| DashboardError::ServiceUnavailable(e.to_string()))?;
        Ok(Self::with_client(http, key, &config.base_url))
    }
}

impl<C: HttpClient> GoogleMapsClient<C> {
    pub fn with_client(inner: C, api_key: String, base_url: &str) -> Self {
        Self {
            http: UrlParam::google(inner, api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> DistanceApi for GoogleMapsClient<C> {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>> {
        let url = format!("{}/geocode/json", self.base_url);
        let resp: GeocodeResponse =
            fetch_json(&self.http, &url, &[("address", address.to_string())]).await?;
        debug!(status = %resp.status, results = resp.results.len(), "Geocode response");
        resolve_geocode(resp)
    }

    async fn driving_distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<DrivingLeg> {
        let url = format!("{}/distancematrix/json", self.base_url);
        let query = [
            ("origins", origin.to_string()),
            ("destinations", destination.to_string()),
            ("mode", "driving".to_string()),
            ("units", "metric".to_string()),
        ];
        let resp: DistanceMatrixResponse = fetch_json(&self.http, &url, &query).await?;
        debug!(status = %resp.status, "Distance matrix response");
        resolve_leg(resp)
    }
}

/// First result wins; `ZERO_RESULTS` and an empty result list mean "no match".
fn resolve_geocode(resp: GeocodeResponse) -> Result<Option<Coordinate>> {
    match resp.status.as_str() {
        "OK" => Ok(resp
            .results
            .into_iter()
            .next()
            .map(|r| Coordinate::new(r.geometry.location.lat, r.geometry.location.lng))),
        "ZERO_RESULTS" => Ok(None),
        _ => {
            warn!(status = %resp.status, "Geocoding request rejected");
            Err(DashboardError::ServiceRejected {
                status: resp.status,
                message: resp.error_message.unwrap_or_default(),
            })
        }
    }
}

/// Reads the single origin/destination element of a 1x1 matrix.
fn resolve_leg(resp: DistanceMatrixResponse) -> Result<DrivingLeg> {
    if resp.status != "OK" {
        warn!(status = %resp.status, "Distance matrix request rejected");
        return Err(DashboardError::ServiceRejected {
            status: resp.status,
            message: resp.error_message.unwrap_or_default(),
        });
    }

    let element = resp
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| DashboardError::RouteNotFound {
            status: "EMPTY".to_string(),
        })?;

    if element.status != "OK" {
        return Err(DashboardError::RouteNotFound {
            status: element.status,
        });
    }

    match (element.distance, element.duration) {
        (Some(distance), Some(duration)) => Ok(DrivingLeg {
            distance_text: distance.text,
            duration_text: duration.text,
            distance_meters: distance.value,
            duration_seconds: duration.value,
        }),
        _ => Err(DashboardError::RouteNotFound {
            status: "INCOMPLETE".to_string(),
        }),
    }
}
