//! Trait and types for a geocoding and driving-distance provider.

use serde::Serialize;

use crate::error::Result;
use crate::model::Coordinate;

/// A single driving leg as reported by the distance provider.
///
/// The text fields are the provider's own human-readable rendering
/// (e.g. `"312 km"`, `"3 hours 20 mins"`) and are shown verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrivingLeg {
    pub distance_text: String,
    pub duration_text: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
}

/// Abstraction over a geocoding + distance-matrix provider (e.g. Google Maps).
#[async_trait::async_trait]
pub trait DistanceApi: Send + Sync {
    /// Resolves free text to a coordinate. `Ok(None)` means the provider
    /// found no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>>;

    /// Returns the driving leg between two coordinates.
    ///
    /// # Errors
    ///
    /// [`DashboardError::RouteNotFound`](crate::error::DashboardError::RouteNotFound)
    /// when the provider reports a non-OK status for the pair.
    async fn driving_distance(&self, origin: Coordinate, destination: Coordinate)
    -> Result<DrivingLeg>;
}
