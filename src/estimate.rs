//! Distance and fuel estimation for a trip starting at a traffic site.
//!
//! A trip is resolved in two provider calls (geocode, then driving distance)
//! and converted into litres of diesel and an equivalent mass of hydrogen.
//! Failures are never retried; the first error abandons the estimate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DashboardError, Result};
use crate::model::Coordinate;
use crate::services::distance_api::DistanceApi;

/// Truck classes offered for fuel estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FuelClass {
    #[serde(rename = "class-4-medium-rigid")]
    Class4MediumRigid,
    #[serde(rename = "class-5-heavy-rigid")]
    Class5HeavyRigid,
    #[serde(rename = "class-7-artic-4-axle")]
    Class7Artic4Axle,
    #[serde(rename = "class-8-artic-5-axle")]
    Class8Artic5Axle,
    #[serde(rename = "class-9-artic-6-axle")]
    Class9Artic6Axle,
    #[serde(rename = "class-9-rigid-dog")]
    Class9RigidDog,
    #[serde(rename = "class-10-b-double")]
    Class10BDouble,
}

impl FuelClass {
    pub const ALL: [FuelClass; 7] = [
        FuelClass::Class4MediumRigid,
        FuelClass::Class5HeavyRigid,
        FuelClass::Class7Artic4Axle,
        FuelClass::Class8Artic5Axle,
        FuelClass::Class9Artic6Axle,
        FuelClass::Class9RigidDog,
        FuelClass::Class10BDouble,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FuelClass::Class4MediumRigid => "Class 4 (Medium Rigid)",
            FuelClass::Class5HeavyRigid => "Class 5 (Heavy Rigid)",
            FuelClass::Class7Artic4Axle => "Class 7 (Arctic 4 Axle)",
            FuelClass::Class8Artic5Axle => "Class 8 (Artic 5 Axle)",
            FuelClass::Class9Artic6Axle => "Class 9 (Artic 6 Axle)",
            FuelClass::Class9RigidDog => "Class 9 (Rigid + 5 Axle Dog)",
            FuelClass::Class10BDouble => "Class 10 (B-Double)",
        }
    }

    /// Stable identifier used in config files, query strings and the CLI.
    pub fn slug(self) -> &'static str {
        match self {
            FuelClass::Class4MediumRigid => "class-4-medium-rigid",
            FuelClass::Class5HeavyRigid => "class-5-heavy-rigid",
            FuelClass::Class7Artic4Axle => "class-7-artic-4-axle",
            FuelClass::Class8Artic5Axle => "class-8-artic-5-axle",
            FuelClass::Class9Artic6Axle => "class-9-artic-6-axle",
            FuelClass::Class9RigidDog => "class-9-rigid-dog",
            FuelClass::Class10BDouble => "class-10-b-double",
        }
    }

    /// Diesel consumption in litres per 100 km.
    pub fn default_rate(self) -> f64 {
        match self {
            FuelClass::Class4MediumRigid => 12.45859,
            FuelClass::Class5HeavyRigid => 23.22869,
            FuelClass::Class7Artic4Axle => 27.24712,
            FuelClass::Class8Artic5Axle => 30.44964,
            FuelClass::Class9Artic6Axle | FuelClass::Class9RigidDog => 38.14329,
            FuelClass::Class10BDouble => 41.48179,
        }
    }
}

impl fmt::Display for FuelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the slug or the display label.
impl FromStr for FuelClass {
    type Err = DashboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        FuelClass::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(s) || c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| DashboardError::UnknownTruckClass(s.to_string()))
    }
}

/// Consumption table and hydrogen conversion ratio.
///
/// `hydrogen_kg = fuel_litres * hydrogen_numerator / hydrogen_denominator`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FuelModel {
    pub rates: BTreeMap<FuelClass, f64>,
    pub hydrogen_numerator: f64,
    pub hydrogen_denominator: f64,
}

impl Default for FuelModel {
    fn default() -> Self {
        Self {
            rates: FuelClass::ALL
                .into_iter()
                .map(|c| (c, c.default_rate()))
                .collect(),
            hydrogen_numerator: 45.0,
            hydrogen_denominator: 120.0,
        }
    }
}

impl FuelModel {
    /// Litres per 100 km for `class`, falling back to the built-in table.
    pub fn rate(&self, class: FuelClass) -> f64 {
        self.rates
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_rate())
    }

    pub fn fuel_litres(&self, distance_meters: f64, class: FuelClass) -> f64 {
        let distance_km = distance_meters / 1000.0;
        (distance_km / 100.0) * self.rate(class)
    }

    pub fn hydrogen_kg(&self, fuel_litres: f64) -> f64 {
        (fuel_litres * self.hydrogen_numerator) / self.hydrogen_denominator
    }
}

/// Result of a successful estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelEstimate {
    pub distance_text: String,
    pub duration_text: String,
    pub distance_meters: u64,
    pub destination: Coordinate,
    pub truck_class: FuelClass,
    pub fuel_litres: f64,
    pub hydrogen_kg: f64,
}

/// Runs estimates against an optional distance provider.
///
/// Without a provider every estimate fails with
/// [`DashboardError::ServiceUnavailable`] carrying the reason given to
/// [`Estimator::unavailable`].
#[derive(Clone)]
pub struct Estimator {
    api: std::result::Result<Arc<dyn DistanceApi>, String>,
    model: FuelModel,
}

impl Estimator {
    pub fn new(api: Arc<dyn DistanceApi>, model: FuelModel) -> Self {
        Self {
            api: Ok(api),
            model,
        }
    }

    pub fn unavailable(model: FuelModel, reason: impl Into<String>) -> Self {
        Self {
            api: Err(reason.into()),
            model,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api.is_ok()
    }

    /// Estimates distance, fuel and hydrogen use from `origin` to the place
    /// named by `destination`.
    #[tracing::instrument(skip(self, truck_class), fields(truck_class = truck_class.slug()))]
    pub async fn estimate(
        &self,
        origin: Coordinate,
        destination: &str,
        truck_class: FuelClass,
    ) -> Result<FuelEstimate> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(DashboardError::UnresolvedDestination(String::new()));
        }

        let api = self
            .api
            .as_ref()
            .map_err(|reason| DashboardError::ServiceUnavailable(reason.clone()))?;

        let Some(dest) = api.geocode(destination).await? else {
            warn!("Destination did not geocode");
            return Err(DashboardError::UnresolvedDestination(destination.to_string()));
        };

        let leg = api.driving_distance(origin, dest).await?;

        let fuel_litres = self
            .model
            .fuel_litres(leg.distance_meters as f64, truck_class);
        let hydrogen_kg = self.model.hydrogen_kg(fuel_litres);

        info!(
            distance_meters = leg.distance_meters,
            fuel_litres, hydrogen_kg, "Estimate computed"
        );

        Ok(FuelEstimate {
            distance_text: leg.distance_text,
            duration_text: leg.duration_text,
            distance_meters: leg.distance_meters,
            destination: dest,
            truck_class,
            fuel_litres,
            hydrogen_kg,
        })
    }
}
