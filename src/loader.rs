//! Loaders for the dashboard's static input files.
//!
//! Each loader validates records as they are read: rows that fail to
//! deserialize or carry out-of-range coordinates are rejected with a warning
//! and the remainder of the file is kept. A missing file is reported as
//! [`DashboardError::MissingInput`]; [`Datasets::load`] turns that into an
//! empty layer plus a user-facing notice.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use geojson::GeoJson;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::DataPaths;
use crate::error::{DashboardError, Result};
use crate::model::{HydrogenStation, RouteKind, RouteLayer, TrafficSite};

#[derive(Deserialize)]
struct StatisticsFile {
    statistics: Vec<serde_json::Value>,
}

fn open_error(path: &Path, e: io::Error) -> DashboardError {
    if e.kind() == io::ErrorKind::NotFound {
        DashboardError::MissingInput {
            path: path.to_path_buf(),
        }
    } else {
        DashboardError::Io(e)
    }
}

fn malformed(path: &Path, reason: impl ToString) -> DashboardError {
    DashboardError::MalformedInput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Reads `site_statistics.json`: `{"statistics": [ {site, Class3..Class10}, ... ]}`.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_sites(path: &Path) -> Result<Vec<TrafficSite>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let doc: StatisticsFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| malformed(path, e))?;

    let mut sites = Vec::with_capacity(doc.statistics.len());
    let mut rejected = 0usize;

    for (index, value) in doc.statistics.into_iter().enumerate() {
        match serde_json::from_value::<TrafficSite>(value) {
            Ok(site) if site.coordinate().is_valid() => sites.push(site),
            Ok(site) => {
                rejected += 1;
                warn!(
                    index,
                    site_number = %site.site.site_number,
                    "Rejecting site with out-of-range coordinate"
                );
            }
            Err(e) => {
                rejected += 1;
                warn!(index, error = %e, "Rejecting malformed site record");
            }
        }
    }

    info!(loaded = sites.len(), rejected, "Site statistics loaded");
    Ok(sites)
}

/// Reads the hydrogen refuelling station CSV.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_stations(path: &Path) -> Result<Vec<HydrogenStation>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut stations = Vec::new();
    let mut rejected = 0usize;

    for (index, result) in rdr.deserialize::<HydrogenStation>().enumerate() {
        match result {
            Ok(station) if station.coordinate().is_valid() => stations.push(station),
            Ok(station) => {
                rejected += 1;
                warn!(index, name = %station.name, "Rejecting station with out-of-range coordinate");
            }
            Err(e) => {
                rejected += 1;
                warn!(index, error = %e, "Rejecting malformed station row");
            }
        }
    }

    info!(loaded = stations.len(), rejected, "Hydrogen stations loaded");
    Ok(stations)
}

/// Reads one GeoJSON route file.
#[tracing::instrument(skip(path, kind), fields(path = %path.display(), kind = ?kind))]
pub fn load_route(path: &Path, kind: RouteKind) -> Result<RouteLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| open_error(path, e))?;
    let geojson: GeoJson = content.parse().map_err(|e| malformed(path, e))?;
    let layer = RouteLayer { kind, geojson };
    info!(features = layer.feature_count(), "Route layer loaded");
    Ok(layer)
}

/// Everything the dashboard renders from, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub sites: Vec<TrafficSite>,
    pub stations: Vec<HydrogenStation>,
    pub routes: Vec<RouteLayer>,
    /// Warnings raised while loading, shown to the user.
    pub notices: Vec<String>,
}

impl Datasets {
    /// Loads all five inputs, degrading per file instead of failing.
    pub fn load(paths: &DataPaths) -> Self {
        let mut notices = Vec::new();

        let sites = load_sites(&paths.site_statistics).unwrap_or_else(|e| {
            degrade(&mut notices, &e);
            Vec::new()
        });

        let stations = load_stations(&paths.hydrogen_stations).unwrap_or_else(|e| {
            degrade(&mut notices, &e);
            Vec::new()
        });

        let route_paths: [(RouteKind, &PathBuf); 3] = [
            (RouteKind::Railway, &paths.railway),
            (RouteKind::FreightRoad, &paths.freight_roads),
            (RouteKind::SecondaryRoad, &paths.secondary_roads),
        ];
        let routes = route_paths
            .into_iter()
            .filter_map(|(kind, path)| match load_route(path, kind) {
                Ok(layer) => Some(layer),
                Err(e) => {
                    degrade(&mut notices, &e);
                    None
                }
            })
            .collect();

        Self {
            sites,
            stations,
            routes,
            notices,
        }
    }

    pub fn route(&self, kind: RouteKind) -> Option<&RouteLayer> {
        self.routes.iter().find(|r| r.kind == kind)
    }
}

fn degrade(notices: &mut Vec<String>, err: &DashboardError) {
    warn!(error = %err, "Input unavailable, feature disabled");
    notices.push(err.user_notice());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_missing_sites_file() {
        let err = load_sites(Path::new("/nonexistent/site_statistics.json")).unwrap_err();
        assert!(matches!(err, DashboardError::MissingInput { .. }));
    }

    #[test]
    fn test_sites_reject_bad_records_keep_rest() {
        let path = temp_path("freight_dashboard_test_sites.json");
        fs::write(
            &path,
            r#"{"statistics": [
                {"site": {"siteNumber": "1", "roadname": "A", "locationDesc": "a",
                          "roadDir": "N", "location": {"lat": -31.0, "long": 116.0}},
                 "Class3": 1, "Class4": 1, "Class5": 1, "Class6": 1,
                 "Class7": 1, "Class8": 1, "Class9": 1, "Class10": 1},
                {"site": {"siteNumber": "2", "roadname": "B", "locationDesc": "b",
                          "roadDir": "S", "location": {"lat": -131.0, "long": 116.0}},
                 "Class3": 1, "Class4": 1, "Class5": 1, "Class6": 1,
                 "Class7": 1, "Class8": 1, "Class9": 1, "Class10": 1},
                {"site": {"siteNumber": "3"}, "Class3": 4}
            ]}"#,
        )
        .unwrap();

        let sites = load_sites(&path).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].site.site_number, "1");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_malformed_sites_document() {
        let path = temp_path("freight_dashboard_test_sites_bad.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = load_sites(&path).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedInput { .. }));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stations_optional_columns() {
        let path = temp_path("freight_dashboard_test_stations.csv");
        fs::write(
            &path,
            "Lat,Long,name,city_state,operator,Start,storage_capacity_kg\n\
             -31.95,115.86,Jandakot,Perth WA,ATCO,2021,\n\
             -32.05,115.75,Fremantle,Fremantle WA,Fortescue,2023,500\n",
        )
        .unwrap();

        let stations = load_stations(&path).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].storage_capacity_kg, None);
        assert_eq!(stations[1].storage_capacity_kg.as_deref(), Some("500"));
        assert_eq!(stations[1].dispensing_daily_capacity, None);
        assert_eq!(stations[0].start, "2021");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stations_keep_non_numeric_capacities() {
        let path = temp_path("freight_dashboard_test_stations_text.csv");
        fs::write(
            &path,
            "Lat,Long,name,city_state,operator,Start,storage_capacity_kg,dispensing_daily_capacity\n\
             -31.95,115.86,Jandakot,Perth WA,ATCO,2021,TBC,10-20\n",
        )
        .unwrap();

        let stations = load_stations(&path).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].storage_capacity_kg.as_deref(), Some("TBC"));
        assert_eq!(stations[0].dispensing_daily_capacity.as_deref(), Some("10-20"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_sites_accept_integral_float_counts() {
        let path = temp_path("freight_dashboard_test_sites_float.json");
        fs::write(
            &path,
            r#"{"statistics": [
                {"site": {"siteNumber": 11, "roadname": "A", "locationDesc": "a",
                          "location": {"lat": -31.0, "long": 116.0}},
                 "Class3": 120.0, "Class4": "4", "Class5": 1, "Class6": 1,
                 "Class7": 1, "Class8": 1, "Class9": 1, "Class10": 1},
                {"site": {"siteNumber": 12, "roadname": "B", "locationDesc": "b",
                          "location": {"lat": -31.0, "long": 116.0}},
                 "Class3": 1.5, "Class4": 1, "Class5": 1, "Class6": 1,
                 "Class7": 1, "Class8": 1, "Class9": 1, "Class10": 1}
            ]}"#,
        )
        .unwrap();

        let sites = load_sites(&path).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].counts.class3, 120);
        assert_eq!(sites[0].counts.class4, 4);
        assert_eq!(sites[0].counts.total(), 130);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_route_layer_parses_feature_collection() {
        let path = temp_path("freight_dashboard_test_route.geojson");
        fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "Eastern Goldfields"},
                 "geometry": {"type": "LineString", "coordinates": [[115.9, -31.9], [121.4, -30.7]]}}
            ]}"#,
        )
        .unwrap();

        let layer = load_route(&path, RouteKind::Railway).unwrap();
        assert_eq!(layer.feature_count(), 1);
        assert_eq!(layer.kind, RouteKind::Railway);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_datasets_degrade_when_everything_missing() {
        let datasets = Datasets::load(&DataPaths::within("/nonexistent/freight_dashboard"));
        assert!(datasets.sites.is_empty());
        assert!(datasets.stations.is_empty());
        assert!(datasets.routes.is_empty());
        assert_eq!(datasets.notices.len(), 5);
    }
}
