//! Map composition: turns datasets plus the user's filters into a
//! renderer-agnostic [`TrafficMap`].
//!
//! Composition is a pure function of its inputs. Every call reclassifies the
//! sites and rebuilds all markers and overlays from scratch.

use serde::Serialize;

use crate::classify::{Classification, classify};
use crate::model::{
    ClassSelection, Coordinate, HydrogenStation, RouteKind, RouteLayer, TrafficSite,
};
use crate::summary::group_thousands;

pub const DEFAULT_ZOOM: u8 = 8;
pub const TILES: &str = "OpenStreetMap";

/// Which overlays the user has switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerVisibility {
    pub traffic: bool,
    pub hydrogen: bool,
    pub railway: bool,
    pub freight_roads: bool,
    pub secondary_roads: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            traffic: true,
            hydrogen: true,
            railway: false,
            freight_roads: false,
            secondary_roads: false,
        }
    }
}

impl LayerVisibility {
    pub fn route(&self, kind: RouteKind) -> bool {
        match kind {
            RouteKind::Railway => self.railway,
            RouteKind::FreightRoad => self.freight_roads,
            RouteKind::SecondaryRoad => self.secondary_roads,
        }
    }
}

/// Line styling for a route overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub weight: u8,
    pub opacity: f64,
}

impl LineStyle {
    pub fn for_route(kind: RouteKind) -> Self {
        match kind {
            RouteKind::Railway => LineStyle {
                color: "red",
                weight: 3,
                opacity: 0.7,
            },
            RouteKind::FreightRoad => LineStyle {
                color: "blue",
                weight: 4,
                opacity: 0.8,
            },
            RouteKind::SecondaryRoad => LineStyle {
                color: "green",
                weight: 2,
                opacity: 0.6,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    TrafficSite,
    HydrogenStation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: Coordinate,
    pub color: &'static str,
    pub icon: &'static str,
    pub tooltip: String,
    pub popup_html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteOverlay<'a> {
    pub kind: RouteKind,
    pub style: LineStyle,
    pub data: &'a geojson::GeoJson,
}

/// Everything a map widget needs to draw the dashboard map.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficMap<'a> {
    pub center: Coordinate,
    pub zoom: u8,
    pub tiles: &'static str,
    pub markers: Vec<Marker>,
    pub overlays: Vec<RouteOverlay<'a>>,
    pub legend: Vec<String>,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

/// Inputs for [`compose_map`].
#[derive(Debug, Clone, Copy)]
pub struct MapRequest<'a> {
    pub sites: &'a [TrafficSite],
    pub stations: &'a [HydrogenStation],
    pub routes: &'a [RouteLayer],
    pub visibility: LayerVisibility,
    pub selection: &'a ClassSelection,
}

/// Builds the map, or `None` when there are no sites to centre it on.
pub fn compose_map<'a>(req: &MapRequest<'a>) -> Option<TrafficMap<'a>> {
    if req.sites.is_empty() {
        return None;
    }

    let n = req.sites.len() as f64;
    let center = Coordinate::new(
        req.sites.iter().map(|s| s.site.location.lat).sum::<f64>() / n,
        req.sites.iter().map(|s| s.site.location.lon).sum::<f64>() / n,
    );

    let classification = classify(req.sites, req.selection);
    let mut markers = Vec::new();

    if req.visibility.traffic {
        markers.extend(
            req.sites
                .iter()
                .enumerate()
                .map(|(i, site)| site_marker(site, i, &classification, req.selection)),
        );
    }

    if req.visibility.hydrogen {
        markers.extend(req.stations.iter().map(station_marker));
    }

    let overlays = req
        .routes
        .iter()
        .filter(|layer| req.visibility.route(layer.kind))
        .map(|layer| RouteOverlay {
            kind: layer.kind,
            style: LineStyle::for_route(layer.kind),
            data: &layer.geojson,
        })
        .collect();

    Some(TrafficMap {
        center,
        zoom: DEFAULT_ZOOM,
        tiles: TILES,
        markers,
        overlays,
        legend: legend(&req.visibility, req.selection),
        low_threshold: classification.low_threshold,
        high_threshold: classification.high_threshold,
    })
}

/// Human-readable legend, one line per enabled layer.
pub fn legend(visibility: &LayerVisibility, selection: &ClassSelection) -> Vec<String> {
    let mut items = Vec::new();
    if visibility.traffic {
        let basis = if selection.is_all() {
            "Class 3+ volume".to_string()
        } else {
            format!("combined {} count", selection.labels())
        };
        items.push(format!(
            "Traffic Sites: Color-coded by {basis} (Red=Most trucks, Orange=Middle third, Green=Least trucks)"
        ));
    }
    if visibility.hydrogen {
        items.push("Hydrogen Stations: Blue gas pump icons for refueling stations".to_string());
    }
    if visibility.railway {
        items.push("Railway Routes: Red lines showing key freight railway routes".to_string());
    }
    if visibility.freight_roads {
        items.push("Key Freight Roads: Blue lines showing major freight road routes".to_string());
    }
    if visibility.secondary_roads {
        items.push("Secondary Routes: Green lines showing secondary road routes".to_string());
    }
    items
}

fn site_marker(
    site: &TrafficSite,
    index: usize,
    classification: &Classification,
    selection: &ClassSelection,
) -> Marker {
    let d = &site.site;
    let total = site.counts.total();
    let aggregate = classification.aggregate_of(index).unwrap_or(total);
    let color = classification
        .tier_of(index)
        .map(|t| t.color())
        .unwrap_or("green");

    let mut popup = String::from(r#"<div style="width: 300px;">"#);
    popup.push_str(&format!(
        "<h4>{}</h4>\
         <p><strong>Site Number:</strong> {}</p>\
         <p><strong>Location:</strong> {}</p>\
         <p><strong>Direction:</strong> {}</p>\
         <hr><h5>Traffic Data</h5>\
         <p><strong>Total Vehicles (Class 3+):</strong> {}</p>",
        escape_html(&d.road_name),
        escape_html(&d.site_number),
        escape_html(&d.location_desc),
        escape_html(&d.road_dir),
        group_thousands(total),
    ));

    let tooltip = if selection.is_all() {
        for class in crate::model::VehicleClass::ALL {
            popup.push_str(&format!(
                "<p><strong>{}:</strong> {}</p>",
                class.label(),
                group_thousands(site.counts.get(class))
            ));
        }
        format!("{} - {} vehicles (Class 3+)", d.road_name, group_thousands(total))
    } else {
        popup.push_str(&format!(
            "<p><strong>Combined ({}):</strong> {}</p>",
            selection.labels(),
            group_thousands(aggregate)
        ));
        for class in selection.classes() {
            popup.push_str(&format!(
                "<p><strong>{}:</strong> {}</p>",
                class.label(),
                group_thousands(site.counts.get(class))
            ));
        }
        format!(
            "{} - Combined ({}): {}",
            d.road_name,
            selection.labels(),
            group_thousands(aggregate)
        )
    };
    popup.push_str("</div>");

    Marker {
        kind: MarkerKind::TrafficSite,
        position: d.location,
        color,
        icon: "truck",
        tooltip,
        popup_html: popup,
    }
}

fn station_marker(station: &HydrogenStation) -> Marker {
    let storage = station.storage_capacity_kg.as_deref().unwrap_or("N/A");
    let daily = station.dispensing_daily_capacity.as_deref().unwrap_or("N/A");
    let usage: String = station
        .usage_case
        .as_deref()
        .unwrap_or("N/A")
        .chars()
        .take(100)
        .collect();

    let popup_html = format!(
        "<div style=\"width: 300px;\">\
         <h4>Hydrogen Station: {}</h4>\
         <p><strong>Location:</strong> {}</p>\
         <p><strong>Operator:</strong> {}</p>\
         <p><strong>Started:</strong> {}</p>\
         <p><strong>Storage Capacity:</strong> {} kg</p>\
         <p><strong>Daily Capacity:</strong> {} vehicles</p>\
         <p><strong>Usage:</strong> {}...</p>\
         </div>",
        escape_html(&station.name),
        escape_html(&station.city_state),
        escape_html(&station.operator),
        escape_html(&station.start),
        escape_html(storage),
        escape_html(daily),
        escape_html(&usage),
    );

    Marker {
        kind: MarkerKind::HydrogenStation,
        position: station.coordinate(),
        color: "blue",
        icon: "gas-pump",
        tooltip: format!("Hydrogen Station: {} - {}", station.name, station.city_state),
        popup_html,
    }
}

/// Escapes text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassCounts, SiteDescriptor, VehicleClass};

    fn site(n: u32, lat: f64, lon: f64, class3: u64) -> TrafficSite {
        TrafficSite {
            site: SiteDescriptor {
                site_number: n.to_string(),
                road_name: format!("Road <{n}>"),
                location_desc: "Near town".to_string(),
                road_dir: "Both".to_string(),
                location: Coordinate::new(lat, lon),
            },
            counts: ClassCounts {
                class3,
                class8: 1000,
                ..Default::default()
            },
        }
    }

    fn station() -> HydrogenStation {
        HydrogenStation {
            lat: -31.95,
            lon: 115.86,
            name: "Jandakot".to_string(),
            city_state: "Perth WA".to_string(),
            operator: "ATCO".to_string(),
            start: "2021".to_string(),
            storage_capacity_kg: None,
            dispensing_daily_capacity: Some("10".to_string()),
            usage_case: Some("x".repeat(150)),
        }
    }

    fn railway() -> RouteLayer {
        RouteLayer {
            kind: RouteKind::Railway,
            geojson: r#"{"type": "FeatureCollection", "features": []}"#.parse().unwrap(),
        }
    }

    #[test]
    fn test_no_sites_no_map() {
        let selection = ClassSelection::all();
        let req = MapRequest {
            sites: &[],
            stations: &[station()],
            routes: &[],
            visibility: LayerVisibility::default(),
            selection: &selection,
        };
        assert!(compose_map(&req).is_none());
    }

    #[test]
    fn test_markers_and_center() {
        let sites = vec![site(1, -30.0, 115.0, 10), site(2, -32.0, 117.0, 5000)];
        let stations = vec![station()];
        let selection = ClassSelection::all();
        let req = MapRequest {
            sites: &sites,
            stations: &stations,
            routes: &[],
            visibility: LayerVisibility::default(),
            selection: &selection,
        };

        let map = compose_map(&req).unwrap();
        assert_eq!(map.center, Coordinate::new(-31.0, 116.0));
        assert_eq!(map.markers.len(), 3);

        let first = &map.markers[0];
        assert_eq!(first.color, "green");
        assert_eq!(first.tooltip, "Road <1> - 1,010 vehicles (Class 3+)");
        assert!(first.popup_html.contains("Road &lt;1&gt;"));
        assert!(first.popup_html.contains("<strong>Class 10:</strong> 0"));
        assert_eq!(map.markers[1].color, "red");

        let hydrogen = &map.markers[2];
        assert_eq!(hydrogen.kind, MarkerKind::HydrogenStation);
        assert_eq!(hydrogen.icon, "gas-pump");
        assert!(hydrogen.popup_html.contains("N/A kg"));
        assert!(hydrogen.popup_html.contains(&format!("{}...", "x".repeat(100))));
    }

    #[test]
    fn test_selection_popup_and_tooltip() {
        let sites = vec![site(1, -30.0, 115.0, 1200)];
        let selection: ClassSelection = [VehicleClass::Class3].into_iter().collect();
        let req = MapRequest {
            sites: &sites,
            stations: &[],
            routes: &[],
            visibility: LayerVisibility::default(),
            selection: &selection,
        };

        let map = compose_map(&req).unwrap();
        let marker = &map.markers[0];
        assert_eq!(marker.tooltip, "Road <1> - Combined (Class 3): 1,200");
        assert!(marker.popup_html.contains("Combined (Class 3):</strong> 1,200"));
        assert!(!marker.popup_html.contains("Class 8:"));
        assert!(map.legend[0].contains("combined Class 3 count"));
    }

    #[test]
    fn test_layers_respect_visibility() {
        let sites = vec![site(1, -30.0, 115.0, 10)];
        let stations = vec![station()];
        let routes = vec![railway()];
        let selection = ClassSelection::all();

        let hidden = MapRequest {
            sites: &sites,
            stations: &stations,
            routes: &routes,
            visibility: LayerVisibility {
                traffic: false,
                hydrogen: false,
                ..Default::default()
            },
            selection: &selection,
        };
        let map = compose_map(&hidden).unwrap();
        assert!(map.markers.is_empty());
        assert!(map.overlays.is_empty());
        assert!(map.legend.is_empty());

        let shown = MapRequest {
            visibility: LayerVisibility {
                railway: true,
                freight_roads: true,
                ..Default::default()
            },
            ..hidden
        };
        let map = compose_map(&shown).unwrap();
        // The freight road file was never loaded, so only the railway shows.
        assert_eq!(map.overlays.len(), 1);
        assert_eq!(map.overlays[0].style, LineStyle::for_route(RouteKind::Railway));
        assert_eq!(map.legend.len(), 4);
    }

    #[test]
    fn test_compose_is_idempotent() {
        let sites = vec![site(1, -30.0, 115.0, 10), site(2, -31.0, 116.0, 20)];
        let selection = ClassSelection::all();
        let req = MapRequest {
            sites: &sites,
            stations: &[],
            routes: &[],
            visibility: LayerVisibility::default(),
            selection: &selection,
        };
        let a = compose_map(&req).unwrap();
        let b = compose_map(&req).unwrap();
        assert_eq!(a.markers, b.markers);
        assert_eq!(a.low_threshold, b.low_threshold);
    }
}
