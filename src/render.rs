//! HTML rendering of the dashboard page.
//!
//! The page is self-contained apart from CDN assets: Leaflet (with the
//! awesome-markers plugin) draws the map from the serialized [`TrafficMap`],
//! and Plotly draws the class-distribution chart.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::estimate::{FuelClass, FuelEstimate};
use crate::export::{EXPORT_FILE_NAME, ExportRow};
use crate::map::{LayerVisibility, TrafficMap, escape_html};
use crate::model::{ClassSelection, TrafficSite, VehicleClass};
use crate::summary::{ClassTotal, group_thousands};

pub const PAGE_TITLE: &str = "WA Traffic Data Dashboard";

const HEAD_ASSETS: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
body { font-family: sans-serif; margin: 0; display: flex; }
aside { width: 260px; padding: 1rem; background: #f4f4f6; min-height: 100vh; }
main { flex: 1; padding: 1rem 2rem; }
#map { width: 100%; height: 500px; }
.notice { padding: .5rem 1rem; margin: .5rem 0; border-radius: 4px; }
.warning { background: #fff3cd; } .error { background: #f8d7da; } .success { background: #d1e7dd; }
.metrics { display: flex; gap: 2rem; } .metric strong { display: block; font-size: 1.4rem; }
table { border-collapse: collapse; width: 100%; } td, th { border: 1px solid #ddd; padding: 4px 8px; }
</style>"#;

const MAP_SCRIPT: &str = r#"<script>
(function () {
  const view = JSON.parse(document.getElementById('map-data').textContent);
  const map = L.map('map').setView([view.center.lat, view.center.long], view.zoom);
  L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    attribution: '&copy; OpenStreetMap contributors'
  }).addTo(map);
  view.overlays.forEach(function (o) {
    L.geoJSON(o.data, { style: function () { return o.style; } }).addTo(map);
  });
  view.markers.forEach(function (m) {
    const icon = L.AwesomeMarkers.icon({ icon: m.icon, markerColor: m.color, prefix: 'fa' });
    const tip = document.createElement('span');
    tip.textContent = m.tooltip;
    L.marker([m.position.lat, m.position.long], { icon: icon })
      .bindPopup(m.popup_html, { maxWidth: 300 })
      .bindTooltip(tip)
      .addTo(map);
  });
})();
</script>"#;

/// State of the page's input controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub selection: ClassSelection,
    pub visibility: LayerVisibility,
    pub site_index: usize,
    pub destination: String,
    pub truck_class: Option<FuelClass>,
}

/// Outcome of the fuel-estimation action, if it was triggered.
#[derive(Debug, Clone)]
pub enum EstimateOutcome {
    Estimate(FuelEstimate),
    Warning(String),
    Error(String),
}

/// Everything the page renders.
pub struct DashboardView<'a> {
    pub map: Option<&'a TrafficMap<'a>>,
    pub sites: &'a [TrafficSite],
    pub rows: &'a [ExportRow],
    pub class_totals: &'a [ClassTotal],
    pub form: &'a FormState,
    pub estimate: Option<&'a EstimateOutcome>,
    pub notices: &'a [String],
    pub api_available: bool,
    pub generated_at: DateTime<Utc>,
}

/// Serializes `value` for embedding inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn checked(on: bool) -> &'static str {
    if on { " checked" } else { "" }
}

fn selected(on: bool) -> &'static str {
    if on { " selected" } else { "" }
}

/// Renders the whole dashboard page.
pub fn render_dashboard(view: &DashboardView<'_>) -> serde_json::Result<String> {
    let mut html = String::with_capacity(64 * 1024);
    html.push_str(&format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{PAGE_TITLE}</title>{HEAD_ASSETS}</head><body>"
    ));

    render_sidebar(&mut html, view.form);

    html.push_str("<main><h1>Truck Dashboard</h1>");
    if !view.api_available {
        html.push_str(
            "<div class=\"notice warning\">Google Maps API not available. Some features may be limited.</div>",
        );
    }
    for notice in view.notices {
        html.push_str(&format!("<div class=\"notice warning\">{}</div>", escape_html(notice)));
    }

    html.push_str("<h2>Interactive Map</h2>");
    match view.map {
        Some(map) => {
            if !map.legend.is_empty() {
                html.push_str("<p><strong>Map Legend:</strong></p><ul>");
                for item in &map.legend {
                    html.push_str(&format!("<li>{}</li>", escape_html(item)));
                }
                html.push_str("</ul>");
            }
            html.push_str(&format!(
                "<div id=\"map\"></div><script type=\"application/json\" id=\"map-data\">{}</script>{MAP_SCRIPT}",
                script_json(map)?
            ));
        }
        None => html.push_str("<div class=\"notice warning\">No sites match the current filters</div>"),
    }

    render_estimator(&mut html, view);
    render_chart(&mut html, view.class_totals)?;
    render_table(&mut html, view.rows);

    html.push_str(&format!(
        "<footer><small>Generated {}</small></footer></main></body></html>",
        view.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    Ok(html)
}

fn render_sidebar(html: &mut String, form: &FormState) {
    let v = &form.visibility;
    html.push_str("<aside><form method=\"get\" action=\"/\"><input type=\"hidden\" name=\"filters\" value=\"1\">");
    html.push_str("<h3>Map Filters</h3>");
    for (name, label, on) in [
        ("traffic", "Show Traffic Sites", v.traffic),
        ("hydrogen", "Show Hydrogen Stations", v.hydrogen),
        ("railway", "Show Railway Routes", v.railway),
        ("roads", "Show Key Freight Roads", v.freight_roads),
        ("secondary", "Show Secondary Routes", v.secondary_roads),
    ] {
        html.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"{name}\" value=\"on\"{}> {label}</label><br>",
            checked(on)
        ));
    }

    html.push_str("<h3>Truck Class Analysis</h3><label>Select Truck Classes to Analyze<br><select name=\"classes\" multiple size=\"8\">");
    for class in VehicleClass::ALL {
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            class.number(),
            selected(form.selection.contains(class)),
            class.label()
        ));
    }
    html.push_str("</select></label><br><button type=\"submit\">Apply</button></form></aside>");
}

fn render_estimator(html: &mut String, view: &DashboardView<'_>) {
    let form = view.form;
    html.push_str("<h2>Fuel Estimation</h2><form method=\"get\" action=\"/\">");

    // Carry the current filters so estimating does not reset the map.
    let v = &form.visibility;
    html.push_str("<input type=\"hidden\" name=\"filters\" value=\"1\">");
    for (name, on) in [
        ("traffic", v.traffic),
        ("hydrogen", v.hydrogen),
        ("railway", v.railway),
        ("roads", v.freight_roads),
        ("secondary", v.secondary_roads),
    ] {
        if on {
            html.push_str(&format!("<input type=\"hidden\" name=\"{name}\" value=\"on\">"));
        }
    }
    for class in form.selection.classes() {
        html.push_str(&format!("<input type=\"hidden\" name=\"classes\" value=\"{}\">", class.number()));
    }

    html.push_str("<label>Select Truck Class <select name=\"truck_class\">");
    for class in FuelClass::ALL {
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            class.slug(),
            selected(form.truck_class == Some(class)),
            class.label()
        ));
    }
    html.push_str("</select></label> <label>Select Starting Point <select name=\"site\">");
    for (i, site) in view.sites.iter().enumerate() {
        html.push_str(&format!(
            "<option value=\"{i}\"{}>{}</option>",
            selected(form.site_index == i),
            escape_html(&site.display_name())
        ));
    }
    html.push_str(&format!(
        "</select></label> <label>Enter Destination <input type=\"text\" name=\"destination\" \
         placeholder=\"e.g., Perth, Western Australia\" value=\"{}\"></label> \
         <button type=\"submit\">Calculate Distance</button></form>",
        escape_html(&form.destination)
    ));

    match view.estimate {
        Some(EstimateOutcome::Estimate(e)) => {
            let from = view
                .sites
                .get(form.site_index)
                .map(|s| s.display_name())
                .unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"notice success\">Distance calculated successfully!</div>\
                 <div class=\"metrics\">\
                 <div class=\"metric\">Distance<strong>{}</strong></div>\
                 <div class=\"metric\">Driving Time<strong>{}</strong></div>\
                 <div class=\"metric\">Estimated Fuel<strong>{:.1} L</strong></div>\
                 <div class=\"metric\">Hydrogen Usage<strong>{:.1} Kg</strong></div>\
                 </div>\
                 <p><strong>Route Details:</strong><br>From: {}<br>To: {}<br>Truck Class: {}</p>",
                escape_html(&e.distance_text),
                escape_html(&e.duration_text),
                e.fuel_litres,
                e.hydrogen_kg,
                escape_html(&from),
                escape_html(&form.destination),
                e.truck_class.label()
            ));
        }
        Some(EstimateOutcome::Warning(msg)) => {
            html.push_str(&format!("<div class=\"notice warning\">{}</div>", escape_html(msg)));
        }
        Some(EstimateOutcome::Error(msg)) => {
            html.push_str(&format!("<div class=\"notice error\">{}</div>", escape_html(msg)));
        }
        None => {}
    }
}

fn render_chart(html: &mut String, totals: &[ClassTotal]) -> serde_json::Result<()> {
    let x: Vec<&str> = totals.iter().map(|t| t.label.as_str()).collect();
    let y: Vec<u64> = totals.iter().map(|t| t.total).collect();
    html.push_str(&format!(
        "<h2>Total Truck Class Distribution</h2><div id=\"class-chart\"></div>\
         <script>Plotly.newPlot('class-chart', [{{type: 'bar', x: {}, y: {}}}], \
         {{title: 'Amount of Trucks By Class', xaxis: {{title: 'Truck Class'}}, yaxis: {{title: 'Total Count'}}}}, \
         {{responsive: true}});</script>",
        script_json(&x)?,
        script_json(&y)?
    ));
    Ok(())
}

fn render_table(html: &mut String, rows: &[ExportRow]) {
    html.push_str(
        "<h2>Detailed Data</h2><table><thead><tr><th>Site Number</th><th>Road Name</th>\
         <th>Location</th><th>Total Vehicles (Class 3+)</th><th>Medium Trucks (3-5)</th>\
         <th>Heavy Trucks (6+)</th><th>Heavy Truck %</th></tr></thead><tbody>",
    );
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            escape_html(&row.site_number),
            escape_html(&row.road_name),
            escape_html(&row.location),
            group_thousands(row.total_vehicles),
            group_thousands(row.medium_trucks),
            group_thousands(row.heavy_trucks),
            row.heavy_truck_pct
        ));
    }
    html.push_str(&format!(
        "</tbody></table><p><a href=\"/export.csv\" download=\"{EXPORT_FILE_NAME}\">Download Data as CSV</a></p>"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::table_rows;
    use crate::map::{MapRequest, compose_map};
    use crate::model::{ClassCounts, Coordinate, SiteDescriptor};
    use crate::summary::class_totals;

    fn sites() -> Vec<TrafficSite> {
        vec![TrafficSite {
            site: SiteDescriptor {
                site_number: "101".to_string(),
                road_name: "Forrest Hwy</script>".to_string(),
                location_desc: "South of Mandurah".to_string(),
                road_dir: "Both".to_string(),
                location: Coordinate::new(-32.5, 115.7),
            },
            counts: ClassCounts {
                class3: 1500,
                ..Default::default()
            },
        }]
    }

    fn render(sites: &[TrafficSite], estimate: Option<&EstimateOutcome>) -> String {
        let form = FormState::default();
        let map = compose_map(&MapRequest {
            sites,
            stations: &[],
            routes: &[],
            visibility: form.visibility,
            selection: &form.selection,
        });
        let rows = table_rows(sites);
        let totals = class_totals(sites);
        render_dashboard(&DashboardView {
            map: map.as_ref(),
            sites,
            rows: &rows,
            class_totals: &totals,
            form: &form,
            estimate,
            notices: &["hydrogen_refuelling_stations.csv not found.".to_string()],
            api_available: false,
            generated_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_page_contains_sections() {
        let html = render(&sites(), None);
        assert!(html.contains("<div id=\"map\"></div>"));
        assert!(html.contains("Amount of Trucks By Class"));
        assert!(html.contains("Download Data as CSV"));
        assert!(html.contains("hydrogen_refuelling_stations.csv not found."));
        assert!(html.contains("Google Maps API not available"));
        assert!(html.contains("<td>1,500</td>"));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let html = render(&sites(), None);
        let start = html.find("id=\"map-data\">").unwrap();
        let end = start + html[start..].find("</script>").unwrap();
        assert!(html[start..end].contains("<\\/script>"));
    }

    #[test]
    fn test_no_sites_shows_warning() {
        let html = render(&[], None);
        assert!(html.contains("No sites match the current filters"));
        assert!(!html.contains("id=\"map-data\""));
    }

    #[test]
    fn test_estimate_outcomes() {
        let error = EstimateOutcome::Error(
            "Failed to calculate distance. Please check your destination address.".to_string(),
        );
        let html = render(&sites(), Some(&error));
        assert!(html.contains("notice error"));
        assert!(!html.contains("Estimated Fuel<strong>"));

        let ok = EstimateOutcome::Estimate(FuelEstimate {
            distance_text: "100 km".to_string(),
            duration_text: "1 hour 10 mins".to_string(),
            distance_meters: 100_000,
            destination: Coordinate::new(-31.95, 115.86),
            truck_class: FuelClass::Class8Artic5Axle,
            fuel_litres: 30.44964,
            hydrogen_kg: 11.418615,
        });
        let html = render(&sites(), Some(&ok));
        assert!(html.contains("Estimated Fuel<strong>30.4 L</strong>"));
        assert!(html.contains("Hydrogen Usage<strong>11.4 Kg</strong>"));
    }
}
