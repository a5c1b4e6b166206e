//! Actix Web server for the interactive dashboard.
//!
//! Handlers share only immutable state: the datasets loaded at startup and
//! the estimator. Every request re-derives the classification, map, table and
//! estimate from that state plus its own query string.

use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, http::header, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::estimate::{Estimator, FuelClass};
use crate::export::{EXPORT_FILE_NAME, table_rows, to_csv_string};
use crate::loader::Datasets;
use crate::map::{LayerVisibility, MapRequest, compose_map};
use crate::model::ClassSelection;
use crate::render::{DashboardView, EstimateOutcome, FormState, render_dashboard};
use crate::summary::class_totals;

/// Shared state backing HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub datasets: Arc<Datasets>,
    pub estimator: Estimator,
}

impl AppState {
    fn map_request<'a>(&'a self, form: &'a FormState) -> MapRequest<'a> {
        MapRequest {
            sites: &self.datasets.sites,
            stations: &self.datasets.stations,
            routes: &self.datasets.routes,
            visibility: form.visibility,
            selection: &form.selection,
        }
    }
}

/// Dashboard query string, decoded from raw pairs so that `classes` may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQuery {
    pub form: FormState,
    /// Set when the user pressed "Calculate Distance".
    pub estimate_requested: bool,
    pub invalid: Vec<String>,
}

impl DashboardQuery {
    /// Interprets query pairs. Layer checkboxes fall back to their defaults
    /// until the filter form has been submitted (`filters=1`), after which an
    /// absent checkbox means "off".
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let get = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        let submitted = get("filters").is_some();
        let flag = |key: &str, default: bool| {
            if submitted {
                get(key).is_some_and(|v| v != "off" && v != "false" && v != "0")
            } else {
                get(key).map_or(default, |v| v != "off" && v != "false" && v != "0")
            }
        };

        let defaults = LayerVisibility::default();
        let visibility = LayerVisibility {
            traffic: flag("traffic", defaults.traffic),
            hydrogen: flag("hydrogen", defaults.hydrogen),
            railway: flag("railway", defaults.railway),
            freight_roads: flag("roads", defaults.freight_roads),
            secondary_roads: flag("secondary", defaults.secondary_roads),
        };

        let mut invalid = Vec::new();
        let mut classes = Vec::new();
        for (_, value) in pairs.iter().filter(|(k, _)| k == "classes") {
            match ClassSelection::parse_list(value) {
                Ok(sel) => classes.extend(sel.classes()),
                Err(e) => invalid.push(e.user_notice()),
            }
        }
        let selection: ClassSelection = classes.into_iter().collect::<ClassSelection>();

        let truck_class = match get("truck_class") {
            Some(raw) => match raw.parse::<FuelClass>() {
                Ok(class) => Some(class),
                Err(e) => {
                    invalid.push(e.user_notice());
                    None
                }
            },
            None => None,
        };

        let site_index = get("site").and_then(|s| s.parse().ok()).unwrap_or(0);
        let destination = get("destination").unwrap_or_default().to_string();

        Self {
            estimate_requested: get("destination").is_some(),
            form: FormState {
                selection,
                visibility,
                site_index,
                destination,
                truck_class,
            },
            invalid,
        }
    }
}

/// Runs the estimator for the form, translating failures into page notices.
async fn run_estimate(state: &AppState, form: &FormState) -> EstimateOutcome {
    if form.destination.trim().is_empty() {
        return EstimateOutcome::Warning("Please enter a destination address.".to_string());
    }
    let Some(site) = state.datasets.sites.get(form.site_index) else {
        return EstimateOutcome::Warning("Please select a valid starting point.".to_string());
    };
    let truck_class = form.truck_class.unwrap_or(FuelClass::ALL[0]);

    match state
        .estimator
        .estimate(site.coordinate(), &form.destination, truck_class)
        .await
    {
        Ok(estimate) => EstimateOutcome::Estimate(estimate),
        Err(e) => {
            warn!(error = %e, "Estimate unavailable");
            EstimateOutcome::Error(e.user_notice())
        }
    }
}

#[tracing::instrument(skip_all)]
async fn index_route(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = DashboardQuery::from_pairs(&query);
    let form = &query.form;

    let estimate = if query.estimate_requested {
        Some(run_estimate(&state, form).await)
    } else {
        None
    };

    let map = compose_map(&state.map_request(form));
    let rows = table_rows(&state.datasets.sites);
    let totals = class_totals(&state.datasets.sites);
    let mut notices = state.datasets.notices.clone();
    notices.extend(query.invalid.iter().cloned());

    let view = DashboardView {
        map: map.as_ref(),
        sites: &state.datasets.sites,
        rows: &rows,
        class_totals: &totals,
        form,
        estimate: estimate.as_ref(),
        notices: &notices,
        api_available: state.estimator.is_available(),
        generated_at: Utc::now(),
    };

    match render_dashboard(&view) {
        Ok(html) => HttpResponse::Ok()
            .content_type(header::ContentType::html())
            .body(html),
        Err(e) => {
            error!(error = %e, "Failed to render dashboard");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(skip_all)]
async fn export_route(state: web::Data<AppState>) -> HttpResponse {
    match to_csv_string(&table_rows(&state.datasets.sites)) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ))
            .body(csv),
        Err(e) => {
            error!(error = %e, "Failed to export CSV");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(skip_all)]
async fn map_api_route(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let query = DashboardQuery::from_pairs(&query);
    match compose_map(&state.map_request(&query.form)) {
        Some(map) => HttpResponse::Ok().json(map),
        None => HttpResponse::ServiceUnavailable().json(json!({ "notice": "No traffic sites loaded" })),
    }
}

#[derive(Debug, Deserialize)]
struct EstimateQuery {
    site: usize,
    destination: String,
    truck_class: String,
}

#[tracing::instrument(skip(state))]
async fn estimate_api_route(
    state: web::Data<AppState>,
    query: web::Query<EstimateQuery>,
) -> HttpResponse {
    let truck_class = match query.truck_class.parse::<FuelClass>() {
        Ok(c) => c,
        Err(e) => return HttpResponse::BadRequest().json(json!({ "notice": e.user_notice() })),
    };
    let Some(site) = state.datasets.sites.get(query.site) else {
        return HttpResponse::NotFound().json(json!({ "notice": "Unknown starting site" }));
    };

    match state
        .estimator
        .estimate(site.coordinate(), &query.destination, truck_class)
        .await
    {
        Ok(estimate) => HttpResponse::Ok().json(estimate),
        Err(e) if e.is_unavailable() => {
            warn!(error = %e, "Distance service unavailable");
            HttpResponse::ServiceUnavailable().json(json!({ "notice": e.user_notice() }))
        }
        Err(e) => {
            warn!(error = %e, "Estimate unavailable");
            HttpResponse::UnprocessableEntity().json(json!({ "notice": e.user_notice() }))
        }
    }
}

/// Registers all dashboard routes on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_route))
        .route("/export.csv", web::get().to(export_route))
        .route("/api/map", web::get().to(map_api_route))
        .route("/api/estimate", web::get().to(estimate_api_route));
}

/// Runs the server until it is stopped.
pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    info!(
        bind,
        sites = state.datasets.sites.len(),
        stations = state.datasets.stations.len(),
        routes = state.datasets.routes.len(),
        estimator = state.estimator.is_available(),
        "Starting dashboard server"
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::FuelModel;
    use crate::model::{ClassCounts, Coordinate, SiteDescriptor, TrafficSite};
    use actix_web::test as actix_test;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn state() -> AppState {
        let sites = vec![TrafficSite {
            site: SiteDescriptor {
                site_number: "7".to_string(),
                road_name: "Albany Hwy".to_string(),
                location_desc: "Williams".to_string(),
                road_dir: "Both".to_string(),
                location: Coordinate::new(-33.0, 116.9),
            },
            counts: ClassCounts {
                class3: 4,
                class9: 6,
                ..Default::default()
            },
        }];
        AppState {
            datasets: Arc::new(Datasets {
                sites,
                ..Default::default()
            }),
            estimator: Estimator::unavailable(FuelModel::default(), "no key in test"),
        }
    }

    #[test]
    fn test_query_defaults_before_submit() {
        let q = DashboardQuery::from_pairs(&[]);
        assert_eq!(q.form.visibility, LayerVisibility::default());
        assert!(q.form.selection.is_all());
        assert!(!q.estimate_requested);
    }

    #[test]
    fn test_query_after_submit() {
        let q = DashboardQuery::from_pairs(&pairs(&[
            ("filters", "1"),
            ("railway", "on"),
            ("classes", "3"),
            ("classes", "9,10"),
            ("truck_class", "class-10-b-double"),
            ("site", "2"),
            ("destination", "Kalgoorlie"),
        ]));
        assert!(!q.form.visibility.traffic);
        assert!(q.form.visibility.railway);
        assert_eq!(q.form.selection.labels(), "Class 3, Class 9, Class 10");
        assert_eq!(q.form.truck_class, Some(FuelClass::Class10BDouble));
        assert_eq!(q.form.site_index, 2);
        assert!(q.estimate_requested);
        assert!(q.invalid.is_empty());
    }

    #[test]
    fn test_query_collects_invalid_values() {
        let q = DashboardQuery::from_pairs(&pairs(&[("classes", "12"), ("truck_class", "ute")]));
        assert_eq!(q.invalid.len(), 2);
        assert!(q.form.selection.is_all());
    }

    #[actix_web::test]
    async fn test_index_renders() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body = actix_test::read_body(resp).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("Truck Dashboard"));
        assert!(html.contains("Albany Hwy - Williams"));
    }

    #[actix_web::test]
    async fn test_estimate_without_api_shows_notice() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/?destination=Perth&site=0&truck_class=class-4-medium-rigid")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        let body = actix_test::read_body(resp).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("Please check your API key"));
        assert!(!html.contains("Estimated Fuel<strong>"));

        let req = actix_test::TestRequest::get()
            .uri("/api/estimate?site=0&destination=Perth&truck_class=class-4-medium-rigid")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 503);

        let req = actix_test::TestRequest::get()
            .uri("/api/estimate?site=0&destination=%20&truck_class=class-4-medium-rigid")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 422);
    }

    #[actix_web::test]
    async fn test_export_csv() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/export.csv").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body = actix_test::read_body(resp).await;
        let csv = std::str::from_utf8(&body).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().starts_with("7,Albany Hwy,Williams,10,4,6,60"));
    }
}
