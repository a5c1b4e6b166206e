//! CLI entry point for the freight dashboard.
//!
//! Provides subcommands for serving the interactive dashboard, rendering a
//! static page, classifying sites, estimating trip fuel use, exporting the
//! data table, and summarising class totals.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use freight_dashboard::{
    classify::{Tier, classify},
    config::{DashboardConfig, DataPaths, api_key_from_env},
    estimate::{Estimator, FuelClass},
    export::{EXPORT_FILE_NAME, table_rows, write_csv_file},
    infra::google::GoogleMapsClient,
    loader::Datasets,
    map::{LayerVisibility, MapRequest, compose_map},
    model::{ClassSelection, TrafficSite, VehicleClass},
    render::{DashboardView, FormState, render_dashboard},
    summary::{class_totals, group_thousands},
    web::{AppState, serve},
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "freight_dashboard")]
#[command(about = "Truck traffic, freight route and hydrogen station dashboard", long_about = None)]
struct Cli {
    /// JSON config file (defaults to $FREIGHT_DASHBOARD_CONFIG when set)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory holding the input files; overrides the configured paths
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard over HTTP
    Serve {
        /// Address to bind, e.g. "0.0.0.0:8501"
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Render the dashboard to a static HTML file
    Render {
        #[arg(short, long, default_value = "dashboard.html")]
        output: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print per-site tiers and the percentile thresholds
    Classify {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Estimate distance, fuel and hydrogen for a trip from a traffic site
    Estimate {
        /// Starting site: site number, or zero-based index in the statistics file
        #[arg(short, long)]
        site: String,

        /// Free-text destination address
        #[arg(short, long)]
        destination: String,

        /// Truck class slug or label, e.g. "class-8-artic-5-axle"
        #[arg(short, long, default_value = "class-4-medium-rigid")]
        truck_class: FuelClass,
    },
    /// Export the detailed data table as CSV
    Export {
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,

        /// Gzip-compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Print fleet-wide totals per vehicle class
    Summary,
}

#[derive(Args)]
struct FilterArgs {
    /// Vehicle class to analyse (repeatable); none means all classes
    #[arg(long = "class", value_name = "CLASS")]
    classes: Vec<VehicleClass>,

    /// Hide traffic site markers
    #[arg(long, default_value_t = false)]
    no_traffic: bool,

    /// Hide hydrogen station markers
    #[arg(long, default_value_t = false)]
    no_hydrogen: bool,

    /// Show key freight railway routes
    #[arg(long, default_value_t = false)]
    railway: bool,

    /// Show key freight road routes
    #[arg(long, default_value_t = false)]
    roads: bool,

    /// Show secondary road routes
    #[arg(long, default_value_t = false)]
    secondary: bool,
}

impl FilterArgs {
    fn selection(&self) -> ClassSelection {
        self.classes.iter().copied().collect()
    }

    fn visibility(&self) -> LayerVisibility {
        LayerVisibility {
            traffic: !self.no_traffic,
            hydrogen: !self.no_hydrogen,
            railway: self.railway,
            freight_roads: self.roads,
            secondary_roads: self.secondary,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/freight_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("freight_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("FREIGHT_DASHBOARD_CONFIG").ok());
    let mut config = DashboardConfig::load_or_default(config_path.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data = DataPaths::within(dir);
    }

    let datasets = Datasets::load(&config.data);
    for notice in &datasets.notices {
        warn!(notice = %notice, "Input notice");
    }

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = AppState {
                datasets: Arc::new(datasets),
                estimator: build_estimator(&config),
            };

            // Actix runs its own system; keep it off the tokio runtime threads.
            let server = std::thread::Builder::new()
                .name("dashboard-server".into())
                .spawn(move || actix_web::rt::System::new().block_on(serve(state, &bind)))
                .context("Failed to spawn dashboard server thread")?;
            tokio::task::spawn_blocking(move || server.join())
                .await?
                .map_err(|_| anyhow!("dashboard server thread panicked"))?
                .context("Dashboard server failed")?;
        }
        Commands::Render { output, filters } => {
            if datasets.sites.is_empty() {
                return Err(anyhow!("no traffic sites loaded; nothing to render"));
            }
            let form = FormState {
                selection: filters.selection(),
                visibility: filters.visibility(),
                ..Default::default()
            };
            let map = compose_map(&MapRequest {
                sites: &datasets.sites,
                stations: &datasets.stations,
                routes: &datasets.routes,
                visibility: form.visibility,
                selection: &form.selection,
            });
            let rows = table_rows(&datasets.sites);
            let totals = class_totals(&datasets.sites);
            let html = render_dashboard(&DashboardView {
                map: map.as_ref(),
                sites: &datasets.sites,
                rows: &rows,
                class_totals: &totals,
                form: &form,
                estimate: None,
                notices: &datasets.notices,
                api_available: api_key_from_env().is_some(),
                generated_at: Utc::now(),
            })?;
            std::fs::write(&output, html)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(output = %output.display(), "Dashboard rendered");
        }
        Commands::Classify { filters } => {
            let selection = filters.selection();
            let result = classify(&datasets.sites, &selection);
            let basis = if selection.is_all() {
                "Class 3+".to_string()
            } else {
                selection.labels()
            };

            for (i, site) in datasets.sites.iter().enumerate() {
                info!(
                    site_number = %site.site.site_number,
                    road = %site.site.road_name,
                    aggregate = result.aggregates[i],
                    tier = ?result.tiers[i],
                    "Site"
                );
            }
            info!(
                basis = %basis,
                sites = result.len(),
                low_threshold = result.low_threshold,
                high_threshold = result.high_threshold,
                low = result.count(Tier::Low),
                mid = result.count(Tier::Mid),
                high = result.count(Tier::High),
                "Classification summary"
            );
        }
        Commands::Estimate {
            site,
            destination,
            truck_class,
        } => {
            let origin = find_site(&datasets.sites, &site)
                .ok_or_else(|| anyhow!("no traffic site matches '{site}'"))?;
            let estimator = build_estimator(&config);

            match estimator
                .estimate(origin.coordinate(), &destination, truck_class)
                .await
            {
                Ok(e) => info!(
                    from = %origin.display_name(),
                    to = %destination,
                    truck_class = %e.truck_class,
                    distance = %e.distance_text,
                    duration = %e.duration_text,
                    fuel_litres = format!("{:.1}", e.fuel_litres),
                    hydrogen_kg = format!("{:.1}", e.hydrogen_kg),
                    "Distance calculated successfully"
                ),
                Err(e) => {
                    warn!(error = %e, "{}", e.user_notice());
                }
            }
        }
        Commands::Export { output, gzip } => {
            write_csv_file(&output, &table_rows(&datasets.sites), gzip)?;
        }
        Commands::Summary => {
            for total in class_totals(&datasets.sites) {
                info!(
                    class = %total.label,
                    total = %group_thousands(total.total),
                    "Truck class total"
                );
            }
        }
    }

    Ok(())
}

/// Builds the estimator, falling back to an unavailable one when the Google
/// client cannot be constructed.
fn build_estimator(config: &DashboardConfig) -> Estimator {
    match GoogleMapsClient::from_config(&config.google, api_key_from_env()) {
        Ok(client) => Estimator::new(Arc::new(client), config.fuel.clone()),
        Err(e) => {
            warn!(error = %e, "Google Maps API not available. Some features may be limited.");
            Estimator::unavailable(config.fuel.clone(), e.to_string())
        }
    }
}

/// Matches a site by site number first, then by zero-based index.
fn find_site<'a>(sites: &'a [TrafficSite], key: &str) -> Option<&'a TrafficSite> {
    sites
        .iter()
        .find(|s| s.site.site_number == key)
        .or_else(|| key.parse::<usize>().ok().and_then(|i| sites.get(i)))
}
