//! Detailed data table and its CSV export.
//!
//! One row per displayed site, with the column headers of the download
//! offered on the dashboard.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::TrafficSite;
use crate::summary::pct;

/// Default download name for the table.
pub const EXPORT_FILE_NAME: &str = "traffic_data.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Site Number")]
    pub site_number: String,
    #[serde(rename = "Road Name")]
    pub road_name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Total Vehicles (Class 3+)")]
    pub total_vehicles: u64,
    #[serde(rename = "Medium Trucks (3-5)")]
    pub medium_trucks: u64,
    #[serde(rename = "Heavy Trucks (6+)")]
    pub heavy_trucks: u64,
    #[serde(rename = "Heavy Truck %")]
    pub heavy_truck_pct: f64,
}

impl ExportRow {
    pub fn from_site(site: &TrafficSite) -> Self {
        let total = site.counts.total();
        let heavy = site.counts.heavy();
        Self {
            site_number: site.site.site_number.clone(),
            road_name: site.site.road_name.clone(),
            location: site.site.location_desc.clone(),
            total_vehicles: total,
            medium_trucks: site.counts.medium(),
            heavy_trucks: heavy,
            heavy_truck_pct: round2(pct(heavy, total)),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn table_rows(sites: &[TrafficSite]) -> Vec<ExportRow> {
    sites.iter().map(ExportRow::from_site).collect()
}

/// Writes `rows` as CSV with a header line.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[ExportRow]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes the table to `path`, gzip-compressed when `gzip` is set.
pub fn write_csv_file(path: &Path, rows: &[ExportRow], gzip: bool) -> Result<()> {
    debug!(path = %path.display(), gzip, "Writing CSV export");
    let file = File::create(path)?;

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_csv(rows, &mut encoder)?;
        encoder.finish()?;
    } else {
        write_csv(rows, file)?;
    }

    info!(path = %path.display(), rows = rows.len(), "CSV export written");
    Ok(())
}
