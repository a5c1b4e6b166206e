//! Error taxonomy for the dashboard library.
//!
//! Every variant is recoverable: loaders degrade by disabling a layer and the
//! estimator surfaces a notice to the user. Nothing here is retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("input file `{path}` not found")]
    MissingInput { path: PathBuf },
    #[error("input file `{path}` is malformed: {reason}")]
    MalformedInput { path: PathBuf, reason: String },
    #[error("distance service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("destination `{0}` could not be resolved")]
    UnresolvedDestination(String),
    #[error("no driving route found (element status `{status}`)")]
    RouteNotFound { status: String },
    #[error("distance service rejected the request with status `{status}`: {message}")]
    ServiceRejected { status: String, message: String },
    #[error("request to distance service failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown truck class `{0}`")]
    UnknownTruckClass(String),
    #[error("unknown vehicle class `{0}`")]
    UnknownVehicleClass(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    /// Text shown to the dashboard user when this error ends an interaction.
    pub fn user_notice(&self) -> String {
        match self {
            DashboardError::MissingInput { path } => {
                format!("{} not found.", path.display())
            }
            DashboardError::MalformedInput { path, .. } => {
                format!("{} could not be read and was skipped.", path.display())
            }
            DashboardError::ServiceUnavailable(_) => {
                "Google Maps API is not available. Please check your API key.".to_string()
            }
            DashboardError::UnresolvedDestination(_)
            | DashboardError::RouteNotFound { .. } => {
                "Failed to calculate distance. Please check your destination address.".to_string()
            }
            DashboardError::ServiceRejected { status, .. } => {
                format!("Error calculating distance: service returned {status}.")
            }
            DashboardError::Request(e) if e.is_timeout() => {
                "Error calculating distance: the distance service timed out.".to_string()
            }
            DashboardError::Request(_) => {
                "Error calculating distance: the distance service could not be reached."
                    .to_string()
            }
            DashboardError::Io(e) => format!("I/O error: {e}"),
            DashboardError::UnknownTruckClass(s) => format!("Unknown truck class: {s}"),
            DashboardError::UnknownVehicleClass(s) => format!("Unknown vehicle class: {s}"),
        }
    }

    /// `true` when the distance service itself could not be used, as opposed
    /// to it answering that the trip cannot be estimated.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DashboardError::ServiceUnavailable(_) | DashboardError::Request(_)
        )
    }
}
