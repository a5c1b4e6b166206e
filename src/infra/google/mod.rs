//! Google Maps web-service client.

mod client;

pub use client::GoogleMapsClient;
