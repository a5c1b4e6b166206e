//! Service seams for external providers.

pub mod distance_api;
