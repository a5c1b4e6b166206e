//! Concrete clients for external providers.

pub mod google;
