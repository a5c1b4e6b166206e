pub mod classify;
pub mod config;
pub mod error;
pub mod estimate;
pub mod export;
pub mod fetch;
pub mod infra;
pub mod loader;
pub mod map;
pub mod model;
pub mod render;
pub mod services;
pub mod summary;
pub mod web;
