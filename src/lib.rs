//! Construction project backend: BOM generation from scaled templates and
//! hybrid (time-based with manual overrides) progress tracking.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
