//! Stockroom API Library
//!
//! Single-tenant inventory backend: a product catalog, an append-only
//! IN/OUT stock-movement ledger, reports derived from it, and an audit
//! trail of every mutation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// All versioned API routes, nested under `/api/v1` by the binary.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/products", handlers::products::products_router())
        .nest("/categories", handlers::categories::categories_router())
        .nest("/stock", handlers::stock::stock_router())
        .nest("/reports", handlers::reports::reports_router())
        .nest("/activity", handlers::activity::activity_router())
        .nest("/health", handlers::health::health_router())
}
