//! HTTP surface of the service.
//!
//! The router maps each public route onto either the aggregation
//! [`Collector`](crate::facts::Collector) or a single gateway. Handlers never fail:
//! upstream problems travel inside [`UpstreamResult`](crate::facts::UpstreamResult)
//! bodies, and only a registry "not found" or a missing query parameter turns
//! into a 404. Panics are caught by middleware and answered with a generic 500.

mod handlers;
mod middleware;

use crate::facts::Collector;
use axum::Router;
use axum::routing::get;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

pub use handlers::{EITHER_OWNER_OR_REPO_MISSING, NOT_FOUND_ROUTE, PROJECT_NAME_MISSING, SEARCH_QUERY_MISSING, SOMETHING_WENT_WRONG};

/// Everything a handler needs, shared across requests.
#[derive(Debug)]
pub struct ServiceState {
    collector: Collector,
    first_available_date: NaiveDate,
    started: Instant,
}

impl ServiceState {
    #[must_use]
    pub fn new(collector: Collector, first_available_date: NaiveDate) -> Self {
        Self {
            collector,
            first_available_date,
            started: Instant::now(),
        }
    }
}

/// Build the service router.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/package", get(handlers::package))
        .route("/downloads", get(handlers::downloads))
        .route("/npm", get(handlers::npm))
        .route("/bundlephobia", get(handlers::bundlephobia))
        .route("/search", get(handlers::search))
        .route("/github", get(handlers::github))
        .route("/scan", get(handlers::scan))
        .route("/vulnerabilities", get(handlers::vulnerabilities))
        .route("/vulnerability-score", get(handlers::vulnerability_score))
        .route("/_health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::catch_panics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .with_state(Arc::new(state))
}
