//! clockfaced — multi-tenant face-match attendance daemon.
//!
//! Wires the matcher and punch state machine from `clockface-core` to the
//! SQLite store and exposes them over an HTTP API: descriptor enrollment,
//! the attendance punch endpoint, reporting and dashboard queries, and the
//! minimal tenant management around them.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use clockface_core::NearestMatcher;
use clockface_store::Store;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod policy;
pub mod service;

pub use config::Config;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub matcher: Arc<NearestMatcher>,
    /// Match against all tenants instead of the caller's company.
    pub cross_tenant_match: bool,
}

impl AppState {
    pub fn new(store: Store, matcher: NearestMatcher, cross_tenant_match: bool) -> Self {
        Self {
            store,
            matcher: Arc::new(matcher),
            cross_tenant_match,
        }
    }
}

/// Build the application router: bearer-token-protected API routes plus
/// the public health and company-registration endpoints.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/me", get(api::users::me))
        .route("/api/users", get(api::users::list).post(api::users::create))
        .route("/api/users/:id", get(api::users::show))
        .route("/api/shifts", get(api::shifts::list).post(api::shifts::create))
        .route(
            "/api/face-descriptor",
            post(api::descriptors::store)
                .get(api::descriptors::show)
                .delete(api::descriptors::destroy),
        )
        .route("/api/attendance/mark", post(api::attendance::mark))
        .route("/api/attendance/user/:id", get(api::attendance::for_user))
        .route("/api/attendance/raw", get(api::attendance::raw))
        .route("/api/dashboard/stats", get(api::attendance::dashboard))
        .route("/api/company/details", get(api::companies::details))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/companies/register", post(api::companies::register));

    Router::new().merge(protected).merge(public).with_state(state)
}
