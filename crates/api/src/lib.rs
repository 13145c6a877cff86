//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the fee catalog, the ledger and the audit trail
//! - Bearer-token middleware resolving the tenant context
//! - Error to JSON response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bursar_core::audit::AuditLog;
use bursar_core::fees::FeeCatalogService;
use bursar_core::ledger::LedgerService;
use bursar_core::tenant::TenantContextResolver;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Turns bearer tokens into tenant contexts.
    pub resolver: TenantContextResolver,
    /// Fee catalog operations.
    pub fees: FeeCatalogService,
    /// Ledger operations.
    pub ledger: LedgerService,
    /// Audit trail queries.
    pub audit: AuditLog,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
