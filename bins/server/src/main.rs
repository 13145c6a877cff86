//! Bursar API Server
//!
//! Main entry point for the Bursar backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bursar_api::{AppState, create_router};
use bursar_core::audit::{AuditLog, QueryLimits};
use bursar_core::fees::FeeCatalogService;
use bursar_core::ledger::LedgerService;
use bursar_core::tenant::{JwtIdentityProvider, TenantContextResolver};
use bursar_db::{
    AuditRepository, FeeCatalogRepository, FinancialRecordRepository, StudentRepository, connect,
};
use bursar_shared::{AppConfig, JwtService, JwtSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bursar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let jwt_service = JwtService::new(JwtSettings {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
    });
    let resolver = TenantContextResolver::with_cache_config(
        Arc::new(JwtIdentityProvider::new(jwt_service)),
        config.session_cache.max_capacity,
        config.session_cache.ttl_secs,
    );

    let students = Arc::new(StudentRepository::new(db.clone()));
    let fees = Arc::new(FeeCatalogRepository::new(db.clone()));
    let ledger = Arc::new(FinancialRecordRepository::new(db.clone()));
    let audit = AuditLog::with_limits(
        Arc::new(AuditRepository::new(db)),
        QueryLimits {
            default_limit: u32::try_from(config.audit.default_query_limit).unwrap_or(u32::MAX),
            max_limit: u32::try_from(config.audit.max_query_limit).unwrap_or(u32::MAX),
        },
    );

    let state = AppState {
        resolver,
        fees: FeeCatalogService::new(fees.clone(), students.clone(), audit.clone()),
        ledger: LedgerService::new(ledger, students, fees, audit.clone()),
        audit,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
