//! Audit trail routes.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use bursar_core::CoreError;
use bursar_core::audit::AuditQuery;
use bursar_core::ledger::DateRange;
use bursar_core::tenant::Role;
use bursar_shared::types::TenantId;

use crate::{AppState, error::ApiError, middleware::Tenant};

/// Creates the audit routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/audit", get(query_audit))
}

/// Query parameters for reading the audit trail.
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Tenant to read; admins only, and omitted by admins to read every tenant.
    pub tenant_id: Option<TenantId>,
    /// Only entries made by actors in this role.
    pub role: Option<Role>,
    /// Only this action.
    pub action_type: Option<String>,
    /// Only this kind of entity.
    pub entity_type: Option<String>,
    /// First day included (UTC).
    pub from: Option<NaiveDate>,
    /// Last day included (UTC).
    pub to: Option<NaiveDate>,
    /// Maximum number of entries.
    pub limit: Option<u32>,
}

/// GET `/audit` - Newest-first audit entries.
async fn query_audit(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    params: Result<Query<AuditQueryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let query = AuditQuery {
        tenant_id: params.tenant_id,
        role: params.role,
        action_type: params.action_type,
        entity_type: params.entity_type,
        date_range: DateRange::new(params.from, params.to).map_err(CoreError::from)?,
        limit: params.limit,
    };

    let entries = state.audit.query(&ctx, query).await?;
    Ok(Json(json!({ "entries": entries })))
}
