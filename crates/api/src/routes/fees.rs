//! Fee catalog routes.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use bursar_core::fees::{CreateFeeInput, FeeFilter};
use bursar_shared::types::FeeCatalogId;

use crate::{AppState, error::ApiError, middleware::Tenant};

/// Creates the fee catalog routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fees", get(list_fees).post(create_fee))
        .route(
            "/fees/{fee_id}",
            get(get_fee).patch(rename_fee).delete(delete_fee),
        )
}

/// Request body for renaming a catalog entry.
#[derive(Debug, Deserialize)]
pub struct RenameFeeRequest {
    /// New display name.
    pub name: String,
}

/// GET `/fees` - List catalog entries of the caller's tenant.
async fn list_fees(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    query: Result<Query<FeeFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filter) = query?;
    let fees = state.fees.list(&ctx, &filter).await?;
    Ok(Json(json!({ "fees": fees })))
}

/// POST `/fees` - Create a catalog entry.
async fn create_fee(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    payload: Result<Json<CreateFeeInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let entry = state.fees.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET `/fees/{fee_id}` - Fetch one catalog entry.
async fn get_fee(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(fee_id): Path<FeeCatalogId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.fees.get(&ctx, fee_id).await?))
}

/// PATCH `/fees/{fee_id}` - Rename a catalog entry.
async fn rename_fee(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(fee_id): Path<FeeCatalogId>,
    payload: Result<Json<RenameFeeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.fees.rename(&ctx, fee_id, &request.name).await?))
}

/// DELETE `/fees/{fee_id}` - Delete an entry no ledger record references.
async fn delete_fee(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(fee_id): Path<FeeCatalogId>,
) -> Result<impl IntoResponse, ApiError> {
    state.fees.delete(&ctx, fee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
