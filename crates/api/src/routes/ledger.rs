//! Ledger routes: single transactions, cohort billing, balances.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use bursar_core::ValidationError;
use bursar_core::ledger::{
    AssignCohortInput, DateRange, RecordStatus, RecordTransactionInput, RecordType,
    TransactionFilter,
};
use bursar_shared::types::{FinancialRecordId, StudentId, TenantId};

use crate::{AppState, error::ApiError, middleware::Tenant};

/// Creates the ledger routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ledger/transactions",
            get(list_transactions).post(record_transaction),
        )
        .route("/ledger/transactions/{record_id}", get(get_transaction))
        .route(
            "/ledger/transactions/{record_id}/status",
            patch(update_status),
        )
        .route("/ledger/cohort-assignments", post(assign_cohort))
        .route("/ledger/students/{student_id}/balance", get(student_balance))
}

/// Query parameters for listing ledger records.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Tenant to read when an admin acts for another tenant.
    pub tenant_id: Option<TenantId>,
    /// Only this student.
    pub student_id: Option<StudentId>,
    /// Only this record type.
    #[serde(rename = "type")]
    pub record_type: Option<RecordType>,
    /// Only this status.
    pub status: Option<RecordStatus>,
    /// First business date included.
    pub from: Option<NaiveDate>,
    /// Last business date included.
    pub to: Option<NaiveDate>,
}

impl ListTransactionsQuery {
    fn into_filter(self) -> Result<TransactionFilter, ValidationError> {
        Ok(TransactionFilter {
            student_id: self.student_id,
            record_type: self.record_type,
            status: self.status,
            date_range: DateRange::new(self.from, self.to)?,
        })
    }
}

/// Query parameters for a balance lookup.
#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    /// Tenant to read when an admin acts for another tenant.
    pub tenant_id: Option<TenantId>,
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: RecordStatus,
}

/// POST `/ledger/transactions` - Record a fee, payment or discount.
async fn record_transaction(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    payload: Result<Json<RecordTransactionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let record = state.ledger.record_transaction(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/ledger/transactions` - List records of the caller's tenant.
async fn list_transactions(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let ctx = match query.tenant_id {
        Some(target) if target != ctx.tenant_id => ctx.acting_for(target)?,
        _ => ctx,
    };
    let filter = query.into_filter().map_err(bursar_core::CoreError::from)?;
    let records = state.ledger.list_transactions(&ctx, &filter).await?;
    Ok(Json(json!({ "transactions": records })))
}

/// GET `/ledger/transactions/{record_id}` - Fetch one record.
async fn get_transaction(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(record_id): Path<FinancialRecordId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.get_transaction(&ctx, record_id).await?))
}

/// PATCH `/ledger/transactions/{record_id}/status` - Move a record to another status.
async fn update_status(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(record_id): Path<FinancialRecordId>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let record = state
        .ledger
        .update_status(&ctx, record_id, request.status)
        .await?;
    Ok(Json(record))
}

/// POST `/ledger/cohort-assignments` - Bill every student of a cohort.
async fn assign_cohort(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    payload: Result<Json<AssignCohortInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let created = state.ledger.assign_to_cohort(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "created": created }))))
}

/// GET `/ledger/students/{student_id}/balance` - Full-scan balance of one student.
async fn student_balance(
    State(state): State<AppState>,
    Tenant(ctx): Tenant,
    Path(student_id): Path<StudentId>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let ctx = match query.tenant_id {
        Some(target) if target != ctx.tenant_id => ctx.acting_for(target)?,
        _ => ctx,
    };
    Ok(Json(state.ledger.compute_balance(&ctx, student_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = ListTransactionsQuery {
            from: NaiveDate::from_ymd_opt(2026, 10, 1),
            to: NaiveDate::from_ymd_opt(2026, 9, 1),
            ..ListTransactionsQuery::default()
        };
        assert!(matches!(
            query.into_filter(),
            Err(ValidationError::InvertedDateRange { .. })
        ));
    }
}
