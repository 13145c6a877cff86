//! Ledger record repository, including the transactional cohort billing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
};

use bursar_core::ledger::{Cohort, CohortCharge, FinancialRecord, RecordStatus, TransactionFilter};
use bursar_core::store::{LedgerStore, StoreError};
use bursar_shared::types::{FeeCatalogId, FinancialRecordId, TenantId};

use super::{store_err, to_utc};
use crate::entities::sea_orm_active_enums::{
    RecordStatus as DbRecordStatus, RecordType as DbRecordType,
};
use crate::entities::{fee_catalog, financial_records, students};
use crate::rls::RlsConnection;

impl From<financial_records::Model> for FinancialRecord {
    fn from(model: financial_records::Model) -> Self {
        Self {
            id: model.id.into(),
            tenant_id: model.tenant_id.into(),
            student_id: model.student_id.into(),
            fee_catalog_id: model.fee_catalog_id.map(Into::into),
            record_type: model.record_type.into(),
            amount: model.amount.normalize(),
            description: model.description,
            status: model.status.into(),
            date: model.date,
            invoice_number: model.invoice_number,
            created_by: model.created_by.into(),
            created_at: to_utc(model.created_at),
            updated_at: to_utc(model.updated_at),
        }
    }
}

fn active_model(record: &FinancialRecord) -> financial_records::ActiveModel {
    financial_records::ActiveModel {
        id: Set(record.id.into_inner()),
        tenant_id: Set(record.tenant_id.into_inner()),
        student_id: Set(record.student_id.into_inner()),
        fee_catalog_id: Set(record.fee_catalog_id.map(FeeCatalogId::into_inner)),
        record_type: Set(DbRecordType::from(record.record_type)),
        amount: Set(record.amount),
        description: Set(record.description.clone()),
        status: Set(DbRecordStatus::from(record.status)),
        date: Set(record.date),
        invoice_number: Set(record.invoice_number.clone()),
        created_by: Set(record.created_by.into_inner()),
        created_at: Set(record.created_at.into()),
        updated_at: Set(record.updated_at.into()),
    }
}

/// Bind parameters per inserted `financial_records` row.
const BINDS_PER_ROW: usize = 13;

/// Rows per `INSERT`, keeping each statement under PostgreSQL's 65535
/// bind parameters.
const INSERT_BATCH_ROWS: usize = 65_535 / BINDS_PER_ROW;

/// Takes a shared lock on a catalog entry so it cannot be deleted while
/// records referencing it are being inserted.
async fn lock_fee(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    id: FeeCatalogId,
) -> Result<(), StoreError> {
    fee_catalog::Entity::find_by_id(id.into_inner())
        .filter(fee_catalog::Column::TenantId.eq(tenant_id.into_inner()))
        .lock_shared()
        .one(txn)
        .await
        .map_err(store_err)?
        .map(|_| ())
        .ok_or(StoreError::NotFound)
}

/// Ledger persistence over the `financial_records` table.
#[derive(Debug, Clone)]
pub struct FinancialRecordRepository {
    db: DatabaseConnection,
}

impl FinancialRecordRepository {
    /// Creates a new financial record repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for FinancialRecordRepository {
    async fn insert_record(&self, record: FinancialRecord) -> Result<(), StoreError> {
        let rls = RlsConnection::new(&self.db, record.tenant_id)
            .await
            .map_err(store_err)?;
        if let Some(fee_catalog_id) = record.fee_catalog_id {
            lock_fee(rls.transaction(), record.tenant_id, fee_catalog_id).await?;
        }
        active_model(&record)
            .insert(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)
    }

    async fn find_record(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
    ) -> Result<Option<FinancialRecord>, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let found = financial_records::Entity::find_by_id(id.into_inner())
            .filter(financial_records::Column::TenantId.eq(tenant_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(found.map(FinancialRecord::from))
    }

    async fn list_records(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let mut query = financial_records::Entity::find()
            .filter(financial_records::Column::TenantId.eq(tenant_id.into_inner()));

        if let Some(student_id) = filter.student_id {
            query = query.filter(financial_records::Column::StudentId.eq(student_id.into_inner()));
        }
        if let Some(record_type) = filter.record_type {
            query = query
                .filter(financial_records::Column::RecordType.eq(DbRecordType::from(record_type)));
        }
        if let Some(status) = filter.status {
            query = query.filter(financial_records::Column::Status.eq(DbRecordStatus::from(status)));
        }
        if let Some(from) = filter.date_range.from {
            query = query.filter(financial_records::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_range.to {
            query = query.filter(financial_records::Column::Date.lte(to));
        }

        let models = query
            .order_by_asc(financial_records::Column::Date)
            .order_by_asc(financial_records::Column::CreatedAt)
            .order_by_asc(financial_records::Column::Id)
            .all(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(models.into_iter().map(FinancialRecord::from).collect())
    }

    async fn update_status(
        &self,
        tenant_id: TenantId,
        id: FinancialRecordId,
        from: RecordStatus,
        to: RecordStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<FinancialRecord, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let existing = financial_records::Entity::find_by_id(id.into_inner())
            .filter(financial_records::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(rls.transaction())
            .await
            .map_err(store_err)?
            .ok_or(StoreError::NotFound)?;

        let current: RecordStatus = existing.status.into();
        if current != from {
            rls.rollback().await.map_err(store_err)?;
            return Err(StoreError::Conflict(format!(
                "record status changed concurrently to {current}"
            )));
        }

        let mut model = existing.into_active_model();
        model.status = Set(DbRecordStatus::from(to));
        model.updated_at = Set(updated_at.into());
        let updated = model.update(rls.transaction()).await.map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(updated.into())
    }

    async fn assign_cohort(
        &self,
        cohort: &Cohort,
        charge: &CohortCharge,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let rls = RlsConnection::new(&self.db, charge.tenant_id)
            .await
            .map_err(store_err)?;
        let txn = rls.transaction();
        lock_fee(txn, charge.tenant_id, charge.fee_catalog_id).await?;

        let mut members = students::Entity::find()
            .select_only()
            .column(students::Column::Id)
            .filter(students::Column::TenantId.eq(charge.tenant_id.into_inner()));
        members = match cohort {
            Cohort::Classroom { classroom_id } => {
                members.filter(students::Column::ClassroomId.eq(classroom_id.into_inner()))
            }
            Cohort::GradeLevel { grade, level } => members
                .filter(students::Column::Grade.eq(grade.as_str()))
                .filter(students::Column::Level.eq(level.as_str())),
        };
        let student_ids: Vec<uuid::Uuid> = members
            .order_by_asc(students::Column::Id)
            .into_tuple()
            .all(txn)
            .await
            .map_err(store_err)?;

        let records: Vec<FinancialRecord> = student_ids
            .into_iter()
            .map(|id| charge.charge(id.into()))
            .collect();

        for batch in records.chunks(INSERT_BATCH_ROWS) {
            financial_records::Entity::insert_many(batch.iter().map(active_model))
                .exec(txn)
                .await
                .map_err(store_err)?;
        }
        // Dropping the transaction on any error above rolls everything back.
        rls.commit().await.map_err(store_err)?;
        Ok(records)
    }
}
