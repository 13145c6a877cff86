//! Fee catalog repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use bursar_core::fees::{Applicability, FeeCatalogEntry, FeeFilter};
use bursar_core::store::{FeeCatalogStore, StoreError};
use bursar_shared::types::{ClassroomId, FeeCatalogId, TenantId};

use super::{store_err, to_utc};
use crate::entities::sea_orm_active_enums::FeeCategory;
use crate::entities::{fee_catalog, financial_records};
use crate::rls::RlsConnection;

impl From<fee_catalog::Model> for FeeCatalogEntry {
    fn from(model: fee_catalog::Model) -> Self {
        Self {
            id: model.id.into(),
            tenant_id: model.tenant_id.into(),
            name: model.name,
            amount: model.amount.normalize(),
            category: model.category.into(),
            applicability: Applicability {
                level: model.applicability_level,
                grade: model.applicability_grade,
                classroom_id: model.applicability_classroom_id.map(Into::into),
            },
            created_by: model.created_by.into(),
            created_at: to_utc(model.created_at),
            updated_at: to_utc(model.updated_at),
        }
    }
}

/// Fee catalog persistence over the `fee_catalog` table.
#[derive(Debug, Clone)]
pub struct FeeCatalogRepository {
    db: DatabaseConnection,
}

impl FeeCatalogRepository {
    /// Creates a new fee catalog repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeeCatalogStore for FeeCatalogRepository {
    async fn insert_fee(&self, entry: FeeCatalogEntry) -> Result<(), StoreError> {
        let rls = RlsConnection::new(&self.db, entry.tenant_id)
            .await
            .map_err(store_err)?;
        let model = fee_catalog::ActiveModel {
            id: Set(entry.id.into_inner()),
            tenant_id: Set(entry.tenant_id.into_inner()),
            name: Set(entry.name),
            amount: Set(entry.amount),
            category: Set(FeeCategory::from(entry.category)),
            applicability_level: Set(entry.applicability.level),
            applicability_grade: Set(entry.applicability.grade),
            applicability_classroom_id: Set(entry
                .applicability
                .classroom_id
                .map(ClassroomId::into_inner)),
            created_by: Set(entry.created_by.into_inner()),
            created_at: Set(entry.created_at.into()),
            updated_at: Set(entry.updated_at.into()),
        };
        model.insert(rls.transaction()).await.map_err(store_err)?;
        rls.commit().await.map_err(store_err)
    }

    async fn find_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<Option<FeeCatalogEntry>, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let found = fee_catalog::Entity::find_by_id(id.into_inner())
            .filter(fee_catalog::Column::TenantId.eq(tenant_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(found.map(FeeCatalogEntry::from))
    }

    async fn list_fees(
        &self,
        tenant_id: TenantId,
        filter: &FeeFilter,
    ) -> Result<Vec<FeeCatalogEntry>, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let mut query = fee_catalog::Entity::find()
            .filter(fee_catalog::Column::TenantId.eq(tenant_id.into_inner()));

        if let Some(category) = filter.category {
            query = query.filter(fee_catalog::Column::Category.eq(FeeCategory::from(category)));
        }
        if let Some(level) = &filter.level {
            query = query.filter(fee_catalog::Column::ApplicabilityLevel.eq(level.as_str()));
        }
        if let Some(grade) = &filter.grade {
            query = query.filter(fee_catalog::Column::ApplicabilityGrade.eq(grade.as_str()));
        }
        if let Some(classroom_id) = filter.classroom_id {
            query = query.filter(
                fee_catalog::Column::ApplicabilityClassroomId.eq(classroom_id.into_inner()),
            );
        }

        let models = query
            .order_by_asc(fee_catalog::Column::Name)
            .order_by_asc(fee_catalog::Column::Id)
            .all(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;

        // Name matching is case-insensitive substring; done here so it agrees
        // with FeeFilter::matches exactly.
        Ok(models
            .into_iter()
            .map(FeeCatalogEntry::from)
            .filter(|entry| filter.matches(entry))
            .collect())
    }

    async fn rename_fee(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<FeeCatalogEntry, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let existing = fee_catalog::Entity::find_by_id(id.into_inner())
            .filter(fee_catalog::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(rls.transaction())
            .await
            .map_err(store_err)?
            .ok_or(StoreError::NotFound)?;

        let mut model = existing.into_active_model();
        model.name = Set(name.to_string());
        model.updated_at = Set(updated_at.into());
        let updated = model.update(rls.transaction()).await.map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(updated.into())
    }

    async fn delete_unreferenced(
        &self,
        tenant_id: TenantId,
        id: FeeCatalogId,
    ) -> Result<FeeCatalogEntry, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let txn = rls.transaction();

        // The row lock serializes against inserts that take FOR SHARE on it.
        let existing = fee_catalog::Entity::find_by_id(id.into_inner())
            .filter(fee_catalog::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(store_err)?
            .ok_or(StoreError::NotFound)?;

        let references = financial_records::Entity::find()
            .filter(financial_records::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(financial_records::Column::FeeCatalogId.eq(id.into_inner()))
            .count(txn)
            .await
            .map_err(store_err)?;
        if references > 0 {
            rls.rollback().await.map_err(store_err)?;
            return Err(StoreError::Conflict(format!(
                "fee catalog entry is referenced by {references} ledger records"
            )));
        }

        fee_catalog::Entity::delete_by_id(id.into_inner())
            .exec(txn)
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(existing.into())
    }
}
