//! Audit trail repository. Insert and select only; the table's trigger
//! rejects anything else.

use async_trait::async_trait;
use chrono::{Days, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use bursar_core::audit::{AuditEntry, AuditFilter};
use bursar_core::store::{AuditStore, StoreError};

use super::{store_err, to_utc};
use crate::entities::audit_entries;
use crate::entities::sea_orm_active_enums::ActorRole;
use crate::rls::{RlsConnection, RlsScope};

impl From<audit_entries::Model> for AuditEntry {
    fn from(model: audit_entries::Model) -> Self {
        Self {
            id: model.id.into(),
            tenant_id: model.tenant_id.into(),
            actor_id: model.actor_id.into(),
            actor_role: model.actor_role.into(),
            action_type: model.action_type,
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            details: model.details,
            checksum: model.checksum,
            created_at: to_utc(model.created_at),
        }
    }
}

/// Audit persistence over the `audit_entries` table.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let rls = RlsConnection::new(&self.db, entry.tenant_id)
            .await
            .map_err(store_err)?;
        let model = audit_entries::ActiveModel {
            id: Set(entry.id.into_inner()),
            tenant_id: Set(entry.tenant_id.into_inner()),
            actor_id: Set(entry.actor_id.into_inner()),
            actor_role: Set(ActorRole::from(entry.actor_role)),
            action_type: Set(entry.action_type),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            details: Set(entry.details),
            checksum: Set(entry.checksum),
            created_at: Set(entry.created_at.into()),
        };
        model.insert(rls.transaction()).await.map_err(store_err)?;
        rls.commit().await.map_err(store_err)
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        let scope = filter
            .tenant_id
            .map_or(RlsScope::AdminAudit, RlsScope::Tenant);
        let rls = RlsConnection::with_scope(&self.db, scope)
            .await
            .map_err(store_err)?;

        let mut query = audit_entries::Entity::find();
        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(audit_entries::Column::TenantId.eq(tenant_id.into_inner()));
        }
        if let Some(role) = filter.role {
            query = query.filter(audit_entries::Column::ActorRole.eq(ActorRole::from(role)));
        }
        if let Some(action_type) = &filter.action_type {
            query = query.filter(audit_entries::Column::ActionType.eq(action_type.as_str()));
        }
        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(audit_entries::Column::EntityType.eq(entity_type.as_str()));
        }
        if let Some(from) = filter.date_range.from {
            let start = from.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(audit_entries::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter
            .date_range
            .to
            .and_then(|to| to.checked_add_days(Days::new(1)))
        {
            let end = end.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(audit_entries::Column::CreatedAt.lt(end));
        }

        let models = query
            .order_by_desc(audit_entries::Column::CreatedAt)
            .order_by_desc(audit_entries::Column::Id)
            .limit(u64::try_from(filter.limit).unwrap_or(u64::MAX))
            .all(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(models.into_iter().map(AuditEntry::from).collect())
    }
}
