//! Row-Level Security (RLS) context management.
//!
//! Every repository call runs inside a transaction that first sets
//! `app.current_tenant_id` with `SET LOCAL`, so the policies installed by the
//! migration apply on top of the explicit `tenant_id` filters.
//!
//! # Usage
//!
//! ```ignore
//! use bursar_db::rls::RlsConnection;
//!
//! let rls = RlsConnection::new(&db, tenant_id).await?;
//! let fees = fee_catalog::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

use bursar_shared::types::TenantId;

/// Which rows the transaction may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlsScope {
    /// One tenant's rows.
    Tenant(TenantId),
    /// Read access to every tenant's audit entries.
    AdminAudit,
}

impl RlsScope {
    fn statement(self) -> String {
        match self {
            // A TenantId is a UUID, so interpolating it cannot inject SQL.
            Self::Tenant(tenant_id) => format!("SET LOCAL app.current_tenant_id = '{tenant_id}'"),
            Self::AdminAudit => "SET LOCAL app.current_role = 'admin'".to_string(),
        }
    }
}

/// A transaction with the RLS context already set.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction scoped to one tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the RLS
    /// context cannot be set.
    pub async fn new(db: &DatabaseConnection, tenant_id: TenantId) -> Result<Self, DbErr> {
        Self::with_scope(db, RlsScope::Tenant(tenant_id)).await
    }

    /// Begins a transaction with an explicit scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the RLS
    /// context cannot be set.
    pub async fn with_scope(db: &DatabaseConnection, scope: RlsScope) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        txn.execute_unprepared(&scope.statement()).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}
