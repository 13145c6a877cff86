//! Student directory mirror.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};

use bursar_core::store::{Student, StudentDirectory, StoreError};
use bursar_shared::types::{ClassroomId, StudentId, TenantId};

use super::store_err;
use crate::entities::students;
use crate::rls::RlsConnection;

impl From<students::Model> for Student {
    fn from(model: students::Model) -> Self {
        Self {
            id: model.id.into(),
            tenant_id: model.tenant_id.into(),
            classroom_id: model.classroom_id.map(Into::into),
            grade: model.grade,
            level: model.level,
        }
    }
}

/// Reads (and, for the directory sync, writes) the `students` table.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    db: DatabaseConnection,
}

impl StudentRepository {
    /// Creates a new student repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts or refreshes a student pushed by the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn upsert(&self, student: &Student) -> Result<(), DbErr> {
        let rls = RlsConnection::new(&self.db, student.tenant_id).await?;
        let model = students::ActiveModel {
            id: Set(student.id.into_inner()),
            tenant_id: Set(student.tenant_id.into_inner()),
            classroom_id: Set(student.classroom_id.map(ClassroomId::into_inner)),
            grade: Set(student.grade.clone()),
            level: Set(student.level.clone()),
            created_at: Set(Utc::now().into()),
        };
        students::Entity::insert(model)
            .on_conflict(
                OnConflict::column(students::Column::Id)
                    .update_columns([
                        students::Column::ClassroomId,
                        students::Column::Grade,
                        students::Column::Level,
                    ])
                    .to_owned(),
            )
            .exec(rls.transaction())
            .await?;
        rls.commit().await
    }
}

#[async_trait]
impl StudentDirectory for StudentRepository {
    async fn find_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> Result<Option<Student>, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let found = students::Entity::find_by_id(student_id.into_inner())
            .filter(students::Column::TenantId.eq(tenant_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(found.map(Student::from))
    }

    async fn classroom_exists(
        &self,
        tenant_id: TenantId,
        classroom_id: ClassroomId,
    ) -> Result<bool, StoreError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await.map_err(store_err)?;
        let count = students::Entity::find()
            .filter(students::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(students::Column::ClassroomId.eq(classroom_id.into_inner()))
            .count(rls.transaction())
            .await
            .map_err(store_err)?;
        rls.commit().await.map_err(store_err)?;
        Ok(count > 0)
    }
}
