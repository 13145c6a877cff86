//! String-backed enums stored in `TEXT` columns guarded by `CHECK`
//! constraints.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use bursar_core::fees::FeeCategory as CoreFeeCategory;
use bursar_core::ledger::{RecordStatus as CoreRecordStatus, RecordType as CoreRecordType};
use bursar_core::tenant::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RecordType {
    #[sea_orm(string_value = "fee")]
    Fee,
    #[sea_orm(string_value = "payment")]
    Payment,
    #[sea_orm(string_value = "discount")]
    Discount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RecordStatus {
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "overdue")]
    Overdue,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum FeeCategory {
    #[sea_orm(string_value = "tuition")]
    Tuition,
    #[sea_orm(string_value = "bus")]
    Bus,
    #[sea_orm(string_value = "books")]
    Books,
    #[sea_orm(string_value = "uniform")]
    Uniform,
    #[sea_orm(string_value = "activity")]
    Activity,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ActorRole {
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "secretary")]
    Secretary,
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "parent")]
    Parent,
    #[sea_orm(string_value = "admin")]
    Admin,
}

macro_rules! mirror_enum {
    ($db:ident, $core:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(RecordType, CoreRecordType, [Fee, Payment, Discount]);
mirror_enum!(RecordStatus, CoreRecordStatus, [Completed, Pending, Overdue, Cancelled]);
mirror_enum!(FeeCategory, CoreFeeCategory, [Tuition, Bus, Books, Uniform, Activity, Other]);
mirror_enum!(ActorRole, Role, [Teacher, Secretary, Student, Parent, Admin]);
