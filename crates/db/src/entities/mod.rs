//! `SeaORM` entities.

pub mod audit_entries;
pub mod fee_catalog;
pub mod financial_records;
pub mod sea_orm_active_enums;
pub mod students;
