//! Ledger domain types.
//!
//! A student's ledger is an append-pattern collection of fee, payment and
//! discount records. Amount and type never change after creation; only the
//! status moves, and only forward.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bursar_shared::types::{
    ActorId, ClassroomId, FeeCatalogId, FinancialRecordId, StudentId, TenantId,
};

use crate::error::ValidationError;

/// Ledger record category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// A charge owed by the student.
    Fee,
    /// Money received from the student.
    Payment,
    /// A reduction of what the student owes.
    Discount,
}

impl RecordType {
    /// Returns the storage/wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fee => "fee",
            Self::Payment => "payment",
            Self::Discount => "discount",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fee" => Ok(Self::Fee),
            "payment" => Ok(Self::Payment),
            "discount" => Ok(Self::Discount),
            _ => Err(format!("Unknown record type: {s}")),
        }
    }
}

/// Ledger record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Settled.
    Completed,
    /// Awaiting settlement.
    Pending,
    /// Past due.
    Overdue,
    /// Voided; excluded from every balance.
    Cancelled,
}

impl RecordStatus {
    /// Returns the storage/wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if records in this status count toward the balance.
    #[must_use]
    pub const fn counts_toward_balance(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Returns true if a record may move from `self` to `next`.
    ///
    /// Re-applying the current status is allowed and is a no-op.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Overdue | Self::Cancelled)
                | (Self::Overdue, Self::Completed | Self::Cancelled)
                | (Self::Completed, Self::Completed)
                | (Self::Pending, Self::Pending)
                | (Self::Overdue, Self::Overdue)
                | (Self::Cancelled, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown record status: {s}")),
        }
    }
}

/// A single ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Record ID.
    pub id: FinancialRecordId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Student the record belongs to.
    pub student_id: StudentId,
    /// Catalog entry the record was billed from, if any. Informational only.
    pub fee_catalog_id: Option<FeeCatalogId>,
    /// Fee, payment or discount.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Strictly positive amount, copied at creation.
    pub amount: Decimal,
    /// Free-text description.
    pub description: String,
    /// Current status.
    pub status: RecordStatus,
    /// Business date of the record.
    pub date: NaiveDate,
    /// Optional invoice number.
    pub invoice_number: Option<String>,
    /// Actor who created the record.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a single transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordTransactionInput {
    /// Target student.
    pub student_id: StudentId,
    /// Fee, payment or discount.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Explicit amount. When absent the catalog amount is used.
    pub amount: Option<Decimal>,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Initial status.
    pub status: RecordStatus,
    /// Business date; defaults to today.
    pub date: Option<NaiveDate>,
    /// Catalog entry this record is billed from.
    pub fee_catalog_id: Option<FeeCatalogId>,
    /// Optional invoice number.
    pub invoice_number: Option<String>,
}

/// A resolved cohort: every student in a classroom, or every student with a
/// given grade and level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cohort {
    /// All students in one classroom.
    Classroom {
        /// The classroom.
        classroom_id: ClassroomId,
    },
    /// All students sharing a grade and level.
    GradeLevel {
        /// Grade, e.g. `"5"`.
        grade: String,
        /// Level, e.g. `"primary"`.
        level: String,
    },
}

/// Raw cohort filter as supplied by callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CohortSelector {
    /// Classroom to bill.
    pub classroom_id: Option<ClassroomId>,
    /// Grade to bill (requires `level`).
    pub grade: Option<String>,
    /// Level to bill (requires `grade`).
    pub level: Option<String>,
}

impl CohortSelector {
    /// Validates the selector into a [`Cohort`].
    ///
    /// # Errors
    ///
    /// `CohortRequired` when neither a classroom nor a complete grade+level
    /// pair is given, `AmbiguousCohort` when both are.
    pub fn resolve(&self) -> Result<Cohort, ValidationError> {
        let grade = self.grade.as_deref().map(str::trim).filter(|g| !g.is_empty());
        let level = self.level.as_deref().map(str::trim).filter(|l| !l.is_empty());

        match (self.classroom_id, grade, level) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ValidationError::AmbiguousCohort),
            (Some(classroom_id), None, None) => Ok(Cohort::Classroom { classroom_id }),
            (None, Some(grade), Some(level)) => Ok(Cohort::GradeLevel {
                grade: grade.to_string(),
                level: level.to_string(),
            }),
            _ => Err(ValidationError::CohortRequired),
        }
    }
}

/// Input for billing a cohort from the fee catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignCohortInput {
    /// Catalog entry to bill.
    pub fee_catalog_id: FeeCatalogId,
    /// Which students to bill.
    #[serde(flatten)]
    pub cohort: CohortSelector,
    /// Description for the created records; defaults to the fee name.
    pub description: Option<String>,
    /// Business date for the created records; defaults to today.
    pub date: Option<NaiveDate>,
}

/// The charge every cohort member receives; one record is stamped out per
/// resolved student inside the storage transaction.
#[derive(Debug, Clone)]
pub struct CohortCharge {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Catalog entry billed.
    pub fee_catalog_id: FeeCatalogId,
    /// Catalog amount at call time.
    pub amount: Decimal,
    /// Description for each record.
    pub description: String,
    /// Business date for each record.
    pub date: NaiveDate,
    /// Acting user.
    pub created_by: ActorId,
    /// Shared creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl CohortCharge {
    /// Builds the pending fee record for one cohort member.
    #[must_use]
    pub fn charge(&self, student_id: StudentId) -> FinancialRecord {
        FinancialRecord {
            id: FinancialRecordId::new(),
            tenant_id: self.tenant_id,
            student_id,
            fee_catalog_id: Some(self.fee_catalog_id),
            record_type: RecordType::Fee,
            amount: self.amount,
            description: self.description.clone(),
            status: RecordStatus::Pending,
            date: self.date,
            invoice_number: None,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Inclusive date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub from: Option<NaiveDate>,
    /// Last day included.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns `InvertedDateRange` when `from` is after `to`.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ValidationError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    /// Checks that the range is not inverted.
    ///
    /// # Errors
    ///
    /// Returns `InvertedDateRange` when `from` is after `to`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => {
                Err(ValidationError::InvertedDateRange { from, to })
            }
            _ => Ok(()),
        }
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Filters for listing ledger records. The tenant filter is not part of this
/// struct: it always comes from the context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Only this student.
    pub student_id: Option<StudentId>,
    /// Only this record type.
    #[serde(rename = "type")]
    pub record_type: Option<RecordType>,
    /// Only this status.
    pub status: Option<RecordStatus>,
    /// Only records dated inside this range.
    #[serde(default)]
    pub date_range: DateRange,
}

impl TransactionFilter {
    /// Filter selecting every record of one student.
    #[must_use]
    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    /// Returns true if `record` passes every filter.
    #[must_use]
    pub fn matches(&self, record: &FinancialRecord) -> bool {
        self.student_id.is_none_or(|id| record.student_id == id)
            && self.record_type.is_none_or(|t| record.record_type == t)
            && self.status.is_none_or(|s| record.status == s)
            && self.date_range.contains(record.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(RecordStatus::Pending, RecordStatus::Completed, true)]
    #[case(RecordStatus::Pending, RecordStatus::Overdue, true)]
    #[case(RecordStatus::Pending, RecordStatus::Cancelled, true)]
    #[case(RecordStatus::Overdue, RecordStatus::Completed, true)]
    #[case(RecordStatus::Overdue, RecordStatus::Cancelled, true)]
    #[case(RecordStatus::Overdue, RecordStatus::Pending, false)]
    #[case(RecordStatus::Completed, RecordStatus::Pending, false)]
    #[case(RecordStatus::Completed, RecordStatus::Cancelled, false)]
    #[case(RecordStatus::Cancelled, RecordStatus::Completed, false)]
    #[case(RecordStatus::Completed, RecordStatus::Completed, true)]
    #[case(RecordStatus::Cancelled, RecordStatus::Cancelled, true)]
    fn test_status_transitions(
        #[case] from: RecordStatus,
        #[case] to: RecordStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_only_cancelled_is_excluded_from_balance() {
        assert!(RecordStatus::Completed.counts_toward_balance());
        assert!(RecordStatus::Pending.counts_toward_balance());
        assert!(RecordStatus::Overdue.counts_toward_balance());
        assert!(!RecordStatus::Cancelled.counts_toward_balance());
    }

    #[test]
    fn test_cohort_selector_classroom() {
        let classroom_id = ClassroomId::new();
        let selector = CohortSelector {
            classroom_id: Some(classroom_id),
            ..CohortSelector::default()
        };
        assert_eq!(selector.resolve().unwrap(), Cohort::Classroom { classroom_id });
    }

    #[test]
    fn test_cohort_selector_grade_level_trimmed() {
        let selector = CohortSelector {
            classroom_id: None,
            grade: Some(" 5 ".to_string()),
            level: Some("primary".to_string()),
        };
        assert_eq!(
            selector.resolve().unwrap(),
            Cohort::GradeLevel {
                grade: "5".to_string(),
                level: "primary".to_string()
            }
        );
    }

    #[rstest]
    #[case(None, Some("5"), None)]
    #[case(None, None, Some("primary"))]
    #[case(None, Some("  "), Some("primary"))]
    #[case(None, None, None)]
    fn test_cohort_selector_incomplete(
        #[case] classroom_id: Option<ClassroomId>,
        #[case] grade: Option<&str>,
        #[case] level: Option<&str>,
    ) {
        let selector = CohortSelector {
            classroom_id,
            grade: grade.map(str::to_string),
            level: level.map(str::to_string),
        };
        assert_eq!(selector.resolve(), Err(ValidationError::CohortRequired));
    }

    #[test]
    fn test_cohort_selector_ambiguous() {
        let selector = CohortSelector {
            classroom_id: Some(ClassroomId::new()),
            grade: Some("5".to_string()),
            level: Some("primary".to_string()),
        };
        assert_eq!(selector.resolve(), Err(ValidationError::AmbiguousCohort));
    }

    #[test]
    fn test_cohort_charge_stamps_pending_fee() {
        let charge = CohortCharge {
            tenant_id: TenantId::new(),
            fee_catalog_id: FeeCatalogId::new(),
            amount: dec!(1500),
            description: "Term 1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            created_by: ActorId::new(),
            created_at: Utc::now(),
        };
        let student = StudentId::new();
        let record = charge.charge(student);

        assert_eq!(record.student_id, student);
        assert_eq!(record.record_type, RecordType::Fee);
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.amount, dec!(1500));
        assert_eq!(record.fee_catalog_id, Some(charge.fee_catalog_id));
        assert_ne!(charge.charge(student).id, record.id);
    }

    #[test]
    fn test_date_range() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let range = DateRange::new(Some(d(10)), Some(d(20))).unwrap();
        assert!(range.contains(d(10)));
        assert!(range.contains(d(20)));
        assert!(!range.contains(d(21)));
        assert!(DateRange::default().contains(d(1)));
        assert!(matches!(
            DateRange::new(Some(d(20)), Some(d(10))),
            Err(ValidationError::InvertedDateRange { .. })
        ));
    }
}
