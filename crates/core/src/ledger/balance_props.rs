//! Property-based tests for balance aggregation.
//!
//! - Property 1: balance = fees - payments - discounts over non-cancelled rows
//! - Property 2: incremental updates agree with a full scan

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use bursar_shared::types::{ActorId, FinancialRecordId, StudentId, TenantId};

use super::balance::BalanceSummary;
use super::types::{FinancialRecord, RecordStatus, RecordType};

/// Strategy to generate positive amounts (0.01 to 100,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn record_type() -> impl Strategy<Value = RecordType> {
    prop_oneof![
        Just(RecordType::Fee),
        Just(RecordType::Payment),
        Just(RecordType::Discount),
    ]
}

fn status() -> impl Strategy<Value = RecordStatus> {
    prop_oneof![
        Just(RecordStatus::Completed),
        Just(RecordStatus::Pending),
        Just(RecordStatus::Overdue),
        Just(RecordStatus::Cancelled),
    ]
}

fn make_record(record_type: RecordType, amount: Decimal, status: RecordStatus) -> FinancialRecord {
    let now = Utc::now();
    FinancialRecord {
        id: FinancialRecordId::new(),
        tenant_id: TenantId::new(),
        student_id: StudentId::new(),
        fee_catalog_id: None,
        record_type,
        amount,
        description: String::new(),
        status,
        date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
        invoice_number: None,
        created_by: ActorId::new(),
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: the full scan matches the textbook formula.
    #[test]
    fn prop_balance_formula(
        rows in prop::collection::vec((record_type(), positive_amount(), status()), 0..40),
    ) {
        let records: Vec<_> = rows
            .iter()
            .map(|(t, a, s)| make_record(*t, *a, *s))
            .collect();
        let summary = BalanceSummary::from_records(&records);

        let total = |wanted: RecordType| -> Decimal {
            records
                .iter()
                .filter(|r| r.record_type == wanted && r.status != RecordStatus::Cancelled)
                .map(|r| r.amount)
                .sum()
        };

        prop_assert_eq!(summary.fees_total, total(RecordType::Fee));
        prop_assert_eq!(summary.payments_total, total(RecordType::Payment));
        prop_assert_eq!(summary.discounts_total, total(RecordType::Discount));
        prop_assert_eq!(
            summary.balance,
            summary.fees_total - summary.payments_total - summary.discounts_total
        );
    }

    /// Property 2: following creations and allowed transitions incrementally
    /// ends where a fresh scan of the final rows does.
    #[test]
    fn prop_incremental_matches_scan(
        rows in prop::collection::vec((record_type(), positive_amount(), status()), 1..30),
        moves in prop::collection::vec((any::<prop::sample::Index>(), status()), 0..30),
    ) {
        let mut records = Vec::new();
        let mut incremental = BalanceSummary::default();
        for (t, a, s) in &rows {
            let record = make_record(*t, *a, *s);
            incremental.apply_record(&record);
            records.push(record);
        }

        for (index, to) in moves {
            let record = index.get_mut(&mut records);
            if record.status != to && record.status.can_transition_to(to) {
                incremental.apply_status_change(record.record_type, record.amount, record.status, to);
                record.status = to;
            }
        }

        prop_assert_eq!(incremental, BalanceSummary::from_records(&records));
    }
}
