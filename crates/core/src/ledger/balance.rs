//! Student balance aggregation.
//!
//! `balance = fees_total - payments_total - discounts_total`, each total
//! taken over non-cancelled records only. The full scan in
//! [`BalanceSummary::from_records`] is authoritative; the incremental
//! methods exist so a cache can follow writes and be checked against it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{FinancialRecord, RecordStatus, RecordType};

/// Per-student ledger totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Sum of non-cancelled fees.
    pub fees_total: Decimal,
    /// Sum of non-cancelled payments.
    pub payments_total: Decimal,
    /// Sum of non-cancelled discounts.
    pub discounts_total: Decimal,
    /// Amount still owed; negative means credit in the student's favour.
    pub balance: Decimal,
}

impl BalanceSummary {
    /// Aggregates a student's records from scratch.
    #[must_use]
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FinancialRecord>,
    {
        let mut summary = Self::default();
        for record in records {
            summary.apply_record(record);
        }
        summary
    }

    /// Folds one newly created record into the totals.
    pub fn apply_record(&mut self, record: &FinancialRecord) {
        if record.status.counts_toward_balance() {
            self.add(record.record_type, record.amount);
        }
    }

    /// Adjusts the totals for a record moving from `from` to `to`.
    pub fn apply_status_change(
        &mut self,
        record_type: RecordType,
        amount: Decimal,
        from: RecordStatus,
        to: RecordStatus,
    ) {
        match (from.counts_toward_balance(), to.counts_toward_balance()) {
            (true, false) => self.add(record_type, -amount),
            (false, true) => self.add(record_type, amount),
            _ => {}
        }
    }

    fn add(&mut self, record_type: RecordType, amount: Decimal) {
        match record_type {
            RecordType::Fee => self.fees_total += amount,
            RecordType::Payment => self.payments_total += amount,
            RecordType::Discount => self.discounts_total += amount,
        }
        self.balance = self.fees_total - self.payments_total - self.discounts_total;
    }
}
