//! Property-based tests for LedgerService.
//!
//! - Property 3: after any interleaving of writes, the cached hint equals the
//!   full-scan balance
//! - Property 4: a failed cohort commit changes no balance

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use bursar_shared::types::{ActorId, ClassroomId, StudentId, TenantId};

use super::service::LedgerService;
use super::types::{
    AssignCohortInput, CohortSelector, RecordStatus, RecordTransactionInput, RecordType,
    TransactionFilter,
};
use crate::audit::AuditLog;
use crate::fees::{Applicability, CreateFeeInput, FeeCatalogService, FeeCategory};
use crate::store::{InMemoryStore, Student};
use crate::tenant::{Role, TenantContext};

#[derive(Debug, Clone)]
enum Op {
    Record {
        student: usize,
        record_type: RecordType,
        amount: Decimal,
        status: RecordStatus,
    },
    AssignCohort,
    ChangeStatus {
        pick: prop::sample::Index,
        to: RecordStatus,
    },
}

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn status() -> impl Strategy<Value = RecordStatus> {
    prop_oneof![
        Just(RecordStatus::Completed),
        Just(RecordStatus::Pending),
        Just(RecordStatus::Overdue),
        Just(RecordStatus::Cancelled),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (
            0usize..3,
            prop_oneof![
                Just(RecordType::Fee),
                Just(RecordType::Payment),
                Just(RecordType::Discount)
            ],
            positive_amount(),
            status(),
        )
            .prop_map(|(student, record_type, amount, status)| Op::Record {
                student,
                record_type,
                amount,
                status,
            }),
        1 => Just(Op::AssignCohort),
        2 => (any::<prop::sample::Index>(), status())
            .prop_map(|(pick, to)| Op::ChangeStatus { pick, to }),
    ]
}

struct World {
    store: Arc<InMemoryStore>,
    ledger: LedgerService,
    ctx: TenantContext,
    students: Vec<StudentId>,
    classroom: ClassroomId,
    fee: bursar_shared::types::FeeCatalogId,
}

async fn world() -> World {
    let store = Arc::new(InMemoryStore::new());
    let audit = AuditLog::new(store.clone());
    let fees = FeeCatalogService::new(store.clone(), store.clone(), audit.clone());
    let ledger = LedgerService::new(store.clone(), store.clone(), store.clone(), audit);
    let ctx = TenantContext::new(TenantId::new(), ActorId::new(), Role::Secretary);
    let classroom = ClassroomId::new();

    let mut students = Vec::new();
    for _ in 0..3 {
        let id = StudentId::new();
        store
            .add_student(Student {
                id,
                tenant_id: ctx.tenant_id,
                classroom_id: Some(classroom),
                grade: None,
                level: None,
            })
            .await;
        students.push(id);
    }

    let fee = fees
        .create(
            &ctx,
            CreateFeeInput {
                name: "Term fee".to_string(),
                amount: Decimal::new(150_000, 2),
                category: FeeCategory::Tuition,
                applicability: Applicability {
                    classroom_id: Some(classroom),
                    ..Applicability::default()
                },
            },
        )
        .await
        .expect("fee catalog entry")
        .id;

    World {
        store,
        ledger,
        ctx,
        students,
        classroom,
        fee,
    }
}

async fn apply(w: &World, op: Op) {
    match op {
        Op::Record {
            student,
            record_type,
            amount,
            status,
        } => {
            let _ = w
                .ledger
                .record_transaction(
                    &w.ctx,
                    RecordTransactionInput {
                        student_id: w.students[student],
                        record_type,
                        amount: Some(amount),
                        description: String::new(),
                        status,
                        date: None,
                        fee_catalog_id: None,
                        invoice_number: None,
                    },
                )
                .await;
        }
        Op::AssignCohort => {
            let _ = w
                .ledger
                .assign_to_cohort(
                    &w.ctx,
                    AssignCohortInput {
                        fee_catalog_id: w.fee,
                        cohort: CohortSelector {
                            classroom_id: Some(w.classroom),
                            ..CohortSelector::default()
                        },
                        description: None,
                        date: None,
                    },
                )
                .await;
        }
        Op::ChangeStatus { pick, to } => {
            let records = w
                .ledger
                .list_transactions(&w.ctx, &TransactionFilter::default())
                .await
                .unwrap_or_default();
            if !records.is_empty() {
                let record = pick.get(&records);
                // Disallowed transitions are rejected and change nothing.
                let _ = w.ledger.update_status(&w.ctx, record.id, to).await;
            }
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property 3: cache hints never drift from the ledger when every write
    /// goes through the service.
    #[test]
    fn prop_cache_tracks_full_scan(ops in prop::collection::vec(op(), 0..40)) {
        runtime().block_on(async {
            let w = world().await;
            for student in &w.students {
                w.ledger.compute_balance(&w.ctx, *student).await.unwrap();
            }

            for op in ops {
                apply(&w, op).await;
            }

            for student in &w.students {
                let hint = w.ledger.cached_balance(&w.ctx, *student).await.unwrap();
                let drift = w.ledger.reconcile(&w.ctx, *student).await.unwrap();
                prop_assert!(drift.is_none(), "drift for {}: {:?}", student, drift);
                let actual = w.ledger.compute_balance(&w.ctx, *student).await.unwrap();
                prop_assert_eq!(hint, Some(actual));
            }
            Ok(())
        })?;
    }

    /// Property 4: a cohort assignment that fails before commit leaves every
    /// balance where it was.
    #[test]
    fn prop_failed_cohort_commit_changes_nothing(ops in prop::collection::vec(op(), 0..20)) {
        runtime().block_on(async {
            let w = world().await;
            for op in ops {
                apply(&w, op).await;
            }

            let mut before = Vec::new();
            for student in &w.students {
                before.push(w.ledger.compute_balance(&w.ctx, *student).await.unwrap());
            }

            w.store.fail_next_cohort_commit();
            apply(&w, Op::AssignCohort).await;

            for (student, expected) in w.students.iter().zip(before) {
                let after = w.ledger.compute_balance(&w.ctx, *student).await.unwrap();
                prop_assert_eq!(after, expected);
            }
            Ok(())
        })?;
    }
}
