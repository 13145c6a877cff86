//! Audit trail types.
//!
//! Writes go through [`AuditDetails`], a closed set of shapes keyed by
//! action type plus a validated `Custom` escape hatch for callers outside
//! this crate. Entries are stored with their details as a JSON object and a
//! SHA-256 checksum over the canonical fields.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use bursar_shared::types::{ActorId, AuditEntryId, FeeCatalogId, StudentId, TenantId};

use crate::error::ValidationError;
use crate::fees::FeeCategory;
use crate::ledger::{Cohort, DateRange, RecordStatus, RecordType};
use crate::tenant::{Role, TenantContext};

/// Maximum length of an action type identifier.
pub const MAX_ACTION_TYPE_LEN: usize = 64;

/// The entity an audit entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Kind of entity, e.g. `"fee_catalog"`.
    pub entity_type: String,
    /// Its identifier.
    pub entity_id: Uuid,
}

impl EntityRef {
    /// Creates a reference to any entity.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<Uuid>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// A fee catalog entry.
    #[must_use]
    pub fn fee_catalog(id: FeeCatalogId) -> Self {
        Self::new("fee_catalog", id)
    }

    /// A ledger record.
    #[must_use]
    pub fn financial_record(id: bursar_shared::types::FinancialRecordId) -> Self {
        Self::new("financial_record", id)
    }
}

/// Details of a single recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionDetails {
    /// Amount recorded.
    pub amount: Decimal,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Student billed or credited.
    pub student_id: StudentId,
}

/// Details of a cohort billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignFeeDetails {
    /// The cohort filter as resolved.
    #[serde(flatten)]
    pub cohort: Cohort,
    /// Catalog entry billed.
    pub fee_catalog_id: FeeCatalogId,
    /// Number of records created.
    pub affected_students: u64,
}

/// Snapshot of a catalog entry at creation or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeCatalogDetails {
    /// Fee name.
    pub name: String,
    /// Fee amount.
    pub amount: Decimal,
    /// Fee category.
    pub category: FeeCategory,
}

/// A catalog rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameDetails {
    /// Previous name.
    pub from: String,
    /// New name.
    pub to: String,
}

/// A record status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChangeDetails {
    /// Previous status.
    pub from: RecordStatus,
    /// New status.
    pub to: RecordStatus,
}

/// Audit payload, one variant per action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditDetails {
    /// A payment or discount was recorded.
    RecordPayment(TransactionDetails),
    /// A single fee was recorded.
    CreateFee(TransactionDetails),
    /// A cohort was billed.
    AssignFee(AssignFeeDetails),
    /// A catalog entry was created.
    CreateFeeCatalog(FeeCatalogDetails),
    /// A catalog entry was renamed.
    RenameFeeCatalog(RenameDetails),
    /// A catalog entry was deleted.
    DeleteFeeCatalog(FeeCatalogDetails),
    /// A ledger record changed status.
    UpdateFinancialStatus(StatusChangeDetails),
    /// Action recorded by another subsystem. Fields must be scalars.
    Custom {
        /// snake_case action name, not one of the built-in ones.
        action_type: String,
        /// Flat map of scalar values.
        fields: Map<String, Value>,
    },
}

const RECORD_PAYMENT: &str = "record_payment";
const CREATE_FEE: &str = "create_fee";
const ASSIGN_FEE: &str = "assign_fee";
const CREATE_FEE_CATALOG: &str = "create_fee_catalog";
const RENAME_FEE_CATALOG: &str = "rename_fee_catalog";
const DELETE_FEE_CATALOG: &str = "delete_fee_catalog";
const UPDATE_FINANCIAL_STATUS: &str = "update_financial_status";

const BUILT_IN: &[&str] = &[
    RECORD_PAYMENT,
    CREATE_FEE,
    ASSIGN_FEE,
    CREATE_FEE_CATALOG,
    RENAME_FEE_CATALOG,
    DELETE_FEE_CATALOG,
    UPDATE_FINANCIAL_STATUS,
];

impl AuditDetails {
    /// Returns the action type stored with the entry.
    #[must_use]
    pub fn action_type(&self) -> &str {
        match self {
            Self::RecordPayment(_) => RECORD_PAYMENT,
            Self::CreateFee(_) => CREATE_FEE,
            Self::AssignFee(_) => ASSIGN_FEE,
            Self::CreateFeeCatalog(_) => CREATE_FEE_CATALOG,
            Self::RenameFeeCatalog(_) => RENAME_FEE_CATALOG,
            Self::DeleteFeeCatalog(_) => DELETE_FEE_CATALOG,
            Self::UpdateFinancialStatus(_) => UPDATE_FINANCIAL_STATUS,
            Self::Custom { action_type, .. } => action_type,
        }
    }

    /// Details for a recorded transaction; the action depends on the type.
    #[must_use]
    pub fn for_transaction(details: TransactionDetails) -> Self {
        match details.record_type {
            RecordType::Fee => Self::CreateFee(details),
            RecordType::Payment | RecordType::Discount => Self::RecordPayment(details),
        }
    }

    /// Checks a `Custom` payload. Built-in variants are valid by construction.
    ///
    /// # Errors
    ///
    /// `InvalidActionType` for a malformed or reserved name,
    /// `InvalidAuditDetails` for nested field values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Self::Custom {
            action_type,
            fields,
        } = self
        else {
            return Ok(());
        };

        if !is_snake_case(action_type) || BUILT_IN.contains(&action_type.as_str()) {
            return Err(ValidationError::InvalidActionType(action_type.clone()));
        }

        if let Some((key, _)) = fields
            .iter()
            .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            return Err(ValidationError::InvalidAuditDetails {
                action_type: action_type.clone(),
                reason: format!("field `{key}` must be a scalar"),
            });
        }
        Ok(())
    }

    /// Serializes the payload to the stored JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let value = match self {
            Self::RecordPayment(d) | Self::CreateFee(d) => serde_json::to_value(d),
            Self::AssignFee(d) => serde_json::to_value(d),
            Self::CreateFeeCatalog(d) | Self::DeleteFeeCatalog(d) => serde_json::to_value(d),
            Self::RenameFeeCatalog(d) => serde_json::to_value(d),
            Self::UpdateFinancialStatus(d) => serde_json::to_value(d),
            Self::Custom { fields, .. } => Ok(Value::Object(fields.clone())),
        };
        // Plain structs of strings, decimals and ids always serialize.
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Rebuilds typed details from a stored action type and JSON object.
    ///
    /// # Errors
    ///
    /// `InvalidAuditDetails` when the JSON does not match the action's shape,
    /// plus anything [`AuditDetails::validate`] rejects for custom actions.
    pub fn from_parts(action_type: &str, details: Value) -> Result<Self, ValidationError> {
        let invalid = |e: serde_json::Error| ValidationError::InvalidAuditDetails {
            action_type: action_type.to_string(),
            reason: e.to_string(),
        };

        let parsed = match action_type {
            RECORD_PAYMENT => Self::RecordPayment(serde_json::from_value(details).map_err(invalid)?),
            CREATE_FEE => Self::CreateFee(serde_json::from_value(details).map_err(invalid)?),
            ASSIGN_FEE => Self::AssignFee(serde_json::from_value(details).map_err(invalid)?),
            CREATE_FEE_CATALOG => {
                Self::CreateFeeCatalog(serde_json::from_value(details).map_err(invalid)?)
            }
            RENAME_FEE_CATALOG => {
                Self::RenameFeeCatalog(serde_json::from_value(details).map_err(invalid)?)
            }
            DELETE_FEE_CATALOG => {
                Self::DeleteFeeCatalog(serde_json::from_value(details).map_err(invalid)?)
            }
            UPDATE_FINANCIAL_STATUS => {
                Self::UpdateFinancialStatus(serde_json::from_value(details).map_err(invalid)?)
            }
            other => {
                let Value::Object(fields) = details else {
                    return Err(ValidationError::InvalidAuditDetails {
                        action_type: other.to_string(),
                        reason: "details must be a JSON object".to_string(),
                    });
                };
                let custom = Self::Custom {
                    action_type: other.to_string(),
                    fields,
                };
                custom.validate()?;
                custom
            }
        };
        Ok(parsed)
    }
}

fn is_snake_case(s: &str) -> bool {
    let mut chars = s.chars();
    s.len() <= MAX_ACTION_TYPE_LEN
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: AuditEntryId,
    /// Tenant the action happened in.
    pub tenant_id: TenantId,
    /// Who acted.
    pub actor_id: ActorId,
    /// The actor's role at the time.
    pub actor_role: Role,
    /// snake_case action name.
    pub action_type: String,
    /// Kind of entity touched.
    pub entity_type: String,
    /// Entity touched.
    pub entity_id: Uuid,
    /// Action-specific JSON object.
    pub details: Value,
    /// Hex SHA-256 over the canonical fields.
    pub checksum: String,
    /// When it happened, truncated to microseconds.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds a sealed entry for `details` performed under `ctx`.
    #[must_use]
    pub fn new(ctx: &TenantContext, entity: EntityRef, details: &AuditDetails) -> Self {
        let mut entry = Self {
            id: AuditEntryId::new(),
            tenant_id: ctx.tenant_id,
            actor_id: ctx.actor_id,
            actor_role: ctx.role,
            action_type: details.action_type().to_string(),
            entity_type: entity.entity_type,
            entity_id: entity.entity_id,
            details: details.to_json(),
            checksum: String::new(),
            // Postgres timestamps keep microseconds.
            created_at: Utc::now().trunc_subsecs(6),
        };
        entry.checksum = entry.compute_checksum();
        entry
    }

    /// Recomputes the checksum from the stored fields.
    #[must_use]
    pub fn compute_checksum(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.tenant_id,
            self.actor_id,
            self.actor_role,
            self.action_type,
            self.entity_type,
            self.entity_id,
            self.details,
            self.created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns true if the entry has not been altered since it was sealed.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Parses the stored details back into their typed form.
    ///
    /// # Errors
    ///
    /// See [`AuditDetails::from_parts`].
    pub fn typed_details(&self) -> Result<AuditDetails, ValidationError> {
        AuditDetails::from_parts(&self.action_type, self.details.clone())
    }
}

/// Caller-facing audit query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    /// Tenant to read. Only admins may name a tenant other than their own,
    /// or none at all.
    pub tenant_id: Option<TenantId>,
    /// Only entries made by actors in this role.
    pub role: Option<Role>,
    /// Only this action.
    pub action_type: Option<String>,
    /// Only this kind of entity.
    pub entity_type: Option<String>,
    /// Only entries created on these days (UTC).
    #[serde(default)]
    pub date_range: DateRange,
    /// Maximum number of entries.
    pub limit: Option<u32>,
}

/// Resolved store-level filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    /// `None` reads every tenant.
    pub tenant_id: Option<TenantId>,
    /// Actor role.
    pub role: Option<Role>,
    /// Action type.
    pub action_type: Option<String>,
    /// Entity type.
    pub entity_type: Option<String>,
    /// Creation day range.
    pub date_range: DateRange,
    /// Maximum number of entries, newest first.
    pub limit: usize,
}

impl AuditFilter {
    /// Returns true if `entry` passes every filter except the limit.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.tenant_id.is_none_or(|t| entry.tenant_id == t)
            && self.role.is_none_or(|r| entry.actor_role == r)
            && self
                .action_type
                .as_deref()
                .is_none_or(|a| entry.action_type == a)
            && self
                .entity_type
                .as_deref()
                .is_none_or(|e| entry.entity_type == e)
            && self.date_range.contains(entry.created_at.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_shared::types::ClassroomId;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ctx() -> TenantContext {
        TenantContext::new(TenantId::new(), ActorId::new(), Role::Secretary)
    }

    #[test]
    fn test_transaction_action_depends_on_type() {
        let details = |record_type| TransactionDetails {
            amount: dec!(10),
            record_type,
            student_id: StudentId::new(),
        };
        assert_eq!(
            AuditDetails::for_transaction(details(RecordType::Fee)).action_type(),
            "create_fee"
        );
        assert_eq!(
            AuditDetails::for_transaction(details(RecordType::Payment)).action_type(),
            "record_payment"
        );
        assert_eq!(
            AuditDetails::for_transaction(details(RecordType::Discount)).action_type(),
            "record_payment"
        );
    }

    #[test]
    fn test_assign_fee_json_shape() {
        let classroom_id = ClassroomId::new();
        let fee_catalog_id = FeeCatalogId::new();
        let details = AuditDetails::AssignFee(AssignFeeDetails {
            cohort: Cohort::Classroom { classroom_id },
            fee_catalog_id,
            affected_students: 2,
        });

        let value = details.to_json();
        assert_eq!(
            value,
            json!({
                "classroom_id": classroom_id.to_string(),
                "fee_catalog_id": fee_catalog_id.to_string(),
                "affected_students": 2,
            })
        );
        assert_eq!(AuditDetails::from_parts("assign_fee", value).unwrap(), details);
    }

    #[test]
    fn test_from_parts_rejects_wrong_shape() {
        let err = AuditDetails::from_parts("update_financial_status", json!({"from": "pending"}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAuditDetails { .. }));

        let err = AuditDetails::from_parts(
            "rename_fee_catalog",
            json!({"from": "a", "to": "b", "extra": true}),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAuditDetails { .. }));
    }

    #[test]
    fn test_custom_details_validation() {
        let custom = |action: &str, fields: Value| AuditDetails::Custom {
            action_type: action.to_string(),
            fields: fields.as_object().cloned().unwrap(),
        };

        assert!(custom("upload_video", json!({"size": 12, "title": "Lesson 1"}))
            .validate()
            .is_ok());
        assert!(matches!(
            custom("Upload-Video", json!({})).validate(),
            Err(ValidationError::InvalidActionType(_))
        ));
        assert!(matches!(
            custom("create_fee", json!({})).validate(),
            Err(ValidationError::InvalidActionType(_))
        ));
        assert!(matches!(
            custom("upload_video", json!({"tags": ["a"]})).validate(),
            Err(ValidationError::InvalidAuditDetails { .. })
        ));
        assert!(matches!(
            AuditDetails::from_parts("upload_video", json!([1, 2])),
            Err(ValidationError::InvalidAuditDetails { .. })
        ));
    }

    #[test]
    fn test_checksum_detects_tampering() {
        let details = AuditDetails::RenameFeeCatalog(RenameDetails {
            from: "Bus".to_string(),
            to: "Bus pass".to_string(),
        });
        let mut entry = AuditEntry::new(&ctx(), EntityRef::fee_catalog(FeeCatalogId::new()), &details);

        assert_eq!(entry.checksum.len(), 64);
        assert!(entry.verify());

        entry.details = json!({"from": "Bus", "to": "Limousine"});
        assert!(!entry.verify());
    }

    #[test]
    fn test_entry_carries_context() {
        let ctx = ctx();
        let details = AuditDetails::UpdateFinancialStatus(StatusChangeDetails {
            from: RecordStatus::Pending,
            to: RecordStatus::Completed,
        });
        let entry = AuditEntry::new(
            &ctx,
            EntityRef::financial_record(bursar_shared::types::FinancialRecordId::new()),
            &details,
        );

        assert_eq!(entry.tenant_id, ctx.tenant_id);
        assert_eq!(entry.actor_role, Role::Secretary);
        assert_eq!(entry.entity_type, "financial_record");
        assert_eq!(entry.details, json!({"from": "pending", "to": "completed"}));
        assert_eq!(entry.typed_details().unwrap(), details);
    }
}
