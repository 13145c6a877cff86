//! Fee catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bursar_shared::types::{ActorId, ClassroomId, FeeCatalogId, TenantId};

/// What a fee is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeCategory {
    /// Tuition.
    Tuition,
    /// School bus.
    Bus,
    /// Books and materials.
    Books,
    /// Uniforms.
    Uniform,
    /// Trips, clubs and other activities.
    Activity,
    /// Anything else.
    Other,
}

impl FeeCategory {
    /// Returns the storage/wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tuition => "tuition",
            Self::Bus => "bus",
            Self::Books => "books",
            Self::Uniform => "uniform",
            Self::Activity => "activity",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tuition" => Ok(Self::Tuition),
            "bus" => Ok(Self::Bus),
            "books" => Ok(Self::Books),
            "uniform" => Ok(Self::Uniform),
            "activity" => Ok(Self::Activity),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown fee category: {s}")),
        }
    }
}

/// Which students a fee is meant for. Informational; billing goes through
/// an explicit cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    /// School level, e.g. `"primary"`.
    pub level: Option<String>,
    /// Grade within the level.
    pub grade: Option<String>,
    /// A single classroom.
    pub classroom_id: Option<ClassroomId>,
}

impl Applicability {
    /// Returns true if a level or classroom is named.
    #[must_use]
    pub fn is_specified(&self) -> bool {
        self.classroom_id.is_some()
            || self.level.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// A reusable priced fee template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCatalogEntry {
    /// Entry ID.
    pub id: FeeCatalogId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name; the only field that may change.
    pub name: String,
    /// Price, strictly positive.
    pub amount: Decimal,
    /// Category.
    pub category: FeeCategory,
    /// Intended audience.
    pub applicability: Applicability,
    /// Creator.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last rename timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeeInput {
    /// Display name.
    pub name: String,
    /// Price.
    pub amount: Decimal,
    /// Category.
    pub category: FeeCategory,
    /// Intended audience.
    #[serde(default)]
    pub applicability: Applicability,
}

/// Catalog listing filters. The tenant always comes from the context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeFilter {
    /// Only this category.
    pub category: Option<FeeCategory>,
    /// Only entries for this level.
    pub level: Option<String>,
    /// Only entries for this grade.
    pub grade: Option<String>,
    /// Only entries for this classroom.
    pub classroom_id: Option<ClassroomId>,
    /// Case-insensitive name substring.
    pub name: Option<String>,
}

impl FeeFilter {
    /// Returns true if `entry` passes every filter.
    #[must_use]
    pub fn matches(&self, entry: &FeeCatalogEntry) -> bool {
        let applies = &entry.applicability;
        self.category.is_none_or(|c| entry.category == c)
            && self
                .level
                .as_deref()
                .is_none_or(|l| applies.level.as_deref() == Some(l))
            && self
                .grade
                .as_deref()
                .is_none_or(|g| applies.grade.as_deref() == Some(g))
            && self.classroom_id.is_none_or(|c| applies.classroom_id == Some(c))
            && self.name.as_deref().is_none_or(|needle| {
                entry.name.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}
