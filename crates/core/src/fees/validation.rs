//! Input validation for catalog entries.

use super::types::CreateFeeInput;
use crate::error::ValidationError;
use crate::ledger::validation::validate_amount;

/// Maximum fee name length in characters.
pub const MAX_NAME_LEN: usize = 120;

/// Validates and normalizes a fee name.
///
/// # Errors
///
/// `Blank` for an empty name, `TooLong` above [`MAX_NAME_LEN`].
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank("name"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name",
            max: MAX_NAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Validates a create request.
///
/// # Errors
///
/// Returns the first failing rule: amount, then name, then applicability.
pub fn validate_create(input: &CreateFeeInput) -> Result<(), ValidationError> {
    validate_amount(input.amount)?;
    validate_name(&input.name)?;
    if !input.applicability.is_specified() {
        return Err(ValidationError::ApplicabilityRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::types::{Applicability, FeeCategory};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn input(name: &str, amount: Decimal, level: Option<&str>) -> CreateFeeInput {
        CreateFeeInput {
            name: name.to_string(),
            amount,
            category: FeeCategory::Tuition,
            applicability: Applicability {
                level: level.map(str::to_string),
                ..Applicability::default()
            },
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_create(&input("Term 1", dec!(1500), Some("primary"))).is_ok());
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-10))]
    fn test_non_positive_amount(#[case] amount: Decimal) {
        assert_eq!(
            validate_create(&input("Term 1", amount, Some("primary"))),
            Err(ValidationError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_amount_must_fit_stored_precision() {
        assert_eq!(
            validate_create(&input("Term 1", dec!(1500.00005), Some("primary"))),
            Err(ValidationError::TooManyDecimals { max: 4 })
        );
        assert!(matches!(
            validate_create(&input("Term 1", dec!(5000000000000000), Some("primary"))),
            Err(ValidationError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn test_applicability_required() {
        assert_eq!(
            validate_create(&input("Term 1", dec!(100), None)),
            Err(ValidationError::ApplicabilityRequired)
        );
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(validate_name("  Bus  ").unwrap(), "Bus");
        assert_eq!(validate_name(" "), Err(ValidationError::Blank("name")));
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(matches!(
            validate_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(ValidationError::TooLong { field: "name", .. })
        ));
    }
}
