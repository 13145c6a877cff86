//! Field rules for ledger input.

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Maximum invoice number length in characters.
pub const MAX_INVOICE_NUMBER_LEN: usize = 64;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Decimal places kept by the `NUMERIC(19, 4)` amount columns.
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Exclusive upper bound of a `NUMERIC(19, 4)` amount (15 integer digits).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Checks that an amount is strictly positive and fits the stored precision.
///
/// Trailing zeros do not count against the scale, so `10.50000` passes.
///
/// # Errors
///
/// `NonPositiveAmount` for zero or negative amounts, `TooManyDecimals` past
/// [`MAX_AMOUNT_SCALE`] places, `AmountTooLarge` at or above [`MAX_AMOUNT`].
pub fn validate_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(ValidationError::TooManyDecimals {
            max: MAX_AMOUNT_SCALE,
        });
    }
    if amount >= MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge { max: MAX_AMOUNT });
    }
    Ok(amount)
}

/// Normalizes an optional invoice number.
///
/// # Errors
///
/// `Blank` when given but empty, `TooLong` above [`MAX_INVOICE_NUMBER_LEN`].
pub fn validate_invoice_number(invoice: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(invoice) = invoice else {
        return Ok(None);
    };
    let trimmed = invoice.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank("invoice_number"));
    }
    if trimmed.chars().count() > MAX_INVOICE_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_number",
            max: MAX_INVOICE_NUMBER_LEN,
        });
    }
    Ok(Some(trimmed.to_string()))
}

/// Trims a description and enforces its length.
///
/// # Errors
///
/// `TooLong` above [`MAX_DESCRIPTION_LEN`].
pub fn validate_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(trimmed.to_string())
}
