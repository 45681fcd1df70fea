//! Validation utilities for the Bodega inventory platform
//!
//! Business checks shared by the backend services and the WASM helpers. Each
//! returns a short English reason; callers attach the field name and the
//! Spanish message.

use rust_decimal::Decimal;

/// Maximum length of a movement's external reference code
pub const MAX_REFERENCE_LEN: usize = 50;

/// Maximum length of a movement note
pub const MAX_NOTE_LEN: usize = 500;

/// Integer digits an amount column (`NUMERIC(18, 2)`) can hold
pub const MAX_INTEGER_DIGITS: u32 = 16;

/// Decimal places an amount column keeps
pub const MAX_DECIMAL_PLACES: u32 = 2;

// ============================================================================
// Amount Validations
// ============================================================================

/// Smallest magnitude that no longer fits in `MAX_INTEGER_DIGITS` integer digits
pub fn amount_ceiling() -> Decimal {
    Decimal::new(10_i64.pow(MAX_INTEGER_DIGITS), 0)
}

pub fn within_amount_range(value: Decimal) -> bool {
    value.abs() < amount_ceiling()
}

/// Validate that an amount is stored without rounding: at most 16 integer
/// digits and 2 decimal places
pub fn validate_precision(value: Decimal) -> Result<(), &'static str> {
    if value.normalize().scale() > MAX_DECIMAL_PLACES {
        return Err("Amount must have at most 2 decimal places");
    }
    if !within_amount_range(value) {
        return Err("Amount must have at most 16 integer digits");
    }
    Ok(())
}

// ============================================================================
// Movement Validations
// ============================================================================

/// Validate that a movement quantity is strictly positive and storable
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    validate_precision(quantity)
}

/// Validate an optional unit price (zero is allowed, negative is not)
pub fn validate_unit_price(price: Option<Decimal>) -> Result<(), &'static str> {
    match price {
        Some(p) if p < Decimal::ZERO => Err("Unit price cannot be negative"),
        Some(p) => validate_precision(p),
        None => Ok(()),
    }
}

/// Validate an optional external reference code
pub fn validate_reference(reference: Option<&str>) -> Result<(), &'static str> {
    match reference {
        Some(r) if r.chars().count() > MAX_REFERENCE_LEN => {
            Err("Reference must be at most 50 characters")
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Warehouse Validations
// ============================================================================

/// Validate an optional warehouse capacity in cubic meters
pub fn validate_capacity(capacity: Option<Decimal>) -> Result<(), &'static str> {
    match capacity {
        Some(c) if c < Decimal::ZERO => Err("Capacity cannot be negative"),
        Some(c) => validate_precision(c),
        None => Ok(()),
    }
}

/// Validate a phone number: digits with optional `+`, spaces, dashes and
/// parentheses, between 7 and 20 characters
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let phone = phone.trim();
    if phone.len() < 7 || phone.len() > 20 {
        return Err("Phone number must be between 7 and 20 characters");
    }

    let allowed = phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0));
    if !allowed {
        return Err("Phone number contains invalid characters");
    }

    if phone.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
        return Err("Phone number must contain at least 7 digits");
    }

    Ok(())
}

/// Trim optional text, mapping blank strings to `None`
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
