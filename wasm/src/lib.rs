//! WebAssembly module for the Bodega inventory front end
//!
//! Lets the browser preview stock arithmetic before a movement is submitted:
//! - Alert level classification
//! - Available quantity
//! - Movement quantity validation
//! - Projected stock after an entry or exit
//!
//! Decimals cross the boundary as strings so no precision is lost.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Invalid {}: '{}'", field, raw))
}

fn alert_level_of(available: &str, minimum: &str) -> Result<AlertLevel, String> {
    let available = parse_decimal("available quantity", available)?;
    let minimum = parse_decimal("minimum quantity", minimum)?;
    Ok(AlertLevel::classify(available, minimum))
}

fn available_of(quantity: &str, reserved: &str) -> Result<Decimal, String> {
    parse_decimal("quantity", quantity)?
        .checked_sub(parse_decimal("reserved quantity", reserved)?)
        .ok_or_else(|| "Available quantity is out of range".to_string())
}

fn projection(quantity: &str, movement_type: &str, moved: &str) -> Result<Decimal, String> {
    let movement_type = MovementType::from_str(movement_type)?;
    let moved = parse_decimal("movement quantity", moved)?;

    let mut stock = Stock {
        id: Uuid::nil(),
        product_id: Uuid::nil(),
        warehouse_id: Uuid::nil(),
        quantity: parse_decimal("quantity", quantity)?,
        minimum_quantity: Decimal::ZERO,
        reserved_quantity: Decimal::ZERO,
        last_entry_at: None,
        last_exit_at: None,
        updated_at: DateTime::<Utc>::default(),
    };
    stock
        .apply(movement_type, moved, DateTime::<Utc>::default())
        .map_err(|e| e.to_string())?;
    Ok(stock.quantity)
}

/// Alert level ("SIN_STOCK", "CRITICO", "BAJO" or "NORMAL") for an available
/// quantity against a minimum
#[wasm_bindgen]
pub fn alert_level(available: &str, minimum: &str) -> Result<String, JsValue> {
    alert_level_of(available, minimum)
        .map(|level| level.to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Quantity on hand minus reserved quantity
#[wasm_bindgen]
pub fn available_quantity(quantity: &str, reserved: &str) -> Result<String, JsValue> {
    available_of(quantity, reserved)
        .map(|d| d.to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// True when the value is accepted as an entry or exit quantity
#[wasm_bindgen]
pub fn validate_movement_quantity(quantity: &str) -> bool {
    Decimal::from_str(quantity.trim())
        .map(|q| validate_quantity(q).is_ok())
        .unwrap_or(false)
}

/// Quantity left after applying a movement, or an error when the movement
/// would take the stock below zero
#[wasm_bindgen]
pub fn projected_quantity(
    quantity: &str,
    movement_type: &str,
    moved: &str,
) -> Result<String, JsValue> {
    projection(quantity, movement_type, moved)
        .map(|d| d.to_string())
        .map_err(|e| JsValue::from_str(&e))
}
