//! Stock levels per (product, warehouse) and their alert classification

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{MovementType, StockDirection};
use crate::types::{contains_ignore_case, normalize_search_term, PageRequest};
use crate::validation::within_amount_range;

/// Errors raised by the stock arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Insufficient stock: available {available}, requested {requested}")]
    Insufficient { available: Decimal, requested: Decimal },

    #[error("Invalid quantity {quantity} for a {movement_type} movement")]
    InvalidQuantity {
        movement_type: MovementType,
        quantity: Decimal,
    },

    #[error("Stock of {current} cannot take {quantity} more units")]
    Overflow { current: Decimal, quantity: Decimal },
}

/// Check that `quantity` is a usable magnitude for `movement_type`.
///
/// Entrada, Salida and Transferencia take a strictly positive quantity. Ajuste
/// carries a signed correction and only rejects zero.
pub fn check_adjustment(movement_type: MovementType, quantity: Decimal) -> Result<(), StockError> {
    let valid = match movement_type {
        MovementType::Ajuste => !quantity.is_zero(),
        MovementType::Entrada | MovementType::Salida | MovementType::Transferencia => {
            quantity > Decimal::ZERO
        }
    };

    if valid {
        Ok(())
    } else {
        Err(StockError::InvalidQuantity {
            movement_type,
            quantity,
        })
    }
}

/// Quantity bookkeeping for one product in one warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Never negative
    pub quantity: Decimal,
    pub minimum_quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub last_entry_at: Option<DateTime<Utc>>,
    pub last_exit_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// A zero-quantity row for a pair that has never been stocked
    pub fn empty(
        product_id: Uuid,
        warehouse_id: Uuid,
        minimum_quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            warehouse_id,
            quantity: Decimal::ZERO,
            minimum_quantity,
            reserved_quantity: Decimal::ZERO,
            last_entry_at: None,
            last_exit_at: None,
            updated_at: now,
        }
    }

    /// Quantity not held by reservations (current - reserved)
    pub fn available(&self) -> Decimal {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    pub fn alert_level(&self) -> AlertLevel {
        AlertLevel::classify(self.available(), self.minimum_quantity)
    }

    /// Apply a movement of `quantity` units of `movement_type`.
    ///
    /// On error the row is left untouched.
    pub fn apply(
        &mut self,
        movement_type: MovementType,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), StockError> {
        check_adjustment(movement_type, quantity)?;

        match movement_type.direction() {
            StockDirection::Increase => {
                let next = self
                    .quantity
                    .checked_add(quantity)
                    .filter(|next| within_amount_range(*next))
                    .ok_or(StockError::Overflow {
                        current: self.quantity,
                        quantity,
                    })?;
                if next < Decimal::ZERO {
                    return Err(StockError::Insufficient {
                        available: self.quantity,
                        requested: -quantity,
                    });
                }
                self.quantity = next;
                self.last_entry_at = Some(now);
            }
            StockDirection::Decrease => {
                if self.quantity < quantity {
                    return Err(StockError::Insufficient {
                        available: self.quantity,
                        requested: quantity,
                    });
                }
                self.quantity -= quantity;
                self.last_exit_at = Some(now);
            }
        }

        self.updated_at = now;
        Ok(())
    }
}

/// Urgency of a stock row ("nivel de alerta")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    SinStock,
    Critico,
    Bajo,
    Normal,
}

impl AlertLevel {
    /// Classify an available quantity against the configured minimum.
    ///
    /// SIN_STOCK when nothing is available, CRITICO up to the minimum, BAJO up
    /// to one and a half times the minimum, NORMAL above that.
    pub fn classify(available: Decimal, minimum: Decimal) -> Self {
        // A minimum too large to scale has its ceiling above any representable quantity
        let low_ceiling = minimum.checked_mul(Decimal::new(15, 1));

        if available <= Decimal::ZERO {
            AlertLevel::SinStock
        } else if available <= minimum {
            AlertLevel::Critico
        } else if low_ceiling.map_or(true, |ceiling| available <= ceiling) {
            AlertLevel::Bajo
        } else {
            AlertLevel::Normal
        }
    }

    /// Sort rank, most urgent first
    pub fn urgency(&self) -> u8 {
        match self {
            AlertLevel::SinStock => 1,
            AlertLevel::Critico => 2,
            AlertLevel::Bajo => 3,
            AlertLevel::Normal => 4,
        }
    }

    /// True for every level that warrants attention
    pub fn is_alert(&self) -> bool {
        !matches!(self, AlertLevel::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::SinStock => "SIN_STOCK",
            AlertLevel::Critico => "CRITICO",
            AlertLevel::Bajo => "BAJO",
            AlertLevel::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SIN_STOCK" => Ok(AlertLevel::SinStock),
            "CRITICO" => Ok(AlertLevel::Critico),
            "BAJO" => Ok(AlertLevel::Bajo),
            "NORMAL" => Ok(AlertLevel::Normal),
            other => Err(format!("unknown alert level: {}", other)),
        }
    }
}

/// Stock row joined with product, category and warehouse for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    pub id: Uuid,
    pub id_producto: Uuid,
    pub codigo_producto: String,
    pub nombre_producto: String,
    pub id_categoria: Option<Uuid>,
    pub categoria_producto: String,
    pub id_bodega: Uuid,
    pub nombre_bodega: String,
    pub cantidad_actual: Decimal,
    pub cantidad_minima: Decimal,
    pub cantidad_reservada: Decimal,
    pub cantidad_disponible: Decimal,
    pub nivel_alerta: AlertLevel,
    pub ultima_entrada: Option<DateTime<Utc>>,
    pub ultima_salida: Option<DateTime<Utc>>,
}

/// Display fields joined onto a stock row
#[derive(Debug, Clone, Default)]
pub struct StockLabels {
    pub product_code: String,
    pub product_name: String,
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub warehouse_name: String,
}

impl StockView {
    /// Build the view, computing the available quantity and alert level
    pub fn new(stock: &Stock, labels: StockLabels) -> Self {
        Self {
            id: stock.id,
            id_producto: stock.product_id,
            codigo_producto: labels.product_code,
            nombre_producto: labels.product_name,
            id_categoria: labels.category_id,
            categoria_producto: labels.category_name,
            id_bodega: stock.warehouse_id,
            nombre_bodega: labels.warehouse_name,
            cantidad_actual: stock.quantity,
            cantidad_minima: stock.minimum_quantity,
            cantidad_reservada: stock.reserved_quantity,
            cantidad_disponible: stock.available(),
            nivel_alerta: stock.alert_level(),
            ultima_entrada: stock.last_entry_at,
            ultima_salida: stock.last_exit_at,
        }
    }

    /// Low stock means available at or below the minimum
    pub fn is_low(&self) -> bool {
        self.cantidad_disponible <= self.cantidad_minima
    }
}

/// Sort keys accepted by the stock listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSortKey {
    Product,
    Warehouse,
    Available,
    /// Most urgent first, ignores the descending toggle
    Alert,
}

impl StockSortKey {
    /// Unknown keys fall back to product name
    pub fn parse(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "bodega" => StockSortKey::Warehouse,
            "cantidad" => StockSortKey::Available,
            "alerta" => StockSortKey::Alert,
            _ => StockSortKey::Product,
        }
    }
}

fn default_stock_page() -> i64 {
    1
}

fn default_stock_page_size() -> i64 {
    20
}

fn default_stock_sort() -> String {
    "producto".to_string()
}

/// Filter body of `POST /stock/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    #[serde(default = "default_stock_page")]
    pub pagina: i64,
    #[serde(default = "default_stock_page_size")]
    pub elementos_por_pagina: i64,
    #[serde(default)]
    pub termino_busqueda: Option<String>,
    #[serde(default)]
    pub id_bodega: Option<Uuid>,
    #[serde(default)]
    pub id_categoria: Option<Uuid>,
    /// NORMAL, BAJO, CRITICO or SIN_STOCK; anything else is ignored
    #[serde(default)]
    pub nivel_alerta: Option<String>,
    #[serde(default = "default_stock_sort")]
    pub ordenar_por: String,
    #[serde(default)]
    pub descendente: bool,
}

impl Default for StockFilter {
    fn default() -> Self {
        Self {
            pagina: default_stock_page(),
            elementos_por_pagina: default_stock_page_size(),
            termino_busqueda: None,
            id_bodega: None,
            id_categoria: None,
            nivel_alerta: None,
            ordenar_por: default_stock_sort(),
            descendente: false,
        }
    }
}

impl StockFilter {
    pub fn search_term(&self) -> Option<String> {
        normalize_search_term(self.termino_busqueda.as_deref())
    }

    pub fn alert_level(&self) -> Option<AlertLevel> {
        self.nivel_alerta
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.parse().ok())
    }

    pub fn sort_key(&self) -> StockSortKey {
        StockSortKey::parse(&self.ordenar_por)
    }

    pub fn page(&self, default_per_page: i64) -> PageRequest {
        PageRequest::normalized(self.pagina, self.elementos_por_pagina, default_per_page)
    }

    /// True when `view` passes every filter that is set
    pub fn matches(&self, view: &StockView) -> bool {
        if let Some(term) = self.search_term() {
            let hit = contains_ignore_case(&view.nombre_producto, &term)
                || contains_ignore_case(&view.codigo_producto, &term)
                || contains_ignore_case(&view.nombre_bodega, &term);
            if !hit {
                return false;
            }
        }

        if let Some(warehouse_id) = self.id_bodega {
            if view.id_bodega != warehouse_id {
                return false;
            }
        }

        if let Some(category_id) = self.id_categoria {
            if view.id_categoria != Some(category_id) {
                return false;
            }
        }

        if let Some(level) = self.alert_level() {
            if view.nivel_alerta != level {
                return false;
            }
        }

        true
    }

    /// Order `views` by the requested key
    pub fn sort(&self, views: &mut [StockView]) {
        let key = self.sort_key();
        views.sort_by(|a, b| {
            let ordering = compare_stock(key, a, b);
            if self.descendente && key != StockSortKey::Alert {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

fn compare_stock(key: StockSortKey, a: &StockView, b: &StockView) -> Ordering {
    match key {
        StockSortKey::Product => a.nombre_producto.cmp(&b.nombre_producto),
        StockSortKey::Warehouse => a.nombre_bodega.cmp(&b.nombre_bodega),
        StockSortKey::Available => a.cantidad_disponible.cmp(&b.cantidad_disponible),
        StockSortKey::Alert => a
            .nivel_alerta
            .urgency()
            .cmp(&b.nivel_alerta.urgency())
            .then_with(|| a.nombre_producto.cmp(&b.nombre_producto)),
    }
}

/// Response of `POST /stock/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListing {
    pub stocks: Vec<StockView>,
    pub total: u64,
    pub pagina: i64,
    pub elementos_por_pagina: i64,
    pub total_paginas: i64,
}
