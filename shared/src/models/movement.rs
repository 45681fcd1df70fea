//! Inventory movements ("movimientos de inventario")

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{contains_ignore_case, normalize_search_term, PageRequest};

/// Kind of movement. Only Entrada and Salida are produced by the movement
/// endpoints; Ajuste and Transferencia are accepted by the stock arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    Entrada,
    Salida,
    Ajuste,
    Transferencia,
}

/// Which way a movement pushes the stock counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    Increase,
    Decrease,
}

impl MovementType {
    pub fn direction(&self) -> StockDirection {
        match self {
            MovementType::Entrada | MovementType::Ajuste => StockDirection::Increase,
            MovementType::Salida | MovementType::Transferencia => StockDirection::Decrease,
        }
    }

    /// Reference tag stamped on movements created by the movement endpoints
    pub fn default_reference_type(&self) -> Option<&'static str> {
        match self {
            MovementType::Entrada => Some("Compra"),
            MovementType::Salida => Some("Venta"),
            MovementType::Ajuste | MovementType::Transferencia => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "Entrada",
            MovementType::Salida => "Salida",
            MovementType::Ajuste => "Ajuste",
            MovementType::Transferencia => "Transferencia",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" => Ok(MovementType::Entrada),
            "salida" => Ok(MovementType::Salida),
            "ajuste" => Ok(MovementType::Ajuste),
            "transferencia" => Ok(MovementType::Transferencia),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

/// A persisted movement. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub user_id: Option<Uuid>,
    pub reference: Option<String>,
    pub reference_type: Option<String>,
}

/// Movement fields supplied by the caller; id and timestamp are assigned on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub note: Option<String>,
    pub user_id: Option<Uuid>,
    pub reference: Option<String>,
    pub reference_type: Option<String>,
}

impl NewMovement {
    pub fn into_movement(self, id: Uuid, occurred_at: DateTime<Utc>) -> Movement {
        Movement {
            id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            unit_price: self.unit_price,
            occurred_at,
            note: self.note,
            user_id: self.user_id,
            reference: self.reference,
            reference_type: self.reference_type,
        }
    }
}

/// Movement joined with product, warehouse and user names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: Uuid,
    pub id_producto: Uuid,
    pub codigo_producto: String,
    pub nombre_producto: String,
    pub id_bodega: Uuid,
    pub nombre_bodega: String,
    pub tipo: MovementType,
    pub cantidad: Decimal,
    pub precio_unitario: Option<Decimal>,
    pub fecha: DateTime<Utc>,
    pub observacion: Option<String>,
    pub id_usuario: Option<Uuid>,
    pub nombre_usuario: Option<String>,
    pub referencia: Option<String>,
    pub tipo_referencia: Option<String>,
}

/// Display fields joined onto a movement
#[derive(Debug, Clone, Default)]
pub struct MovementLabels {
    pub product_code: String,
    pub product_name: String,
    pub warehouse_name: String,
    pub user_name: Option<String>,
}

impl MovementView {
    pub fn new(movement: &Movement, labels: MovementLabels) -> Self {
        Self {
            id: movement.id,
            id_producto: movement.product_id,
            codigo_producto: labels.product_code,
            nombre_producto: labels.product_name,
            id_bodega: movement.warehouse_id,
            nombre_bodega: labels.warehouse_name,
            tipo: movement.movement_type,
            cantidad: movement.quantity,
            precio_unitario: movement.unit_price,
            fecha: movement.occurred_at,
            observacion: movement.note.clone(),
            id_usuario: movement.user_id,
            nombre_usuario: labels.user_name,
            referencia: movement.reference.clone(),
            tipo_referencia: movement.reference_type.clone(),
        }
    }
}

/// Sort keys accepted by the movement listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSortKey {
    Product,
    Warehouse,
    Quantity,
    Date,
}

impl MovementSortKey {
    /// Unknown keys fall back to date
    pub fn parse(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "producto" => MovementSortKey::Product,
            "bodega" => MovementSortKey::Warehouse,
            "cantidad" => MovementSortKey::Quantity,
            _ => MovementSortKey::Date,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

fn default_sort() -> String {
    "fecha".to_string()
}

fn default_descending() -> bool {
    true
}

/// Filter body of `POST /movimientos/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    #[serde(default = "default_page")]
    pub pagina: i64,
    #[serde(default = "default_page_size")]
    pub elementos_por_pagina: i64,
    #[serde(default)]
    pub termino_busqueda: Option<String>,
    #[serde(default)]
    pub id_bodega: Option<Uuid>,
    #[serde(default)]
    pub id_producto: Option<Uuid>,
    /// Parsed by the service so an unknown value can be reported on this field
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub fecha_desde: Option<NaiveDate>,
    #[serde(default)]
    pub fecha_hasta: Option<NaiveDate>,
    #[serde(default = "default_sort")]
    pub ordenar_por: String,
    #[serde(default = "default_descending")]
    pub descendente: bool,
}

impl Default for MovementFilter {
    fn default() -> Self {
        Self {
            pagina: default_page(),
            elementos_por_pagina: default_page_size(),
            termino_busqueda: None,
            id_bodega: None,
            id_producto: None,
            tipo: None,
            fecha_desde: None,
            fecha_hasta: None,
            ordenar_por: default_sort(),
            descendente: default_descending(),
        }
    }
}

/// A filter with its movement type already resolved
#[derive(Debug, Clone)]
pub struct MovementQuery {
    pub filter: MovementFilter,
    pub movement_type: Option<MovementType>,
}

impl MovementFilter {
    /// Resolve `tipo`; blank counts as absent
    pub fn movement_type(&self) -> Result<Option<MovementType>, String> {
        match self.tipo.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    pub fn search_term(&self) -> Option<String> {
        normalize_search_term(self.termino_busqueda.as_deref())
    }

    pub fn sort_key(&self) -> MovementSortKey {
        MovementSortKey::parse(&self.ordenar_por)
    }

    pub fn page(&self, default_per_page: i64) -> PageRequest {
        PageRequest::normalized(self.pagina, self.elementos_por_pagina, default_per_page)
    }

    /// Inclusive lower bound: start of `fechaDesde`
    pub fn from_bound(&self) -> Option<DateTime<Utc>> {
        self.fecha_desde
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Exclusive upper bound: start of the day after `fechaHasta`, so the whole
    /// last day is included
    pub fn until_bound(&self) -> Option<DateTime<Utc>> {
        self.fecha_hasta
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

impl MovementQuery {
    pub fn new(filter: MovementFilter) -> Result<Self, String> {
        let movement_type = filter.movement_type()?;
        Ok(Self {
            filter,
            movement_type,
        })
    }

    /// True when `view` passes every filter that is set
    pub fn matches(&self, view: &MovementView) -> bool {
        let filter = &self.filter;

        if let Some(term) = filter.search_term() {
            let hit = contains_ignore_case(&view.nombre_producto, &term)
                || contains_ignore_case(&view.codigo_producto, &term)
                || contains_ignore_case(&view.nombre_bodega, &term)
                || view
                    .referencia
                    .as_deref()
                    .map(|r| contains_ignore_case(r, &term))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }

        if let Some(warehouse_id) = filter.id_bodega {
            if view.id_bodega != warehouse_id {
                return false;
            }
        }

        if let Some(product_id) = filter.id_producto {
            if view.id_producto != product_id {
                return false;
            }
        }

        if let Some(movement_type) = self.movement_type {
            if view.tipo != movement_type {
                return false;
            }
        }

        if let Some(from) = filter.from_bound() {
            if view.fecha < from {
                return false;
            }
        }

        if let Some(until) = filter.until_bound() {
            if view.fecha >= until {
                return false;
            }
        }

        true
    }

    /// Order `views` by the requested key and direction
    pub fn sort(&self, views: &mut [MovementView]) {
        let key = self.filter.sort_key();
        let descending = self.filter.descendente;
        views.sort_by(|a, b| {
            let ordering = compare_movements(key, a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

fn compare_movements(key: MovementSortKey, a: &MovementView, b: &MovementView) -> Ordering {
    match key {
        MovementSortKey::Product => a.nombre_producto.cmp(&b.nombre_producto),
        MovementSortKey::Warehouse => a.nombre_bodega.cmp(&b.nombre_bodega),
        MovementSortKey::Quantity => a.cantidad.cmp(&b.cantidad),
        MovementSortKey::Date => a.fecha.cmp(&b.fecha),
    }
}

/// Response of `POST /movimientos/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementListing {
    pub movimientos: Vec<MovementView>,
    pub total: u64,
    pub pagina: i64,
    pub elementos_por_pagina: i64,
    pub total_paginas: i64,
}
