//! Catalog entities read by the inventory slice: products, categories and
//! warehouses ("bodegas")

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{contains_ignore_case, normalize_search_term, PageRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique, e.g. "PROD-00042"
    pub code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub price: Decimal,
    /// Copied into new stock rows as their minimum quantity
    pub minimum_stock: Decimal,
    pub supplier_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub responsible: Option<String>,
    pub phone: Option<String>,
    pub capacity_m3: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Warehouse as returned by the `/bodegas` endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseView {
    pub id: Uuid,
    pub nombre: String,
    pub direccion: Option<String>,
    pub responsable: Option<String>,
    pub telefono: Option<String>,
    pub capacidad_m3: Option<Decimal>,
    pub activa: bool,
    /// Number of stock rows held by the warehouse
    pub total_productos: i64,
    pub fecha_creacion: DateTime<Utc>,
}

impl WarehouseView {
    pub fn new(warehouse: &Warehouse, total_products: i64) -> Self {
        Self {
            id: warehouse.id,
            nombre: warehouse.name.clone(),
            direccion: warehouse.address.clone(),
            responsable: warehouse.responsible.clone(),
            telefono: warehouse.phone.clone(),
            capacidad_m3: warehouse.capacity_m3,
            activa: warehouse.active,
            total_productos: total_products,
            fecha_creacion: warehouse.created_at,
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
    "nombre".to_string()
}

fn default_only_active() -> bool {
    true
}

/// Filter body of `POST /bodegas/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseFilter {
    #[serde(default = "default_page")]
    pub pagina: i64,
    #[serde(default = "default_page_size")]
    pub elementos_por_pagina: i64,
    #[serde(default)]
    pub termino_busqueda: Option<String>,
    #[serde(default = "default_only_active")]
    pub solo_activas: bool,
    #[serde(default = "default_sort")]
    pub ordenar_por: String,
    #[serde(default)]
    pub descendente: bool,
}

impl Default for WarehouseFilter {
    fn default() -> Self {
        Self {
            pagina: default_page(),
            elementos_por_pagina: default_page_size(),
            termino_busqueda: None,
            solo_activas: default_only_active(),
            ordenar_por: default_sort(),
            descendente: false,
        }
    }
}

impl WarehouseFilter {
    pub fn search_term(&self) -> Option<String> {
        normalize_search_term(self.termino_busqueda.as_deref())
    }

    /// True when ordering by creation date, otherwise by name
    pub fn sorts_by_creation(&self) -> bool {
        self.ordenar_por.trim().eq_ignore_ascii_case("fechacreacion")
    }

    pub fn page(&self, default_per_page: i64) -> PageRequest {
        PageRequest::normalized(self.pagina, self.elementos_por_pagina, default_per_page)
    }

    pub fn matches(&self, warehouse: &Warehouse) -> bool {
        if self.solo_activas && !warehouse.active {
            return false;
        }

        match self.search_term() {
            Some(term) => {
                contains_ignore_case(&warehouse.name, &term)
                    || warehouse
                        .responsible
                        .as_deref()
                        .map(|r| contains_ignore_case(r, &term))
                        .unwrap_or(false)
                    || warehouse
                        .address
                        .as_deref()
                        .map(|a| contains_ignore_case(a, &term))
                        .unwrap_or(false)
            }
            None => true,
        }
    }

    pub fn sort(&self, warehouses: &mut [Warehouse]) {
        let by_creation = self.sorts_by_creation();
        warehouses.sort_by(|a, b| {
            let ordering = if by_creation {
                a.created_at.cmp(&b.created_at)
            } else {
                a.name.cmp(&b.name)
            };
            if self.descendente {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Response of `POST /bodegas/listar`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseListing {
    pub bodegas: Vec<WarehouseView>,
    pub total: u64,
    pub pagina: i64,
    pub elementos_por_pagina: i64,
    pub total_paginas: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse(name: &str, active: bool, responsible: Option<&str>) -> Warehouse {
        Warehouse {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address: Some("Av. Central 123".to_string()),
            responsible: responsible.map(str::to_string),
            phone: None,
            capacity_m3: None,
            active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_only_active_by_default() {
        let filter = WarehouseFilter::default();
        assert!(filter.matches(&warehouse("Norte", true, None)));
        assert!(!filter.matches(&warehouse("Sur", false, None)));

        let filter = WarehouseFilter {
            solo_activas: false,
            ..WarehouseFilter::default()
        };
        assert!(filter.matches(&warehouse("Sur", false, None)));
    }

    #[test]
    fn test_search_covers_responsible_and_address() {
        let filter = WarehouseFilter {
            termino_busqueda: Some("MARIA".to_string()),
            ..WarehouseFilter::default()
        };
        assert!(filter.matches(&warehouse("Norte", true, Some("Maria Perez"))));
        assert!(!filter.matches(&warehouse("Norte", true, Some("Jose Rojas"))));

        let filter = WarehouseFilter {
            termino_busqueda: Some("central".to_string()),
            ..WarehouseFilter::default()
        };
        assert!(filter.matches(&warehouse("Norte", true, None)));
    }

    #[test]
    fn test_sort_by_name_descending() {
        let mut list = vec![
            warehouse("Bodega B", true, None),
            warehouse("Bodega C", true, None),
            warehouse("Bodega A", true, None),
        ];
        let filter = WarehouseFilter {
            descendente: true,
            ..WarehouseFilter::default()
        };
        filter.sort(&mut list);
        let names: Vec<_> = list.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Bodega C", "Bodega B", "Bodega A"]);
    }
}
