//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::str::FromStr;

use bodega_inventory_backend::config::InventoryConfig;
use bodega_inventory_backend::services::inventory::RegisterMovementRequest;
use bodega_inventory_backend::MemoryStore;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{Category, Product, Warehouse};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn product(code: &str, name: &str, minimum: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: name.to_string(),
        category_id: None,
        price: dec("10.00"),
        minimum_stock: dec(minimum),
        supplier_id: None,
        active: true,
    }
}

pub fn category(name: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        active: true,
    }
}

pub fn warehouse(name: &str, active: bool) -> Warehouse {
    Warehouse {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: None,
        responsible: None,
        phone: None,
        capacity_m3: None,
        active,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn movement_request(product_id: Uuid, warehouse_id: Uuid, quantity: &str) -> RegisterMovementRequest {
    RegisterMovementRequest {
        id_producto: product_id,
        id_bodega: warehouse_id,
        cantidad: dec(quantity),
        precio_unitario: None,
        observacion: None,
        referencia: None,
    }
}

/// A store holding one active product and one active warehouse
pub struct Fixture {
    pub store: MemoryStore,
    pub product: Product,
    pub warehouse: Warehouse,
    pub user_id: Uuid,
}

impl Fixture {
    pub async fn new(minimum: &str) -> Self {
        let store = MemoryStore::new();
        let product = product("PROD-00001", "Cemento gris", minimum);
        let warehouse = warehouse("Bodega Central", true);
        let user_id = Uuid::new_v4();

        store.insert_product(product.clone()).await;
        store.insert_warehouse(warehouse.clone()).await;
        store.insert_user(user_id, "Ana Torres").await;

        Self {
            store,
            product,
            warehouse,
            user_id,
        }
    }

    pub async fn with_stock(self, quantity: &str, minimum: &str) -> Self {
        self.store
            .set_stock(
                self.product.id,
                self.warehouse.id,
                dec(quantity),
                dec(minimum),
                Decimal::ZERO,
            )
            .await;
        self
    }

    pub fn request(&self, quantity: &str) -> RegisterMovementRequest {
        movement_request(self.product.id, self.warehouse.id, quantity)
    }

    pub async fn quantity(&self) -> Decimal {
        self.store
            .stock_row(self.product.id, self.warehouse.id)
            .await
            .map(|s| s.quantity)
            .unwrap_or(Decimal::ZERO)
    }
}

pub fn settings() -> InventoryConfig {
    InventoryConfig::default()
}
