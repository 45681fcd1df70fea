//! In-process store used by the test suite and for running without a database
//!
//! All state sits behind one async mutex. A transaction owns the lock for its
//! whole lifetime, so units of work are serialized, and it keeps a snapshot of
//! the state taken at `begin` that is put back if it is dropped uncommitted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    AuditEntry, Category, Movement, MovementLabels, MovementQuery, MovementType, MovementView,
    NewAuditEntry, NewMovement, PageRequest, Product, Stock, StockFilter, StockLabels, StockView,
    Warehouse, WarehouseFilter, WarehouseView,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{InventoryStore, LockMode, MovementScope, Page, StockScope, StoreTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    categories: HashMap<Uuid, Category>,
    warehouses: HashMap<Uuid, Warehouse>,
    users: HashMap<Uuid, String>,
    stock: HashMap<(Uuid, Uuid), Stock>,
    movements: Vec<Movement>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn stock_view(&self, stock: &Stock) -> StockView {
        let product = self.products.get(&stock.product_id);
        let category_id = product.and_then(|p| p.category_id);
        let labels = StockLabels {
            product_code: product.map(|p| p.code.clone()).unwrap_or_default(),
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            category_id,
            category_name: category_id
                .and_then(|id| self.categories.get(&id))
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            warehouse_name: self
                .warehouses
                .get(&stock.warehouse_id)
                .map(|w| w.name.clone())
                .unwrap_or_default(),
        };
        StockView::new(stock, labels)
    }

    fn stock_views(&self) -> Vec<StockView> {
        self.stock.values().map(|s| self.stock_view(s)).collect()
    }

    fn movement_view(&self, movement: &Movement) -> MovementView {
        let product = self.products.get(&movement.product_id);
        let labels = MovementLabels {
            product_code: product.map(|p| p.code.clone()).unwrap_or_default(),
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            warehouse_name: self
                .warehouses
                .get(&movement.warehouse_id)
                .map(|w| w.name.clone())
                .unwrap_or_default(),
            user_name: movement.user_id.and_then(|id| self.users.get(&id).cloned()),
        };
        MovementView::new(movement, labels)
    }

    /// Newest first; among equal timestamps the later insert comes first
    fn movement_views_newest_first(&self) -> Vec<MovementView> {
        let mut views: Vec<MovementView> = self
            .movements
            .iter()
            .rev()
            .map(|m| self.movement_view(m))
            .collect();
        views.sort_by(|a, b| b.fecha.cmp(&a.fecha));
        views
    }

    fn warehouse_stock_rows(&self, warehouse_id: Uuid) -> i64 {
        self.stock
            .values()
            .filter(|s| s.warehouse_id == warehouse_id)
            .count() as i64
    }

    fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> bool {
        let name = name.trim().to_lowercase();
        self.warehouses
            .values()
            .any(|w| Some(w.id) != exclude && w.name.trim().to_lowercase() == name)
    }
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_category(&self, category: Category) {
        self.state.lock().await.categories.insert(category.id, category);
    }

    pub async fn insert_warehouse(&self, warehouse: Warehouse) {
        self.state
            .lock()
            .await
            .warehouses
            .insert(warehouse.id, warehouse);
    }

    pub async fn insert_user(&self, id: Uuid, name: impl Into<String>) {
        self.state.lock().await.users.insert(id, name.into());
    }

    /// Put a stock row in place directly, bypassing the movement path
    pub async fn set_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        minimum_quantity: Decimal,
        reserved_quantity: Decimal,
    ) -> Stock {
        let mut state = self.state.lock().await;
        let mut row = Stock::empty(product_id, warehouse_id, minimum_quantity, Utc::now());
        row.quantity = quantity;
        row.reserved_quantity = reserved_quantity;
        state.stock.insert((product_id, warehouse_id), row.clone());
        row
    }

    pub async fn stock_row(&self, product_id: Uuid, warehouse_id: Uuid) -> Option<Stock> {
        self.state
            .lock()
            .await
            .stock
            .get(&(product_id, warehouse_id))
            .cloned()
    }

    pub async fn movement_count(&self) -> usize {
        self.state.lock().await.movements.len()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_stock(&mut self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<Option<Stock>> {
        Ok(self.state.stock.get(&(product_id, warehouse_id)).cloned())
    }

    async fn lock_warehouse(&mut self, id: Uuid, _mode: LockMode) -> AppResult<Option<Warehouse>> {
        Ok(self.state.warehouses.get(&id).cloned())
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Stock> {
        let state = &mut *self.state;
        let minimum = state
            .products
            .get(&product_id)
            .map(|p| p.minimum_stock)
            .unwrap_or(Decimal::ZERO);

        let row = state
            .stock
            .entry((product_id, warehouse_id))
            .or_insert_with(|| Stock::empty(product_id, warehouse_id, minimum, now));

        row.apply(movement_type, quantity, now)?;
        Ok(row.clone())
    }

    async fn insert_movement(
        &mut self,
        movement: NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement> {
        if movement.quantity <= Decimal::ZERO {
            return Err(AppError::validation(
                "cantidad",
                "Movement quantity must be greater than zero",
                "La cantidad debe ser mayor a cero",
            ));
        }
        let movement = movement.into_movement(Uuid::new_v4(), now);
        self.state.movements.push(movement.clone());
        Ok(movement)
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        if self.state.name_taken(&warehouse.name, None) {
            return Err(AppError::DuplicateEntry("nombre".to_string()));
        }
        self.state
            .warehouses
            .insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        if !self.state.warehouses.contains_key(&warehouse.id) {
            return Err(AppError::NotFound(crate::error::Resource::Warehouse));
        }
        if self.state.name_taken(&warehouse.name, Some(warehouse.id)) {
            return Err(AppError::DuplicateEntry("nombre".to_string()));
        }
        self.state
            .warehouses
            .insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn seed_stock_for_warehouse(
        &mut self,
        warehouse_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let state = &mut *self.state;
        let mut created = 0;
        for product in state.products.values().filter(|p| p.active) {
            let key = (product.id, warehouse_id);
            if !state.stock.contains_key(&key) {
                state.stock.insert(
                    key,
                    Stock::empty(product.id, warehouse_id, product.minimum_stock, now),
                );
                created += 1;
            }
        }
        Ok(created)
    }

    async fn warehouse_holds_stock(&mut self, warehouse_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .stock
            .values()
            .any(|s| s.warehouse_id == warehouse_id && s.quantity > Decimal::ZERO))
    }

    async fn commit(mut self) -> AppResult<()> {
        self.snapshot = None;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let state = self.state.clone().lock_owned().await;
        let snapshot = Some(state.clone());
        Ok(MemoryTx { state, snapshot })
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn find_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(self.state.lock().await.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(
        &self,
        filter: &WarehouseFilter,
        page: PageRequest,
    ) -> AppResult<Page<WarehouseView>> {
        let state = self.state.lock().await;
        let mut warehouses: Vec<Warehouse> = state
            .warehouses
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        filter.sort(&mut warehouses);

        let total = warehouses.len() as u64;
        let items = page
            .apply(warehouses)
            .iter()
            .map(|w| WarehouseView::new(w, state.warehouse_stock_rows(w.id)))
            .collect();
        Ok(Page { items, total })
    }

    async fn warehouse_name_exists(&self, name: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        Ok(self.state.lock().await.name_taken(name, exclude))
    }

    async fn find_stock(&self, id: Uuid) -> AppResult<Option<StockView>> {
        let state = self.state.lock().await;
        Ok(state
            .stock
            .values()
            .find(|s| s.id == id)
            .map(|s| state.stock_view(s)))
    }

    async fn find_stock_for(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<StockView>> {
        let state = self.state.lock().await;
        Ok(state
            .stock
            .get(&(product_id, warehouse_id))
            .map(|s| state.stock_view(s)))
    }

    async fn list_stock(&self, scope: StockScope) -> AppResult<Vec<StockView>> {
        let state = self.state.lock().await;
        let mut views = state.stock_views();

        match scope {
            StockScope::All => {
                views.sort_by(|a, b| a.nombre_producto.cmp(&b.nombre_producto));
            }
            StockScope::Warehouse(id) => {
                views.retain(|v| v.id_bodega == id);
                views.sort_by(|a, b| a.nombre_producto.cmp(&b.nombre_producto));
            }
            StockScope::Product(id) => {
                views.retain(|v| v.id_producto == id);
                views.sort_by(|a, b| a.nombre_bodega.cmp(&b.nombre_bodega));
            }
            StockScope::Low => {
                views.retain(StockView::is_low);
                views.sort_by(|a, b| a.cantidad_disponible.cmp(&b.cantidad_disponible));
            }
        }

        Ok(views)
    }

    async fn search_stock(
        &self,
        filter: &StockFilter,
        page: PageRequest,
    ) -> AppResult<Page<StockView>> {
        let state = self.state.lock().await;
        let mut views: Vec<StockView> = state
            .stock_views()
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect();
        filter.sort(&mut views);

        let total = views.len() as u64;
        Ok(Page {
            items: page.apply(views),
            total,
        })
    }

    async fn find_movement(&self, id: Uuid) -> AppResult<Option<MovementView>> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .find(|m| m.id == id)
            .map(|m| state.movement_view(m)))
    }

    async fn list_movements(&self, scope: MovementScope) -> AppResult<Vec<MovementView>> {
        let mut views = self.state.lock().await.movement_views_newest_first();
        match scope {
            MovementScope::All => {}
            MovementScope::Product(id) => views.retain(|v| v.id_producto == id),
            MovementScope::Warehouse(id) => views.retain(|v| v.id_bodega == id),
        }
        Ok(views)
    }

    async fn search_movements(
        &self,
        query: &MovementQuery,
        page: PageRequest,
    ) -> AppResult<Page<MovementView>> {
        let mut views: Vec<MovementView> = self
            .state
            .lock()
            .await
            .movement_views_newest_first()
            .into_iter()
            .filter(|v| query.matches(v))
            .collect();
        query.sort(&mut views);

        let total = views.len() as u64;
        Ok(Page {
            items: page.apply(views),
            total,
        })
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> AppResult<()> {
        let entry = entry.into_entry(Uuid::new_v4(), Utc::now());
        self.state.lock().await.audit.push(entry);
        Ok(())
    }
}
