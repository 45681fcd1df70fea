//! Persistence boundary for the inventory slice
//!
//! Reads go straight to the store. Every write runs inside a [`StoreTx`]
//! obtained from [`InventoryStore::begin`]; dropping the transaction without
//! calling [`StoreTx::commit`] discards all of its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Movement, MovementQuery, MovementType, MovementView, NewAuditEntry, NewMovement, PageRequest,
    Product, Stock, StockFilter, StockView, Warehouse, WarehouseFilter, WarehouseView,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which stock rows an unfiltered listing returns, and in which order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockScope {
    /// Every row, by product name
    All,
    /// Rows of one warehouse, by product name
    Warehouse(Uuid),
    /// Rows of one product, by warehouse name
    Product(Uuid),
    /// Rows with available at or below minimum, lowest available first
    Low,
}

/// Which movements an unfiltered listing returns; always newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementScope {
    All,
    Product(Uuid),
    Warehouse(Uuid),
}

/// How strongly [`StoreTx::lock_warehouse`] holds the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Movements: many may hold it at once, but the row cannot change under them
    Share,
    /// Warehouse edits: waits for every other holder
    Update,
}

/// One page of results plus the number of rows matching before paging
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Write path of a unit of work
#[async_trait]
pub trait StoreTx: Send {
    /// Read the (product, warehouse) row, holding it against concurrent
    /// writers until the transaction ends
    async fn lock_stock(&mut self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<Option<Stock>>;

    /// Read a warehouse and hold it until the transaction ends
    async fn lock_warehouse(&mut self, id: Uuid, mode: LockMode) -> AppResult<Option<Warehouse>>;

    /// Move the (product, warehouse) counter by `quantity` in the direction of
    /// `movement_type`, creating a zero row first when the pair is unseen.
    /// Fails with `InsufficientStock` instead of going below zero.
    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Stock>;

    async fn insert_movement(
        &mut self,
        movement: NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement>;

    /// Fails with `DuplicateEntry` when the name is already taken
    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()>;

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()>;

    /// Create a zero-quantity row in `warehouse_id` for every active product.
    /// Returns the number of rows created.
    async fn seed_stock_for_warehouse(
        &mut self,
        warehouse_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// True when any row of the warehouse has a positive quantity
    async fn warehouse_holds_stock(&mut self, warehouse_id: Uuid) -> AppResult<bool>;

    async fn commit(self) -> AppResult<()>;
}

#[async_trait]
pub trait InventoryStore: Clone + Send + Sync + 'static {
    type Tx: StoreTx + 'static;

    async fn begin(&self) -> AppResult<Self::Tx>;

    async fn ping(&self) -> AppResult<()>;

    // Catalog

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn find_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>>;

    /// Warehouses passing `filter`, sorted as it asks, with their stock row count
    async fn list_warehouses(
        &self,
        filter: &WarehouseFilter,
        page: PageRequest,
    ) -> AppResult<Page<WarehouseView>>;

    /// Case-insensitive name check, optionally ignoring one warehouse
    async fn warehouse_name_exists(&self, name: &str, exclude: Option<Uuid>) -> AppResult<bool>;

    // Stock

    async fn find_stock(&self, id: Uuid) -> AppResult<Option<StockView>>;

    async fn find_stock_for(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<StockView>>;

    async fn list_stock(&self, scope: StockScope) -> AppResult<Vec<StockView>>;

    async fn search_stock(&self, filter: &StockFilter, page: PageRequest)
        -> AppResult<Page<StockView>>;

    // Movements

    async fn find_movement(&self, id: Uuid) -> AppResult<Option<MovementView>>;

    async fn list_movements(&self, scope: MovementScope) -> AppResult<Vec<MovementView>>;

    async fn search_movements(
        &self,
        query: &MovementQuery,
        page: PageRequest,
    ) -> AppResult<Page<MovementView>>;

    // Audit

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> AppResult<()>;
}
