//! Stock ledger: the only writer of stock quantities

use rust_decimal::Decimal;
use shared::{AlertLevel, MovementType, PageRequest, Stock, StockFilter, StockListing, StockView};
use uuid::Uuid;

use crate::error::{AppError, AppResult, Resource};
use crate::store::{InventoryStore, StockScope, StoreTx};

/// Quantity bookkeeping per (product, warehouse)
#[derive(Clone)]
pub struct StockLedger<S> {
    store: S,
}

impl<S: InventoryStore> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_by_product_and_warehouse(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<StockView> {
        self.store
            .find_stock_for(product_id, warehouse_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Stock))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<StockView> {
        self.store
            .find_stock(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Stock))
    }

    /// Apply `quantity` units of `movement_type` inside `tx`.
    ///
    /// Entrada and Ajuste add, Salida and Transferencia subtract. A missing row
    /// is created at zero first. The quantity never goes below zero; a change
    /// that would is rejected with `InsufficientStock` and nothing is written.
    pub async fn adjust_quantity(
        &self,
        tx: &mut S::Tx,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: Decimal,
        movement_type: MovementType,
    ) -> AppResult<Stock> {
        let stock = tx
            .adjust_stock(
                product_id,
                warehouse_id,
                movement_type,
                quantity,
                chrono::Utc::now(),
            )
            .await?;

        tracing::debug!(
            "Stock {} for product {} in warehouse {} is now {}",
            stock.id,
            product_id,
            warehouse_id,
            stock.quantity
        );

        Ok(stock)
    }

    pub fn compute_alert_level(stock: &Stock) -> AlertLevel {
        AlertLevel::classify(stock.available(), stock.minimum_quantity)
    }

    /// Rows with available at or below minimum, most urgent first
    pub async fn list_low_stock(&self) -> AppResult<Vec<StockView>> {
        self.store.list_stock(StockScope::Low).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<StockView>> {
        self.store.list_stock(StockScope::All).await
    }

    pub async fn list_by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<StockView>> {
        self.store
            .list_stock(StockScope::Warehouse(warehouse_id))
            .await
    }

    pub async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<StockView>> {
        self.store.list_stock(StockScope::Product(product_id)).await
    }

    pub async fn list_with_filters(
        &self,
        filter: StockFilter,
        default_page_size: i64,
    ) -> AppResult<StockListing> {
        let page: PageRequest = filter.page(default_page_size);
        let result = self.store.search_stock(&filter, page).await?;

        Ok(StockListing {
            stocks: result.items,
            total: result.total,
            pagina: page.page,
            elementos_por_pagina: page.per_page,
            total_paginas: page.total_pages(result.total),
        })
    }
}
