//! Movement recorder: append-only history of inventory movements

use chrono::Utc;
use shared::{Movement, MovementListing, MovementFilter, MovementQuery, MovementView, NewMovement};
use uuid::Uuid;

use crate::error::{AppError, AppResult, Resource};
use crate::store::{InventoryStore, MovementScope, StoreTx};

#[derive(Clone)]
pub struct MovementRecorder<S> {
    store: S,
}

impl<S: InventoryStore> MovementRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append a movement stamped with the current time. Business checks are
    /// the caller's job.
    pub async fn create(&self, tx: &mut S::Tx, movement: NewMovement) -> AppResult<Movement> {
        tx.insert_movement(movement, Utc::now()).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<MovementView> {
        self.store
            .find_movement(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Movement))
    }

    pub async fn get_by_product(&self, product_id: Uuid) -> AppResult<Vec<MovementView>> {
        self.store
            .list_movements(MovementScope::Product(product_id))
            .await
    }

    pub async fn get_by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<MovementView>> {
        self.store
            .list_movements(MovementScope::Warehouse(warehouse_id))
            .await
    }

    /// Every movement, newest first
    pub async fn list_all(&self) -> AppResult<Vec<MovementView>> {
        self.store.list_movements(MovementScope::All).await
    }

    pub async fn list_with_filters(
        &self,
        filter: MovementFilter,
        default_page_size: i64,
    ) -> AppResult<MovementListing> {
        let page = filter.page(default_page_size);
        let query = MovementQuery::new(filter).map_err(|message| {
            AppError::validation(
                "tipo",
                message,
                "Tipo de movimiento inválido. Use Entrada, Salida, Ajuste o Transferencia",
            )
        })?;

        let result = self.store.search_movements(&query, page).await?;

        Ok(MovementListing {
            movimientos: result.items,
            total: result.total,
            pagina: page.page,
            elementos_por_pagina: page.per_page,
            total_paginas: page.total_pages(result.total),
        })
    }
}
