//! Inventory service: registers entries and exits as one unit of work over the
//! movement history and the stock ledger

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_precision, validate_quantity, validate_reference, validate_unit_price, Movement,
    MovementFilter, MovementLabels, MovementListing, MovementType, MovementView, NewMovement,
    Product, Warehouse,
};
use uuid::Uuid;
use validator::Validate;

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult, Resource};
use crate::services::audit::{AuditLog, MODULE_INVENTORY};
use crate::services::ledger::StockLedger;
use crate::services::movement::MovementRecorder;
use crate::store::{InventoryStore, LockMode, StoreTx};

/// Spanish message for an amount that does not fit `NUMERIC(18, 2)`
pub(crate) const PRECISION_MESSAGE_ES: &str =
    "El valor admite como máximo 16 dígitos enteros y 2 decimales";

/// Body of `POST /movimientos/entrada` and `POST /movimientos/salida`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMovementRequest {
    pub id_producto: Uuid,
    pub id_bodega: Uuid,
    pub cantidad: Decimal,
    #[serde(default)]
    pub precio_unitario: Option<Decimal>,
    #[serde(default)]
    #[validate(length(max = 500, message = "La observación no puede superar 500 caracteres"))]
    pub observacion: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "La referencia no puede superar 50 caracteres"))]
    pub referencia: Option<String>,
}

/// Orchestrates movement registration. The only path that changes stock.
pub struct InventoryService<S> {
    store: S,
    settings: InventoryConfig,
    ledger: StockLedger<S>,
    recorder: MovementRecorder<S>,
    audit: AuditLog<S>,
}

impl<S: InventoryStore> InventoryService<S> {
    /// Create a new InventoryService instance
    pub fn new(store: S, settings: InventoryConfig) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            recorder: MovementRecorder::new(store.clone()),
            audit: AuditLog::new(store.clone()),
            store,
            settings,
        }
    }

    /// Register a stock entry ("Compra")
    pub async fn register_entry(
        &self,
        user_id: Option<Uuid>,
        input: RegisterMovementRequest,
    ) -> AppResult<MovementView> {
        let product = self.active_product(input.id_producto).await?;
        validate_movement_input(&input)?;

        let mut tx = self.store.begin().await?;
        let warehouse = lock_warehouse(&mut tx, input.id_bodega).await?;
        ensure_active(&warehouse)?;

        let movement = self
            .recorder
            .create(&mut tx, new_movement(&input, MovementType::Entrada, user_id))
            .await?;

        let stock = self
            .ledger
            .adjust_quantity(
                &mut tx,
                product.id,
                warehouse.id,
                input.cantidad,
                MovementType::Entrada,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Entry {} registered: {} units of product {} into warehouse {} (stock now {})",
            movement.id,
            input.cantidad,
            product.id,
            warehouse.id,
            stock.quantity
        );

        self.audit
            .record(
                user_id,
                MODULE_INVENTORY,
                format!(
                    "Entrada de {} unidades del producto {} en bodega {}",
                    input.cantidad, product.code, warehouse.name
                ),
            )
            .await;

        Ok(self.committed_view(&movement, &product, &warehouse).await)
    }

    /// Register a stock exit ("Venta")
    pub async fn register_exit(
        &self,
        user_id: Option<Uuid>,
        input: RegisterMovementRequest,
    ) -> AppResult<MovementView> {
        let product = self.active_product(input.id_producto).await?;
        validate_movement_input(&input)?;

        let mut tx = self.store.begin().await?;
        let warehouse = lock_warehouse(&mut tx, input.id_bodega).await?;
        if self.settings.require_active_warehouse_on_exit {
            ensure_active(&warehouse)?;
        }

        // The row stays locked until commit, so no other exit can interleave
        // between this check and the adjustment below
        let available = tx
            .lock_stock(product.id, warehouse.id)
            .await?
            .map(|s| s.available())
            .unwrap_or(Decimal::ZERO);

        if available < input.cantidad {
            tracing::warn!(
                "Exit rejected for product {} in warehouse {}: available {}, requested {}",
                product.id,
                warehouse.id,
                available,
                input.cantidad
            );
            return Err(AppError::InsufficientStock {
                available,
                requested: input.cantidad,
            });
        }

        let movement = self
            .recorder
            .create(&mut tx, new_movement(&input, MovementType::Salida, user_id))
            .await?;

        let stock = self
            .ledger
            .adjust_quantity(
                &mut tx,
                product.id,
                warehouse.id,
                input.cantidad,
                MovementType::Salida,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Exit {} registered: {} units of product {} from warehouse {} (stock now {})",
            movement.id,
            input.cantidad,
            product.id,
            warehouse.id,
            stock.quantity
        );

        self.audit
            .record(
                user_id,
                MODULE_INVENTORY,
                format!(
                    "Salida de {} unidades del producto {} de bodega {}",
                    input.cantidad, product.code, warehouse.name
                ),
            )
            .await;

        Ok(self.committed_view(&movement, &product, &warehouse).await)
    }

    pub async fn get_all(&self) -> AppResult<Vec<MovementView>> {
        self.recorder.list_all().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<MovementView> {
        self.recorder.get_by_id(id).await
    }

    pub async fn get_with_filters(&self, filter: MovementFilter) -> AppResult<MovementListing> {
        self.recorder
            .list_with_filters(filter, self.settings.movement_page_size)
            .await
    }

    pub async fn get_by_product(&self, product_id: Uuid) -> AppResult<Vec<MovementView>> {
        self.recorder.get_by_product(product_id).await
    }

    pub async fn get_by_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<MovementView>> {
        self.recorder.get_by_warehouse(warehouse_id).await
    }

    /// A soft-deleted product counts as missing
    async fn active_product(&self, id: Uuid) -> AppResult<Product> {
        match self.store.find_product(id).await? {
            Some(product) if product.active => Ok(product),
            _ => Err(AppError::NotFound(Resource::Product)),
        }
    }

    /// Reload a committed movement with its display fields. The movement is
    /// already stored, so a failed read falls back to the labels at hand
    /// rather than reporting an error.
    async fn committed_view(
        &self,
        movement: &Movement,
        product: &Product,
        warehouse: &Warehouse,
    ) -> MovementView {
        match self.recorder.get_by_id(movement.id).await {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!(
                    "Movement {} was committed but could not be reloaded: {}",
                    movement.id,
                    err
                );
                MovementView::new(
                    movement,
                    MovementLabels {
                        product_code: product.code.clone(),
                        product_name: product.name.clone(),
                        warehouse_name: warehouse.name.clone(),
                        user_name: None,
                    },
                )
            }
        }
    }
}

async fn lock_warehouse<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<Warehouse> {
    tx.lock_warehouse(id, LockMode::Share)
        .await?
        .ok_or(AppError::NotFound(Resource::Warehouse))
}

fn ensure_active(warehouse: &Warehouse) -> AppResult<()> {
    if warehouse.active {
        Ok(())
    } else {
        Err(AppError::WarehouseInactive {
            name: warehouse.name.clone(),
        })
    }
}

fn validate_movement_input(input: &RegisterMovementRequest) -> AppResult<()> {
    validate_precision(input.cantidad).map_err(|message| {
        AppError::validation("cantidad", message, PRECISION_MESSAGE_ES)
    })?;

    validate_quantity(input.cantidad).map_err(|message| {
        AppError::validation("cantidad", message, "La cantidad debe ser mayor a cero")
    })?;

    if let Some(price) = input.precio_unitario {
        validate_precision(price).map_err(|message| {
            AppError::validation("precioUnitario", message, PRECISION_MESSAGE_ES)
        })?;
    }

    validate_unit_price(input.precio_unitario).map_err(|message| {
        AppError::validation(
            "precioUnitario",
            message,
            "El precio unitario no puede ser negativo",
        )
    })?;

    validate_reference(input.referencia.as_deref()).map_err(|message| {
        AppError::validation(
            "referencia",
            message,
            "La referencia no puede superar 50 caracteres",
        )
    })?;

    input.validate()?;
    Ok(())
}

fn new_movement(
    input: &RegisterMovementRequest,
    movement_type: MovementType,
    user_id: Option<Uuid>,
) -> NewMovement {
    NewMovement {
        product_id: input.id_producto,
        warehouse_id: input.id_bodega,
        movement_type,
        quantity: input.cantidad,
        unit_price: input.precio_unitario,
        note: input.observacion.clone(),
        user_id,
        reference: input.referencia.clone(),
        reference_type: movement_type.default_reference_type().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    /// A movement the store cannot return still yields a view built from the
    /// product and warehouse already loaded
    #[tokio::test]
    async fn test_committed_view_falls_back_to_known_labels() {
        let service = InventoryService::new(MemoryStore::new(), InventoryConfig::default());
        let product = Product {
            id: Uuid::new_v4(),
            code: "PROD-00001".to_string(),
            name: "Cemento gris".to_string(),
            category_id: None,
            price: Decimal::from(10),
            minimum_stock: Decimal::ZERO,
            supplier_id: None,
            active: true,
        };
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: "Bodega Central".to_string(),
            address: None,
            responsible: None,
            phone: None,
            capacity_m3: None,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        let request = RegisterMovementRequest {
            id_producto: product.id,
            id_bodega: warehouse.id,
            cantidad: Decimal::from(4),
            precio_unitario: None,
            observacion: None,
            referencia: Some("FAC-9".to_string()),
        };
        let user_id = Uuid::new_v4();
        let movement = new_movement(&request, MovementType::Entrada, Some(user_id))
            .into_movement(Uuid::new_v4(), Utc::now());

        let view = service.committed_view(&movement, &product, &warehouse).await;

        assert_eq!(view.id, movement.id);
        assert_eq!(view.codigo_producto, "PROD-00001");
        assert_eq!(view.nombre_producto, "Cemento gris");
        assert_eq!(view.nombre_bodega, "Bodega Central");
        assert_eq!(view.cantidad, Decimal::from(4));
        assert_eq!(view.id_usuario, Some(user_id));
        assert!(view.nombre_usuario.is_none());
        assert_eq!(view.tipo_referencia.as_deref(), Some("Compra"));
    }
}
