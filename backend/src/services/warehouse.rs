//! Warehouse ("bodega") lifecycle as far as it touches stock

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_optional_text, validate_capacity, validate_phone, validate_precision, PageRequest,
    StockView, Warehouse, WarehouseFilter, WarehouseListing, WarehouseView,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, Resource};
use crate::services::audit::{AuditLog, MODULE_WAREHOUSES};
use crate::services::inventory::PRECISION_MESSAGE_ES;
use crate::services::ledger::StockLedger;
use crate::store::{InventoryStore, LockMode, StoreTx};

/// Body of `POST /bodegas/crear`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub nombre: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "La dirección no puede superar 200 caracteres"))]
    pub direccion: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "El responsable no puede superar 100 caracteres"))]
    pub responsable: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "El teléfono no puede superar 20 caracteres"))]
    pub telefono: Option<String>,
    #[serde(default)]
    pub capacidad_m3: Option<Decimal>,
}

fn default_active() -> bool {
    true
}

/// Body of `POST /bodegas/actualizar`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWarehouseRequest {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100, message = "El nombre debe tener entre 1 y 100 caracteres"))]
    pub nombre: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "La dirección no puede superar 200 caracteres"))]
    pub direccion: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "El responsable no puede superar 100 caracteres"))]
    pub responsable: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "El teléfono no puede superar 20 caracteres"))]
    pub telefono: Option<String>,
    #[serde(default)]
    pub capacidad_m3: Option<Decimal>,
    #[serde(default = "default_active")]
    pub activa: bool,
}

/// Body of `POST /bodegas/cambiar-estado`
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeWarehouseStatusRequest {
    pub id: Uuid,
    pub activa: bool,
}

/// Body of `POST /bodegas/validar-nombre`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateNameRequest {
    pub nombre: String,
    #[serde(default)]
    pub id_excluir: Option<Uuid>,
}

/// Shared checks for create and update
struct WarehouseFields {
    name: String,
    address: Option<String>,
    responsible: Option<String>,
    phone: Option<String>,
    capacity_m3: Option<Decimal>,
}

impl WarehouseFields {
    fn parse(
        nombre: &str,
        direccion: Option<&str>,
        responsable: Option<&str>,
        telefono: Option<&str>,
        capacidad_m3: Option<Decimal>,
    ) -> AppResult<Self> {
        let name = nombre.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(
                "nombre",
                "Name is required",
                "El nombre de la bodega es requerido",
            ));
        }

        let phone = normalize_optional_text(telefono);
        if let Some(phone) = phone.as_deref() {
            validate_phone(phone).map_err(|message| {
                AppError::validation("telefono", message, "El formato del teléfono no es válido")
            })?;
        }

        if let Some(capacity) = capacidad_m3.filter(|c| *c >= Decimal::ZERO) {
            validate_precision(capacity).map_err(|message| {
                AppError::validation("capacidadM3", message, PRECISION_MESSAGE_ES)
            })?;
        }

        validate_capacity(capacidad_m3).map_err(|message| {
            AppError::validation("capacidadM3", message, "La capacidad no puede ser negativa")
        })?;

        Ok(Self {
            name,
            address: normalize_optional_text(direccion),
            responsible: normalize_optional_text(responsable),
            phone,
            capacity_m3: capacidad_m3,
        })
    }
}

pub struct WarehouseService<S> {
    store: S,
    page_size: i64,
    ledger: StockLedger<S>,
    audit: AuditLog<S>,
}

impl<S: InventoryStore> WarehouseService<S> {
    pub fn new(store: S, page_size: i64) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            audit: AuditLog::new(store.clone()),
            store,
            page_size,
        }
    }

    /// Active warehouses by name, each with its stock row count
    pub async fn list_active(&self) -> AppResult<Vec<WarehouseView>> {
        let filter = WarehouseFilter::default();
        let all = PageRequest::normalized(0, 0, self.page_size);
        Ok(self.store.list_warehouses(&filter, all).await?.items)
    }

    pub async fn list_with_filters(&self, filter: WarehouseFilter) -> AppResult<WarehouseListing> {
        let page = filter.page(self.page_size);
        let result = self.store.list_warehouses(&filter, page).await?;

        Ok(WarehouseListing {
            bodegas: result.items,
            total: result.total,
            pagina: page.page,
            elementos_por_pagina: page.per_page,
            total_paginas: page.total_pages(result.total),
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<WarehouseView> {
        let warehouse = self.find(id).await?;
        let rows = self.ledger.list_by_warehouse(id).await?.len() as i64;
        Ok(WarehouseView::new(&warehouse, rows))
    }

    /// Create a warehouse together with a zero stock row for every active product
    pub async fn create(
        &self,
        user_id: Option<Uuid>,
        input: CreateWarehouseRequest,
    ) -> AppResult<WarehouseView> {
        input.validate()?;
        let fields = WarehouseFields::parse(
            &input.nombre,
            input.direccion.as_deref(),
            input.responsable.as_deref(),
            input.telefono.as_deref(),
            input.capacidad_m3,
        )?;

        if self.store.warehouse_name_exists(&fields.name, None).await? {
            return Err(AppError::DuplicateEntry("nombre".to_string()));
        }

        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: fields.name,
            address: fields.address,
            responsible: fields.responsible,
            phone: fields.phone,
            capacity_m3: fields.capacity_m3,
            active: true,
            created_at: now,
            updated_at: None,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_warehouse(&warehouse).await?;
        let seeded = tx.seed_stock_for_warehouse(warehouse.id, now).await?;
        tx.commit().await?;

        tracing::info!(
            "Warehouse {} '{}' created with {} stock rows",
            warehouse.id,
            warehouse.name,
            seeded
        );

        self.audit
            .record(
                user_id,
                MODULE_WAREHOUSES,
                format!("Bodega creada: {}", warehouse.name),
            )
            .await;

        Ok(WarehouseView::new(&warehouse, seeded as i64))
    }

    pub async fn update(
        &self,
        user_id: Option<Uuid>,
        input: UpdateWarehouseRequest,
    ) -> AppResult<WarehouseView> {
        input.validate()?;
        self.find(input.id).await?;
        let fields = WarehouseFields::parse(
            &input.nombre,
            input.direccion.as_deref(),
            input.responsable.as_deref(),
            input.telefono.as_deref(),
            input.capacidad_m3,
        )?;

        if self
            .store
            .warehouse_name_exists(&fields.name, Some(input.id))
            .await?
        {
            return Err(AppError::DuplicateEntry("nombre".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let mut warehouse = lock_for_update(&mut tx, input.id).await?;
        warehouse.name = fields.name;
        warehouse.address = fields.address;
        warehouse.responsible = fields.responsible;
        warehouse.phone = fields.phone;
        warehouse.capacity_m3 = fields.capacity_m3;
        warehouse.active = input.activa;
        warehouse.updated_at = Some(Utc::now());
        tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        tracing::info!("Warehouse {} updated", warehouse.id);

        self.audit
            .record(
                user_id,
                MODULE_WAREHOUSES,
                format!("Bodega actualizada: {}", warehouse.name),
            )
            .await;

        self.get_by_id(warehouse.id).await
    }

    /// Soft delete. Refused while the warehouse still holds stock.
    ///
    /// The warehouse row stays locked while stock is checked, so no entry can
    /// land between the check and the deactivation.
    pub async fn delete(&self, user_id: Option<Uuid>, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let mut warehouse = lock_for_update(&mut tx, id).await?;
        if tx.warehouse_holds_stock(id).await? {
            tracing::warn!("Refusing to delete warehouse {}: it still holds stock", id);
            return Err(AppError::Conflict {
                resource: "bodega".to_string(),
                message: "Cannot delete a warehouse that still holds stock".to_string(),
                message_es: "No se puede eliminar una bodega con productos en stock".to_string(),
            });
        }

        warehouse.active = false;
        warehouse.updated_at = Some(Utc::now());
        tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        tracing::info!("Warehouse {} deactivated", id);

        self.audit
            .record(
                user_id,
                MODULE_WAREHOUSES,
                format!("Bodega eliminada: {}", warehouse.name),
            )
            .await;

        Ok(())
    }

    pub async fn change_status(
        &self,
        user_id: Option<Uuid>,
        input: ChangeWarehouseStatusRequest,
    ) -> AppResult<WarehouseView> {
        let mut tx = self.store.begin().await?;
        let mut warehouse = lock_for_update(&mut tx, input.id).await?;
        warehouse.active = input.activa;
        warehouse.updated_at = Some(Utc::now());
        tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        let state = if input.activa { "activada" } else { "desactivada" };
        tracing::info!("Warehouse {} active={}", warehouse.id, input.activa);

        self.audit
            .record(
                user_id,
                MODULE_WAREHOUSES,
                format!("Bodega {}: {}", state, warehouse.name),
            )
            .await;

        self.get_by_id(warehouse.id).await
    }

    /// Stock rows of the warehouse needing attention, most urgent first
    pub async fn stock_alerts(&self, id: Uuid) -> AppResult<Vec<StockView>> {
        self.find(id).await?;

        let mut alerts: Vec<StockView> = self
            .ledger
            .list_by_warehouse(id)
            .await?
            .into_iter()
            .filter(|s| s.nivel_alerta.is_alert())
            .collect();

        alerts.sort_by(|a, b| {
            a.nivel_alerta
                .urgency()
                .cmp(&b.nivel_alerta.urgency())
                .then_with(|| a.nombre_producto.cmp(&b.nombre_producto))
        });

        Ok(alerts)
    }

    pub async fn name_exists(&self, input: ValidateNameRequest) -> AppResult<bool> {
        self.store
            .warehouse_name_exists(input.nombre.trim(), input.id_excluir)
            .await
    }

    async fn find(&self, id: Uuid) -> AppResult<Warehouse> {
        self.store
            .find_warehouse(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))
    }
}

async fn lock_for_update<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<Warehouse> {
    tx.lock_warehouse(id, LockMode::Update)
        .await?
        .ok_or(AppError::NotFound(Resource::Warehouse))
}
