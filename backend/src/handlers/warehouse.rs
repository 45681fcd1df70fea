//! HTTP handlers for warehouse endpoints (`/bodegas`)

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{IdRequest, StockView, WarehouseFilter, WarehouseListing, WarehouseView};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser, Role};
use crate::response::ApiResponse;
use crate::services::warehouse::{
    ChangeWarehouseStatusRequest, CreateWarehouseRequest, UpdateWarehouseRequest,
    ValidateNameRequest,
};
use crate::services::WarehouseService;
use crate::store::InventoryStore;
use crate::AppState;

const READERS: [Role; 3] = [Role::Administrador, Role::Bodega, Role::Vendedor];
const MANAGERS: [Role; 2] = [Role::Administrador, Role::Bodega];

fn service<S: InventoryStore>(state: AppState<S>) -> WarehouseService<S> {
    WarehouseService::new(state.store, state.config.inventory.warehouse_page_size)
}

/// Active warehouses
pub async fn list_active<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<WarehouseView>>> {
    require_role(&user, &READERS)?;
    let warehouses = service(state).list_active().await?;
    Ok(ApiResponse::ok("Bodegas obtenidas correctamente", warehouses))
}

pub async fn list_with_filters<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(filter): Json<WarehouseFilter>,
) -> AppResult<ApiResponse<WarehouseListing>> {
    require_role(&user, &READERS)?;
    let listing = service(state).list_with_filters(filter).await?;
    Ok(ApiResponse::ok("Bodegas obtenidas correctamente", listing))
}

pub async fn get_by_id<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<IdRequest>,
) -> AppResult<ApiResponse<WarehouseView>> {
    require_role(&user, &READERS)?;
    let warehouse = service(state).get_by_id(input.id).await?;
    Ok(ApiResponse::ok("Bodega obtenida correctamente", warehouse))
}

pub async fn create<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateWarehouseRequest>,
) -> AppResult<ApiResponse<WarehouseView>> {
    require_role(&user, &MANAGERS)?;
    let warehouse = service(state).create(Some(user.user_id), input).await?;
    Ok(ApiResponse::created("Bodega creada correctamente", warehouse))
}

pub async fn update<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateWarehouseRequest>,
) -> AppResult<ApiResponse<WarehouseView>> {
    require_role(&user, &MANAGERS)?;
    let warehouse = service(state).update(Some(user.user_id), input).await?;
    Ok(ApiResponse::ok("Bodega actualizada correctamente", warehouse))
}

/// Soft delete
pub async fn delete<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<IdRequest>,
) -> AppResult<ApiResponse<bool>> {
    require_role(&user, &[Role::Administrador])?;
    service(state).delete(Some(user.user_id), input.id).await?;
    Ok(ApiResponse::ok("Bodega eliminada correctamente", true))
}

pub async fn change_status<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ChangeWarehouseStatusRequest>,
) -> AppResult<ApiResponse<WarehouseView>> {
    require_role(&user, &MANAGERS)?;
    let warehouse = service(state)
        .change_status(Some(user.user_id), input)
        .await?;
    Ok(ApiResponse::ok("Estado de la bodega actualizado", warehouse))
}

/// `detail` is true when the name is already taken
pub async fn validate_name<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ValidateNameRequest>,
) -> AppResult<ApiResponse<bool>> {
    require_role(&user, &MANAGERS)?;
    let exists = service(state).name_exists(input).await?;
    let message = if exists {
        "El nombre ya está en uso"
    } else {
        "El nombre está disponible"
    };
    Ok(ApiResponse::ok(message, exists))
}

pub async fn stock_alerts<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<StockView>>> {
    require_role(&user, &READERS)?;
    let alerts = service(state).stock_alerts(warehouse_id).await?;
    Ok(ApiResponse::ok("Alertas de la bodega obtenidas correctamente", alerts))
}
