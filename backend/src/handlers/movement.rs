//! HTTP handlers for inventory movement endpoints (`/movimientos`)

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{IdRequest, MovementFilter, MovementListing, MovementView};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser, Role};
use crate::response::ApiResponse;
use crate::services::{InventoryService, RegisterMovementRequest};
use crate::store::InventoryStore;
use crate::AppState;

fn service<S: InventoryStore>(state: AppState<S>) -> InventoryService<S> {
    InventoryService::new(state.store, state.config.inventory.clone())
}

/// List every movement, newest first
pub async fn list_all<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<MovementView>>> {
    require_role(&user, &[Role::Administrador, Role::Bodega])?;
    let movements = service(state).get_all().await?;
    Ok(ApiResponse::ok("Movimientos obtenidos correctamente", movements))
}

/// Filtered, paged listing
pub async fn list_with_filters<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(filter): Json<MovementFilter>,
) -> AppResult<ApiResponse<MovementListing>> {
    require_role(&user, &[Role::Administrador, Role::Bodega, Role::Vendedor])?;
    let listing = service(state).get_with_filters(filter).await?;
    Ok(ApiResponse::ok("Movimientos obtenidos correctamente", listing))
}

pub async fn get_by_id<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<IdRequest>,
) -> AppResult<ApiResponse<MovementView>> {
    require_role(&user, &[Role::Administrador, Role::Bodega, Role::Vendedor])?;
    let movement = service(state).get_by_id(input.id).await?;
    Ok(ApiResponse::ok("Movimiento obtenido correctamente", movement))
}

/// Register a stock entry
pub async fn register_entry<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RegisterMovementRequest>,
) -> AppResult<ApiResponse<MovementView>> {
    require_role(&user, &[Role::Administrador, Role::Bodega])?;
    let movement = service(state)
        .register_entry(Some(user.user_id), input)
        .await?;
    Ok(ApiResponse::created("Entrada registrada correctamente", movement))
}

/// Register a stock exit
pub async fn register_exit<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RegisterMovementRequest>,
) -> AppResult<ApiResponse<MovementView>> {
    require_role(&user, &[Role::Administrador, Role::Bodega, Role::PuntoDeVenta])?;
    let movement = service(state)
        .register_exit(Some(user.user_id), input)
        .await?;
    Ok(ApiResponse::created("Salida registrada correctamente", movement))
}

pub async fn list_by_product<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<MovementView>>> {
    require_role(&user, &[Role::Administrador, Role::Bodega, Role::Vendedor])?;
    let movements = service(state).get_by_product(product_id).await?;
    Ok(ApiResponse::ok("Movimientos obtenidos correctamente", movements))
}

pub async fn list_by_warehouse<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<MovementView>>> {
    require_role(&user, &[Role::Administrador, Role::Bodega])?;
    let movements = service(state).get_by_warehouse(warehouse_id).await?;
    Ok(ApiResponse::ok("Movimientos obtenidos correctamente", movements))
}
