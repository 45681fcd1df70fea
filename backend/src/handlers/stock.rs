//! HTTP handlers for stock queries (`/stock`)

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{IdRequest, ProductWarehouseRequest, StockFilter, StockListing, StockView};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser, Role};
use crate::response::ApiResponse;
use crate::services::StockLedger;
use crate::store::InventoryStore;
use crate::AppState;

pub async fn list_all<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<StockView>>> {
    require_role(&user, &Role::ALL)?;
    let stock = StockLedger::new(state.store).list_all().await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", stock))
}

pub async fn list_with_filters<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(filter): Json<StockFilter>,
) -> AppResult<ApiResponse<StockListing>> {
    require_role(&user, &Role::ALL)?;
    let page_size = state.config.inventory.stock_page_size;
    let listing = StockLedger::new(state.store)
        .list_with_filters(filter, page_size)
        .await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", listing))
}

pub async fn get_by_id<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<IdRequest>,
) -> AppResult<ApiResponse<StockView>> {
    require_role(&user, &Role::ALL)?;
    let stock = StockLedger::new(state.store).get_by_id(input.id).await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", stock))
}

pub async fn get_by_product_and_warehouse<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProductWarehouseRequest>,
) -> AppResult<ApiResponse<StockView>> {
    require_role(&user, &Role::ALL)?;
    let stock = StockLedger::new(state.store)
        .get_by_product_and_warehouse(input.id_producto, input.id_bodega)
        .await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", stock))
}

/// Rows at or below their minimum, most urgent first
pub async fn low_stock_alerts<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<StockView>>> {
    require_role(&user, &[Role::Administrador, Role::Bodega])?;
    let stock = StockLedger::new(state.store).list_low_stock().await?;
    Ok(ApiResponse::ok("Alertas de stock obtenidas correctamente", stock))
}

pub async fn list_by_warehouse<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<StockView>>> {
    require_role(&user, &Role::ALL)?;
    let stock = StockLedger::new(state.store)
        .list_by_warehouse(warehouse_id)
        .await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", stock))
}

pub async fn list_by_product<S: InventoryStore>(
    State(state): State<AppState<S>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<StockView>>> {
    require_role(&user, &Role::ALL)?;
    let stock = StockLedger::new(state.store)
        .list_by_product(product_id)
        .await?;
    Ok(ApiResponse::ok("Stock obtenido correctamente", stock))
}
