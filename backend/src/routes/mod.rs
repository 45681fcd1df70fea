//! Route definitions for the Bodega inventory backend

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{config::Config, handlers, middleware::auth_middleware, store::InventoryStore, AppState};

/// Create API routes. Every route requires a bearer token.
pub fn api_routes<S: InventoryStore>(config: Arc<Config>) -> Router<AppState<S>> {
    Router::new()
        .nest("/movimientos", movement_routes())
        .nest("/stock", stock_routes())
        .nest("/bodegas", warehouse_routes())
        .route_layer(middleware::from_fn_with_state(config, auth_middleware))
}

/// Inventory movement routes
fn movement_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/listar",
            get(handlers::movement::list_all::<S>).post(handlers::movement::list_with_filters::<S>),
        )
        .route("/obtener", post(handlers::movement::get_by_id::<S>))
        .route("/entrada", post(handlers::movement::register_entry::<S>))
        .route("/salida", post(handlers::movement::register_exit::<S>))
        .route("/producto/:id", get(handlers::movement::list_by_product::<S>))
        .route("/bodega/:id", get(handlers::movement::list_by_warehouse::<S>))
}

/// Stock query routes
fn stock_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/listar",
            get(handlers::stock::list_all::<S>).post(handlers::stock::list_with_filters::<S>),
        )
        .route("/obtener", post(handlers::stock::get_by_id::<S>))
        .route(
            "/producto-bodega",
            post(handlers::stock::get_by_product_and_warehouse::<S>),
        )
        .route("/alertas", get(handlers::stock::low_stock_alerts::<S>))
        .route("/bodega/:id", get(handlers::stock::list_by_warehouse::<S>))
        .route("/producto/:id", get(handlers::stock::list_by_product::<S>))
}

/// Warehouse routes
fn warehouse_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/listar",
            get(handlers::warehouse::list_active::<S>)
                .post(handlers::warehouse::list_with_filters::<S>),
        )
        .route("/obtener", post(handlers::warehouse::get_by_id::<S>))
        .route("/crear", post(handlers::warehouse::create::<S>))
        .route("/actualizar", post(handlers::warehouse::update::<S>))
        .route("/eliminar", post(handlers::warehouse::delete::<S>))
        .route("/cambiar-estado", post(handlers::warehouse::change_status::<S>))
        .route("/validar-nombre", post(handlers::warehouse::validate_name::<S>))
        .route("/:id/alertas", get(handlers::warehouse::stock_alerts::<S>))
}
