//! HTTP API tests
//!
//! Drives the full router (auth layer, handlers, error envelope) over the
//! in-memory store.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bodega_inventory_backend::middleware::auth::Claims;
use bodega_inventory_backend::{create_app, AppState, Config, MemoryStore};
use common::{dec, Fixture};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use shared::{MovementView, StockView};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

fn token(user_id: Uuid, roles: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        name: "Ana Torres".to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        exp: now + 3600,
        iat: now,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn app(store: MemoryStore) -> Router {
    create_app(AppState::new(store, Config::for_tests(SECRET)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn movement_body(fx: &Fixture, quantity: u32) -> Value {
    json!({
        "idProducto": fx.product.id,
        "idBodega": fx.warehouse.id,
        "cantidad": quantity,
        "referencia": "OC-7",
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let (status, body) = send(
        app(MemoryStore::new()),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let request = Request::builder()
        .uri("/api/v1/stock/listar")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(MemoryStore::new()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["detail"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_bad_signature_is_invalid_token() {
    let forged = {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "Intruso".to_string(),
            roles: vec!["Administrador".to_string()],
            exp: now + 3600,
            iat: now,
            iss: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap()
    };

    let (status, body) = send(
        app(MemoryStore::new()),
        get("/api/v1/stock/listar", &forged),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_entry_returns_created_envelope() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Bodega"]);

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/entrada", &bearer, movement_body(&fx, 5)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["isSuccess"], true);

    let movement: MovementView = serde_json::from_value(body["detail"].clone()).unwrap();
    assert_eq!(movement.cantidad, dec("5"));
    assert_eq!(movement.id_usuario, Some(fx.user_id));
    assert_eq!(movement.nombre_usuario.as_deref(), Some("Ana Torres"));
    assert_eq!(movement.referencia.as_deref(), Some("OC-7"));
    assert_eq!(fx.quantity().await, dec("5"));
}

#[tokio::test]
async fn test_seller_cannot_register_entry() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Vendedor"]);

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/entrada", &bearer, movement_body(&fx, 5)),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(fx.store.movement_count().await, 0);
}

#[tokio::test]
async fn test_point_of_sale_exit_and_insufficient_stock() {
    let fx = Fixture::new("0").await.with_stock("3", "0").await;
    let bearer = token(fx.user_id, &["Punto de venta"]);

    let (status, _) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/salida", &bearer, movement_body(&fx, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/salida", &bearer, movement_body(&fx, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["detail"]["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["detail"]["available"], "1");
    assert_eq!(body["detail"]["requested"], "2");
    assert_eq!(fx.quantity().await, dec("1"));
}

#[tokio::test]
async fn test_validation_error_names_the_field() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Administrador"]);

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/entrada", &bearer, movement_body(&fx, 0)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["detail"]["field"], "cantidad");
}

#[tokio::test]
async fn test_oversized_quantity_is_a_validation_error() {
    let fx = Fixture::new("0").await.with_stock("1", "0").await;
    let bearer = token(fx.user_id, &["Administrador"]);

    for quantity in ["79228162514264337593543950335", "0.0001"] {
        let body = json!({
            "idProducto": fx.product.id,
            "idBodega": fx.warehouse.id,
            "cantidad": quantity,
        });

        let (status, body) = send(
            app(fx.store.clone()),
            post("/api/v1/movimientos/entrada", &bearer, body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "cantidad {}", quantity);
        assert_eq!(body["detail"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["detail"]["field"], "cantidad");
    }

    assert_eq!(fx.quantity().await, dec("1"));
    assert_eq!(fx.store.movement_count().await, 0);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Administrador"]);
    let body = json!({
        "idProducto": Uuid::new_v4(),
        "idBodega": fx.warehouse.id,
        "cantidad": 1,
    });

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/entrada", &bearer, body),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"]["code"], "PRODUCT_NOT_FOUND");
}

#[tokio::test]
async fn test_stock_lookup_by_pair() {
    let fx = Fixture::new("10").await.with_stock("12", "10").await;
    let bearer = token(fx.user_id, &["Vendedor"]);
    let body = json!({ "idProducto": fx.product.id, "idBodega": fx.warehouse.id });

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/stock/producto-bodega", &bearer, body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"]["nivelAlerta"], "BAJO");
    let view: StockView = serde_json::from_value(body["detail"].clone()).unwrap();
    assert_eq!(view.cantidad_disponible, dec("12"));
}

#[tokio::test]
async fn test_movement_listing_rejects_unknown_type() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Bodega"]);

    let (status, body) = send(
        app(fx.store.clone()),
        post("/api/v1/movimientos/listar", &bearer, json!({ "tipo": "Robo" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"]["field"], "tipo");
}

#[tokio::test]
async fn test_movements_by_product_path() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Bodega"]);
    let app = app(fx.store.clone());

    send(
        app.clone(),
        post("/api/v1/movimientos/entrada", &bearer, movement_body(&fx, 4)),
    )
    .await;

    let (status, body) = send(
        app,
        get(&format!("/api/v1/movimientos/producto/{}", fx.product.id), &bearer),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_warehouse_create_and_duplicate() {
    let fx = Fixture::new("0").await;
    let bearer = token(fx.user_id, &["Administrador"]);
    let app = app(fx.store.clone());

    let (status, body) = send(
        app.clone(),
        post(
            "/api/v1/bodegas/crear",
            &bearer,
            json!({ "nombre": "Bodega Sur", "capacidadM3": 120 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["detail"]["nombre"], "Bodega Sur");
    assert_eq!(body["detail"]["totalProductos"], 1);

    let (status, body) = send(
        app.clone(),
        post("/api/v1/bodegas/crear", &bearer, json!({ "nombre": "bodega sur" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"]["code"], "DUPLICATE_ENTRY");

    let (status, body) = send(
        app,
        post(
            "/api/v1/bodegas/validar-nombre",
            &bearer,
            json!({ "nombre": "BODEGA SUR" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], true);
}

#[tokio::test]
async fn test_only_admin_deletes_warehouses() {
    let fx = Fixture::new("0").await;
    let app = app(fx.store.clone());
    let body = json!({ "id": fx.warehouse.id });

    let (status, _) = send(
        app.clone(),
        post("/api/v1/bodegas/eliminar", &token(fx.user_id, &["Bodega"]), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app,
        post("/api/v1/bodegas/eliminar", &token(fx.user_id, &["Administrador"]), body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], true);
}
