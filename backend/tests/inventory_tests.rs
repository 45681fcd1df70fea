//! Inventory movement tests
//!
//! Entries and exits through `InventoryService` against the in-memory store:
//! - stock creation on first entry
//! - exit boundaries and the non-negative invariant
//! - inactive warehouses and missing references
//! - concurrent exits against one stock row

mod common;

use std::sync::Arc;

use bodega_inventory_backend::config::InventoryConfig;
use bodega_inventory_backend::services::InventoryService;
use bodega_inventory_backend::{AppError, MemoryStore};
use common::{dec, settings, Fixture};
use rust_decimal::Decimal;
use shared::{AlertLevel, MovementType};
use uuid::Uuid;

fn service(store: &MemoryStore) -> InventoryService<MemoryStore> {
    InventoryService::new(store.clone(), settings())
}

// ============================================================================
// Entries
// ============================================================================

#[cfg(test)]
mod entry_tests {
    use super::*;

    /// First entry for a pair creates the stock row with the product minimum
    #[tokio::test]
    async fn test_entry_creates_stock_row() {
        let fx = Fixture::new("3").await;
        assert!(fx.store.stock_row(fx.product.id, fx.warehouse.id).await.is_none());

        let view = service(&fx.store)
            .register_entry(Some(fx.user_id), fx.request("5"))
            .await
            .unwrap();

        assert_eq!(view.tipo, MovementType::Entrada);
        assert_eq!(view.cantidad, dec("5"));
        assert_eq!(view.tipo_referencia.as_deref(), Some("Compra"));
        assert_eq!(view.nombre_usuario.as_deref(), Some("Ana Torres"));
        assert_eq!(view.codigo_producto, "PROD-00001");
        assert_eq!(view.nombre_bodega, "Bodega Central");

        let row = fx
            .store
            .stock_row(fx.product.id, fx.warehouse.id)
            .await
            .unwrap();
        assert_eq!(row.quantity, dec("5"));
        assert_eq!(row.minimum_quantity, dec("3"));
        assert!(row.last_entry_at.is_some());
        assert!(row.last_exit_at.is_none());
    }

    #[tokio::test]
    async fn test_entry_adds_to_existing_stock() {
        let fx = Fixture::new("0").await.with_stock("7.5", "2").await;

        service(&fx.store)
            .register_entry(Some(fx.user_id), fx.request("2.25"))
            .await
            .unwrap();

        assert_eq!(fx.quantity().await, dec("9.75"));
    }

    #[tokio::test]
    async fn test_entry_keeps_price_note_and_reference() {
        let fx = Fixture::new("0").await;
        let mut request = fx.request("4");
        request.precio_unitario = Some(dec("12.50"));
        request.observacion = Some("Pedido semanal".to_string());
        request.referencia = Some("FAC-001".to_string());

        let view = service(&fx.store)
            .register_entry(None, request)
            .await
            .unwrap();

        assert_eq!(view.precio_unitario, Some(dec("12.50")));
        assert_eq!(view.observacion.as_deref(), Some("Pedido semanal"));
        assert_eq!(view.referencia.as_deref(), Some("FAC-001"));
        assert!(view.id_usuario.is_none());
        assert!(view.nombre_usuario.is_none());
    }

    /// Entry into an inactive warehouse writes nothing
    #[tokio::test]
    async fn test_entry_into_inactive_warehouse_is_rejected() {
        let fx = Fixture::new("0").await;
        let closed = common::warehouse("Bodega Norte", false);
        fx.store.insert_warehouse(closed.clone()).await;

        let err = service(&fx.store)
            .register_entry(
                Some(fx.user_id),
                common::movement_request(fx.product.id, closed.id, "5"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::WarehouseInactive { ref name } if name == "Bodega Norte"));
        assert_eq!(fx.store.movement_count().await, 0);
        assert!(fx.store.stock_row(fx.product.id, closed.id).await.is_none());
    }

    #[tokio::test]
    async fn test_entry_for_unknown_product_is_not_found() {
        let fx = Fixture::new("0").await;

        let err = service(&fx.store)
            .register_entry(
                None,
                common::movement_request(Uuid::new_v4(), fx.warehouse.id, "5"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.store.movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_entry_for_inactive_product_is_not_found() {
        let fx = Fixture::new("0").await;
        let mut retired = common::product("PROD-00002", "Arena", "0");
        retired.active = false;
        fx.store.insert_product(retired.clone()).await;

        let err = service(&fx.store)
            .register_entry(
                None,
                common::movement_request(retired.id, fx.warehouse.id, "5"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_entry_for_unknown_warehouse_is_not_found() {
        let fx = Fixture::new("0").await;

        let err = service(&fx.store)
            .register_entry(
                None,
                common::movement_request(fx.product.id, Uuid::new_v4(), "5"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_entry_rejects_non_positive_quantity() {
        let fx = Fixture::new("0").await;

        for quantity in ["0", "-1"] {
            let err = service(&fx.store)
                .register_entry(None, fx.request(quantity))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::Validation { ref field, .. } if field == "cantidad"),
                "quantity {} should be rejected",
                quantity
            );
        }
        assert_eq!(fx.store.movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_entry_rejects_negative_price_and_long_reference() {
        let fx = Fixture::new("0").await;

        let mut request = fx.request("1");
        request.precio_unitario = Some(dec("-0.01"));
        let err = service(&fx.store)
            .register_entry(None, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "precioUnitario"));

        let mut request = fx.request("1");
        request.referencia = Some("R".repeat(51));
        let err = service(&fx.store)
            .register_entry(None, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "referencia"));
    }

    /// A quantity past the column range fails validation instead of
    /// overflowing the stock arithmetic
    #[tokio::test]
    async fn test_entry_of_huge_quantity_is_rejected() {
        let fx = Fixture::new("0").await.with_stock("1", "0").await;
        let mut request = fx.request("1");
        request.cantidad = Decimal::MAX;

        let inventory = service(&fx.store);
        let outcome = tokio::spawn(async move { inventory.register_entry(None, request).await })
            .await
            .expect("entry task should not panic");

        let err = outcome.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "cantidad"));
        assert_eq!(fx.quantity().await, dec("1"));
        assert_eq!(fx.store.movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_entry_that_would_overflow_stock_is_rolled_back() {
        let fx = Fixture::new("0")
            .await
            .with_stock("9999999999999999.50", "0")
            .await;

        let err = service(&fx.store)
            .register_entry(None, fx.request("0.50"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "cantidad"));
        assert_eq!(fx.quantity().await, dec("9999999999999999.50"));
        assert_eq!(fx.store.movement_count().await, 0);

        service(&fx.store)
            .register_entry(None, fx.request("0.49"))
            .await
            .unwrap();
        assert_eq!(fx.quantity().await, dec("9999999999999999.99"));
    }

    /// Amounts are kept to two decimals, so finer values are refused rather
    /// than rounded on the way to the database
    #[tokio::test]
    async fn test_entry_rejects_more_than_two_decimals() {
        let fx = Fixture::new("0").await;

        let err = service(&fx.store)
            .register_entry(None, fx.request("0.0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "cantidad"));

        let mut request = fx.request("1");
        request.precio_unitario = Some(dec("1.005"));
        let err = service(&fx.store)
            .register_entry(None, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "precioUnitario"));

        assert_eq!(fx.store.movement_count().await, 0);
        assert!(fx.store.stock_row(fx.product.id, fx.warehouse.id).await.is_none());

        service(&fx.store)
            .register_entry(None, fx.request("1.500"))
            .await
            .unwrap();
        assert_eq!(fx.quantity().await, dec("1.5"));
    }

    #[tokio::test]
    async fn test_entry_writes_audit_entry() {
        let fx = Fixture::new("0").await;

        service(&fx.store)
            .register_entry(Some(fx.user_id), fx.request("5"))
            .await
            .unwrap();

        let audit = fx.store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].user_id, Some(fx.user_id));
        assert_eq!(audit[0].module, "Inventario");
        assert!(audit[0].action.contains("PROD-00001"));
    }
}

// ============================================================================
// Exits
// ============================================================================

#[cfg(test)]
mod exit_tests {
    use super::*;

    /// 20 on hand, minimum 10, exit 8 leaves 12 which is BAJO
    #[tokio::test]
    async fn test_exit_reduces_stock_and_reclassifies() {
        let fx = Fixture::new("10").await.with_stock("20", "10").await;
        let inventory = service(&fx.store);

        let view = inventory
            .register_exit(Some(fx.user_id), fx.request("8"))
            .await
            .unwrap();
        assert_eq!(view.tipo, MovementType::Salida);
        assert_eq!(view.tipo_referencia.as_deref(), Some("Venta"));

        let row = fx
            .store
            .stock_row(fx.product.id, fx.warehouse.id)
            .await
            .unwrap();
        assert_eq!(row.quantity, dec("12"));
        assert_eq!(row.available(), dec("12"));
        assert_eq!(row.alert_level(), AlertLevel::Bajo);
        assert!(row.last_exit_at.is_some());
    }

    #[tokio::test]
    async fn test_exit_of_exact_availability_empties_stock() {
        let fx = Fixture::new("0").await.with_stock("6", "2").await;

        service(&fx.store)
            .register_exit(None, fx.request("6"))
            .await
            .unwrap();

        let row = fx
            .store
            .stock_row(fx.product.id, fx.warehouse.id)
            .await
            .unwrap();
        assert_eq!(row.quantity, Decimal::ZERO);
        assert_eq!(row.alert_level(), AlertLevel::SinStock);
    }

    #[tokio::test]
    async fn test_exit_above_availability_leaves_stock_untouched() {
        let fx = Fixture::new("0").await.with_stock("6", "2").await;

        let err = service(&fx.store)
            .register_exit(None, fx.request("7"))
            .await
            .unwrap_err();

        match err {
            AppError::InsufficientStock {
                available,
                requested,
            } => {
                assert_eq!(available, dec("6"));
                assert_eq!(requested, dec("7"));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        assert_eq!(fx.quantity().await, dec("6"));
        assert_eq!(fx.store.movement_count().await, 0);
        assert!(fx.store.audit_entries().await.is_empty());
    }

    /// Reserved units are not available for exit
    #[tokio::test]
    async fn test_exit_respects_reserved_quantity() {
        let fx = Fixture::new("0").await;
        fx.store
            .set_stock(fx.product.id, fx.warehouse.id, dec("10"), dec("0"), dec("4"))
            .await;

        let err = service(&fx.store)
            .register_exit(None, fx.request("7"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available, .. } if available == dec("6")
        ));

        service(&fx.store)
            .register_exit(None, fx.request("6"))
            .await
            .unwrap();
        assert_eq!(fx.quantity().await, dec("4"));
    }

    #[tokio::test]
    async fn test_exit_without_stock_row_reports_zero_available() {
        let fx = Fixture::new("0").await;

        let err = service(&fx.store)
            .register_exit(None, fx.request("1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientStock { available, .. } if available == Decimal::ZERO
        ));
        assert!(fx.store.stock_row(fx.product.id, fx.warehouse.id).await.is_none());
    }

    #[tokio::test]
    async fn test_exit_from_inactive_warehouse_follows_setting() {
        let fx = Fixture::new("0").await;
        let mut closed = common::warehouse("Bodega Sur", true);
        fx.store.insert_warehouse(closed.clone()).await;
        fx.store
            .set_stock(fx.product.id, closed.id, dec("5"), dec("0"), dec("0"))
            .await;
        closed.active = false;
        fx.store.insert_warehouse(closed.clone()).await;

        let strict = InventoryService::new(
            fx.store.clone(),
            InventoryConfig {
                require_active_warehouse_on_exit: true,
                ..InventoryConfig::default()
            },
        );
        let err = strict
            .register_exit(None, common::movement_request(fx.product.id, closed.id, "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WarehouseInactive { .. }));

        service(&fx.store)
            .register_exit(None, common::movement_request(fx.product.id, closed.id, "1"))
            .await
            .unwrap();
        assert_eq!(
            fx.store
                .stock_row(fx.product.id, closed.id)
                .await
                .unwrap()
                .quantity,
            dec("4")
        );
    }

    /// Entry then exit of the same amount restores the starting quantity
    #[tokio::test]
    async fn test_entry_then_exit_round_trip() {
        let fx = Fixture::new("0").await.with_stock("3", "0").await;
        let inventory = service(&fx.store);

        inventory.register_entry(None, fx.request("4.5")).await.unwrap();
        inventory.register_exit(None, fx.request("4.5")).await.unwrap();

        assert_eq!(fx.quantity().await, dec("3"));
        assert_eq!(fx.store.movement_count().await, 2);

        let history = inventory.get_by_product(fx.product.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].tipo, MovementType::Salida);
        assert_eq!(history[1].tipo, MovementType::Entrada);
    }

    #[tokio::test]
    async fn test_get_by_id_unknown_movement() {
        let fx = Fixture::new("0").await;
        let err = service(&fx.store)
            .get_by_id(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    async fn run_concurrent_exits(on_hand: u32, exits: u32) -> (usize, usize, Decimal) {
        let fx = Fixture::new("0").await;
        fx.store
            .set_stock(
                fx.product.id,
                fx.warehouse.id,
                Decimal::from(on_hand),
                Decimal::ZERO,
                Decimal::ZERO,
            )
            .await;

        let inventory = Arc::new(service(&fx.store));
        let handles: Vec<_> = (0..exits)
            .map(|_| {
                let inventory = inventory.clone();
                let request = fx.request("1");
                tokio::spawn(async move { inventory.register_exit(None, request).await })
            })
            .collect();

        let mut succeeded = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        (succeeded, rejected, fx.quantity().await)
    }

    /// More exits than stock: exactly `on_hand` succeed and stock ends at zero
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exits_never_oversell() {
        let (succeeded, rejected, remaining) = run_concurrent_exits(10, 25).await;

        assert_eq!(succeeded, 10);
        assert_eq!(rejected, 15);
        assert_eq!(remaining, Decimal::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exits_below_stock_all_succeed() {
        let (succeeded, rejected, remaining) = run_concurrent_exits(30, 12).await;

        assert_eq!(succeeded, 12);
        assert_eq!(rejected, 0);
        assert_eq!(remaining, Decimal::from(18));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entries_and_exits_balance() {
        let fx = Fixture::new("0").await.with_stock("5", "0").await;
        let inventory = Arc::new(service(&fx.store));

        let mut handles = Vec::new();
        for i in 0..20 {
            let inventory = inventory.clone();
            let request = fx.request("1");
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    inventory.register_entry(None, request).await
                } else {
                    inventory.register_exit(None, request).await
                }
            }));
        }

        let mut exits_ok = 0;
        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap();
            if i % 2 == 0 {
                assert!(result.is_ok());
            } else if result.is_ok() {
                exits_ok += 1;
            }
        }

        let expected = Decimal::from(5 + 10 - exits_ok);
        assert_eq!(fx.quantity().await, expected);
        assert!(fx.quantity().await >= Decimal::ZERO);
    }
}
