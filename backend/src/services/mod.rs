//! Business logic services for the Bodega inventory backend

pub mod audit;
pub mod inventory;
pub mod ledger;
pub mod movement;
pub mod warehouse;

pub use audit::AuditLog;
pub use inventory::{InventoryService, RegisterMovementRequest};
pub use ledger::StockLedger;
pub use movement::MovementRecorder;
pub use warehouse::WarehouseService;
