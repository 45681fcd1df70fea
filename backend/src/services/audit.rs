//! Best-effort audit trail ("bitácora")

use shared::NewAuditEntry;
use uuid::Uuid;

use crate::store::InventoryStore;

pub const MODULE_INVENTORY: &str = "Inventario";
pub const MODULE_WAREHOUSES: &str = "Bodegas";

/// Writes audit entries after a mutation has committed. A failed write is
/// logged and never reaches the caller.
#[derive(Clone)]
pub struct AuditLog<S> {
    store: S,
}

impl<S: InventoryStore> AuditLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn record(&self, user_id: Option<Uuid>, module: &str, action: impl Into<String>) {
        let entry = NewAuditEntry::new(user_id, module, action);
        if let Err(e) = self.store.insert_audit_entry(entry).await {
            tracing::error!("Failed to write audit entry for module {}: {:?}", module, e);
        }
    }
}
