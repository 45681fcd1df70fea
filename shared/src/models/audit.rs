//! Audit trail entries ("bitácora")

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    /// Functional area, e.g. "Inventario" or "Bodegas"
    pub module: String,
    pub action: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: Option<Uuid>,
    pub module: String,
    pub action: String,
}

impl NewAuditEntry {
    pub fn new(user_id: Option<Uuid>, module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id,
            module: module.into(),
            action: action.into(),
        }
    }

    pub fn into_entry(self, id: Uuid, recorded_at: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id,
            user_id: self.user_id,
            module: self.module,
            action: self.action,
            recorded_at,
        }
    }
}
