//! Error handling for the Bodega inventory backend
//!
//! Every error leaves through the same envelope as a successful response, with
//! a Spanish `message` for the front end and an English one in `detail`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::StockError;
use thiserror::Error;

/// Entities that can be reported as missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Product,
    Warehouse,
    Movement,
    Stock,
}

impl Resource {
    fn code(&self) -> &'static str {
        match self {
            Resource::Product => "PRODUCT_NOT_FOUND",
            Resource::Warehouse => "WAREHOUSE_NOT_FOUND",
            Resource::Movement => "MOVEMENT_NOT_FOUND",
            Resource::Stock => "STOCK_NOT_FOUND",
        }
    }

    fn name_es(&self) -> &'static str {
        match self {
            Resource::Product => "Producto no encontrado",
            Resource::Warehouse => "Bodega no encontrada",
            Resource::Movement => "Movimiento no encontrado",
            Resource::Stock => "Stock no encontrado",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Product => "Product",
            Resource::Warehouse => "Warehouse",
            Resource::Movement => "Movement",
            Resource::Stock => "Stock",
        };
        f.write_str(name)
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("{0} not found")]
    NotFound(Resource),

    // Business rule errors
    #[error("Warehouse '{name}' is inactive")]
    WarehouseInactive { name: String },

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(
        field: impl Into<String>,
        message: impl Into<String>,
        message_es: impl Into<String>,
    ) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
            message_es: message_es.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::TokenExpired | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::WarehouseInactive { .. }
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            StockError::InvalidQuantity { .. } => AppError::validation(
                "cantidad",
                err.to_string(),
                "La cantidad debe ser mayor a cero",
            ),
            StockError::Overflow { .. } => AppError::validation(
                "cantidad",
                err.to_string(),
                "La cantidad resultante excede el máximo permitido",
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first field alphabetically so the response is stable
        let field_errors = errors.field_errors();
        let first = field_errors.into_iter().min_by_key(|(field, _)| *field);

        match first {
            Some((field, errs)) => {
                let message_es = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("El campo {} no es válido", field));
                AppError::validation(field, format!("Invalid value for {}", field), message_es)
            }
            None => AppError::validation("", "Invalid request", "Solicitud inválida"),
        }
    }
}

/// Error envelope, same shape as a successful `ApiResponse`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub is_success: bool,
    pub message: String,
    pub detail: ErrorDetail,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<Decimal>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            field: None,
            available: None,
            requested: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: ErrorDetail) -> Self {
        Self {
            status_code: status.as_u16(),
            is_success: false,
            message: message.into(),
            detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, detail) = match &self {
            AppError::Unauthorized(msg) => (
                "No autorizado".to_string(),
                ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            ),
            AppError::TokenExpired => (
                "El token ha expirado".to_string(),
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                "Token inválido".to_string(),
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::InsufficientPermissions => (
                "No tiene permisos para realizar esta acción".to_string(),
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                message_es.clone(),
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::DuplicateEntry(field) => (
                format!("Ya existe un registro con ese {}", field),
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field),
            ),
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => (
                message_es.clone(),
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource),
            ),
            AppError::NotFound(resource) => (
                resource.name_es().to_string(),
                ErrorDetail::new(resource.code(), format!("{} not found", resource)),
            ),
            AppError::WarehouseInactive { name } => (
                format!("La bodega '{}' no está activa", name),
                ErrorDetail::new(
                    "WAREHOUSE_INACTIVE",
                    format!("Warehouse '{}' is inactive", name),
                )
                .with_field("idBodega"),
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => {
                let mut detail = ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!(
                        "Insufficient stock: available {}, requested {}",
                        available, requested
                    ),
                )
                .with_field("cantidad");
                detail.available = Some(*available);
                detail.requested = Some(*requested);
                (
                    format!(
                        "Stock insuficiente. Disponible: {}, solicitado: {}",
                        available, requested
                    ),
                    detail,
                )
            }
            AppError::Configuration(_) => (
                "Error de configuración del servidor".to_string(),
                ErrorDetail::new("CONFIGURATION_ERROR", "Server configuration error"),
            ),
            AppError::DatabaseError(_) => (
                "Error al acceder a la base de datos".to_string(),
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                "Error interno del servidor".to_string(),
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse::new(status, message, detail))).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
