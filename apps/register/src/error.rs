//! # API Error Type
//!
//! Unified error type for register commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command                                                                │
//! │  Result<T, ApiError>                                                    │
//! │       │                                                                 │
//! │       ├── CoreError::StockExceeded ──► STOCK_EXCEEDED (max_allowed)     │
//! │       ├── CoreError::OutOfStock    ──► OUT_OF_STOCK                     │
//! │       ├── DbError::StockConflict   ──► STOCK_CONFLICT → review cart     │
//! │       ├── DbError::QueryFailed     ──► DATABASE_ERROR (retryable)       │
//! │       └── ConfigError              ──► CONFIG_ERROR                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Serialized for the UI:
//! ```json
//! {
//!   "code": "STOCK_EXCEEDED",
//!   "message": "Not enough stock for Soda 500ml: ...",
//!   "retryable": false,
//!   "maxAllowed": 0
//! }
//! ```

use serde::Serialize;
use tracing::{error, warn};

use crate::state::ConfigError;
use duka_core::{CoreError, ValidationError};
use duka_db::DbError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Whether re-sending the same command may succeed.
    pub retryable: bool,

    /// Largest quantity that would have been accepted, for stock rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    OutOfStock,
    StockExceeded,
    /// Stock moved under a cart at checkout; the cart was kept.
    StockConflict,
    CartError,
    /// Concurrent edit of the same record.
    Conflict,
    DatabaseError,
    ConfigError,
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
            max_allowed: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let message = err.to_string();
        let retryable = err.is_transient();
        let mapped = match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { .. } => ApiError::validation(message),
            DbError::ConstraintViolation { .. } => {
                warn!(%message, "Constraint violation");
                ApiError::validation(message)
            }
            DbError::StockConflict { .. } => ApiError::new(ErrorCode::StockConflict, message),
            DbError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, message),
            DbError::ConnectionFailed(_) | DbError::PoolExhausted | DbError::QueryFailed(_) => {
                error!(%message, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed, please retry")
            }
            DbError::MigrationFailed(_) | DbError::Serialization(_) | DbError::Internal(_) => {
                error!(%message, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        };
        ApiError { retryable, ..mapped }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::OutOfStock { .. } => ApiError {
                max_allowed: Some(0),
                ..ApiError::new(ErrorCode::OutOfStock, message)
            },
            CoreError::StockExceeded { max_allowed, .. } => ApiError {
                max_allowed: Some(max_allowed),
                ..ApiError::new(ErrorCode::StockExceeded, message)
            },
            CoreError::LineNotFound(line_id) => ApiError::not_found("Cart line", &line_id),
            CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, message),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        error!(error = %err, "Configuration error");
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_carries_max_allowed() {
        let err = ApiError::from(CoreError::StockExceeded {
            product: "Soda 500ml".to_string(),
            available: 10,
            reserved: 0,
            requested: 12,
            max_allowed: 0,
        });
        assert_eq!(err.code, ErrorCode::StockExceeded);
        assert_eq!(err.max_allowed, Some(0));
        assert!(err.message.contains("2 short"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "STOCK_EXCEEDED");
        assert_eq!(json["maxAllowed"], 0);
    }

    #[test]
    fn test_db_error_mapping() {
        let conflict = ApiError::from(DbError::StockConflict {
            product: "Soda".to_string(),
        });
        assert_eq!(conflict.code, ErrorCode::StockConflict);
        assert!(!conflict.retryable);

        let transient = ApiError::from(DbError::PoolExhausted);
        assert_eq!(transient.code, ErrorCode::DatabaseError);
        assert!(transient.retryable);

        let missing = ApiError::from(DbError::not_found("Sale", "s-1"));
        assert_eq!(missing.code, ErrorCode::NotFound);
        assert!(serde_json::to_value(&missing).unwrap().get("maxAllowed").is_none());
    }
}
