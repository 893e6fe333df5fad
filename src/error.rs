use crate::domain::attempt::{AttemptStatus, PaymentMethod};
use crate::domain::status::OrderStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Duplicate attempt for order {order_id}: {reason}")]
    DuplicateAttempt { order_id: u32, reason: String },
    #[error("Attempt {attempt_id} was already decided ({status})")]
    AlreadyDecided {
        attempt_id: u64,
        status: AttemptStatus,
    },
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Unknown status code: {0}")]
    UnknownStatusCode(String),
    #[error("Concurrent update on order {order_id}, retry")]
    ConcurrencyConflict { order_id: u32 },
    #[error("Unknown payment method: {0}")]
    UnknownMethod(String),
    #[error("Attempt {0} not found")]
    AttemptNotFound(u64),
    #[error("Order {0} not found")]
    OrderNotFound(u32),
    #[error("Order {0} already exists")]
    OrderExists(u32),
    #[error("Status registry is inconsistent: {0}")]
    Registry(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Only lost races on an order are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::ConcurrencyConflict { .. })
    }

    pub(crate) fn duplicate(order_id: u32, method: PaymentMethod, reason: &str) -> Self {
        PaymentError::DuplicateAttempt {
            order_id,
            reason: format!("{reason} ({method})"),
        }
    }
}
