use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("No batch contains order: {0}")]
    OrderNotInAnyBatch(String),

    #[error("Order {order_id} not found in batch {batch_id}")]
    ItemNotFound { batch_id: String, order_id: String },

    #[error("Product ID mismatch: batch is for {batch_product}, item is for {item_product}")]
    ProductMismatch {
        batch_product: String,
        item_product: String,
    },

    #[error("Cannot transition batch from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Cannot modify items of batch {batch_id} in status {status}")]
    BatchFrozen { batch_id: String, status: String },

    #[error("Invalid temperature range: min {min} must be below max {max}")]
    InvalidTemperatureRange { min: f64, max: f64 },

    #[error("Unrecognized delivery envelope")]
    UnknownEnvelope,

    #[error("Payload decode error: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
