use uuid::Uuid;

use super::value_objects::OrderStatus;
use crate::storage::StoreError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================
//
// Returned as values so transports can map each variant deterministically to
// a response; only storage failures are opaque.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Operation not allowed while order is {current:?}")]
    InvalidStatus { current: OrderStatus },

    #[error("An agent is already assigned to this order")]
    AgentAlreadyAssigned,

    #[error("No agent assigned to this order")]
    NoAgentAssigned,

    #[error("Requester does not own this order")]
    Forbidden,

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid item price: {0}")]
    InvalidPrice(f64),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
