use async_trait::async_trait;

pub mod redpanda;

pub use redpanda::RedpandaClient;

// ============================================================================
// Event Publisher Boundary
// ============================================================================
//
// At-least-once delivery to the message broker. The partition key is the
// order id, which keeps every event of one order on one partition and in
// commit order; consumers are expected to be idempotent.
//
// ============================================================================

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> anyhow::Result<()>;
}
