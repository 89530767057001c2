use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::model::{Order, StatusChange};
use crate::domain::order::value_objects::OrderStatus;

pub mod memory;
pub mod scylla;

pub use self::memory::MemoryOrderStore;
pub use self::scylla::ScyllaOrderStore;

// ============================================================================
// Order Store - Persistence Boundary
// ============================================================================
//
// Writes that move an order through its lifecycle are conditional: they only
// apply while the row is still in the expected source state. Backends
// translate a failed condition into `None` / the assignment outcomes rather
// than overwriting, so a lost race is always observable by the caller.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Corrupt stored order {order_id}: {detail}")]
    Corrupt { order_id: Uuid, detail: String },
}

/// Outcome of the agent-assignment compare-and-swap.
#[derive(Debug)]
pub enum AssignOutcome {
    /// The caller won the race; the returned row has `agent_id` set.
    Assigned(Order),
    /// Another assignment already holds the order.
    AlreadyAssigned,
    /// The order left the assignable states before the write landed.
    InvalidStatus(OrderStatus),
    NotFound,
}

/// Filter for owner-scoped list queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    /// Exclude terminal statuses (Delivered, Rejected).
    pub active_only: bool,
    /// Inclusive creation-time window.
    pub placed_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl OrderFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            placed_between: None,
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        if self.active_only && order.status.is_terminal() {
            return false;
        }
        if let Some((from, to)) = self.placed_between {
            if order.created_at < from || order.created_at > to {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a freshly placed order.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Apply `change` only if the row is still in `from`. `Ok(None)` means
    /// the row is gone or moved off `from` concurrently; nothing was written.
    async fn apply_transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> Result<Option<Order>, StoreError>;

    /// Compare-and-swap `agent_id` from null, admissible only while the order
    /// is Accepted or Ready. Exactly one concurrent caller can win.
    async fn try_assign_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError>;

    async fn list_by_customer(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError>;

    async fn list_by_partner(
        &self,
        partner_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError>;

    async fn list_by_agent(
        &self,
        agent_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::model::CreateOrder;
    use crate::domain::order::value_objects::OrderItem;
    use chrono::Duration;

    fn order() -> Order {
        Order::place(CreateOrder {
            customer_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            delivery_address: "1 Test Road".to_string(),
            delivery_fee: 10.0,
            distance: 1.0,
            items: vec![OrderItem {
                food_item_id: Uuid::new_v4(),
                name: "Soup".to_string(),
                quantity: 1,
                unit_price: 6.0,
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_filter_date_window_is_inclusive() {
        let order = order();
        let window = (
            order.created_at - Duration::minutes(5),
            order.created_at + Duration::minutes(5),
        );

        let inside = OrderFilter {
            active_only: false,
            placed_between: Some(window),
        };
        assert!(inside.matches(&order));

        let exact = OrderFilter {
            active_only: false,
            placed_between: Some((order.created_at, order.created_at)),
        };
        assert!(exact.matches(&order));

        let past = OrderFilter {
            active_only: false,
            placed_between: Some((
                order.created_at - Duration::hours(2),
                order.created_at - Duration::hours(1),
            )),
        };
        assert!(!past.matches(&order));
    }

    #[test]
    fn test_active_filter_drops_terminal_orders() {
        let mut order = order();
        assert!(OrderFilter::active().matches(&order));

        order.status = OrderStatus::Rejected;
        assert!(!OrderFilter::active().matches(&order));
        assert!(OrderFilter::default().matches(&order));
    }
}
