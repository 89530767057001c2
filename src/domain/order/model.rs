use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::fees;
use super::value_objects::{OrderItem, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================

/// Creation request for a new order. Everything in here is supplied by the
/// customer-facing transport; derived amounts are computed by `Order::place`.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    pub partner_id: Uuid,
    pub delivery_address: String,
    pub delivery_fee: f64,
    pub distance: f64,
    pub items: Vec<OrderItem>,
}

/// Patch applied by a single status transition. Only the fields a transition
/// legitimately touches are present; everything else on the row is immutable.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub estimated_minutes: Option<i32>,
    pub rejection_reason: Option<String>,
}

impl StatusChange {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            estimated_minutes: None,
            rejection_reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub partner_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub delivery_address: String,
    pub distance: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub total_amount: f64,
    pub estimated_minutes: Option<i32>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Validate the request and build a new order in `Placed`, with the
    /// service fee and total derived from the item subtotal.
    pub fn place(request: CreateOrder) -> Result<Self, OrderError> {
        validate_items(&request.items)?;

        let subtotal: f64 = request.items.iter().map(OrderItem::line_total).sum();
        let service_fee = fees::service_fee(subtotal);
        let total_amount = subtotal + service_fee + request.delivery_fee;

        Ok(Self {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            partner_id: request.partner_id,
            agent_id: None,
            status: OrderStatus::Placed,
            items: request.items,
            delivery_address: request.delivery_address,
            distance: request.distance,
            delivery_fee: request.delivery_fee,
            service_fee,
            total_amount,
            estimated_minutes: None,
            rejection_reason: None,
            created_at: Utc::now(),
        })
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Apply a committed status change to an in-memory copy of the row.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        if let Some(minutes) = change.estimated_minutes {
            self.estimated_minutes = Some(minutes);
        }
        if let Some(reason) = &change.rejection_reason {
            self.rejection_reason = Some(reason.clone());
        }
    }
}

fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(item.quantity));
        }
        if item.unit_price < 0.0 {
            return Err(OrderError::InvalidPrice(item.unit_price));
        }
    }

    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, unit_price: f64) -> OrderItem {
        OrderItem {
            food_item_id: Uuid::new_v4(),
            name: "Dumplings".to_string(),
            quantity,
            unit_price,
        }
    }

    fn request(items: Vec<OrderItem>) -> CreateOrder {
        CreateOrder {
            customer_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            delivery_address: "7 Harbour Street".to_string(),
            delivery_fee: 29.0,
            distance: 4.7,
            items,
        }
    }

    #[test]
    fn test_place_derives_fee_and_total() {
        let order = Order::place(request(vec![item(2, 50.0), item(1, 75.0)])).unwrap();

        let expected_fee = 175.0 * (0.06 - 75.0 / 900.0 * 0.03);
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.subtotal(), 175.0);
        assert!((order.service_fee - expected_fee).abs() < 1e-9);
        assert!((order.total_amount - (175.0 + expected_fee + 29.0)).abs() < 1e-9);
        assert!(order.agent_id.is_none());
        assert!(order.estimated_minutes.is_none());
    }

    #[test]
    fn test_place_rejects_empty_items() {
        assert!(matches!(
            Order::place(request(vec![])),
            Err(OrderError::EmptyItems)
        ));
    }

    #[test]
    fn test_place_rejects_non_positive_quantity() {
        assert!(matches!(
            Order::place(request(vec![item(0, 10.0)])),
            Err(OrderError::InvalidQuantity(0))
        ));
        assert!(matches!(
            Order::place(request(vec![item(-2, 10.0)])),
            Err(OrderError::InvalidQuantity(-2))
        ));
    }

    #[test]
    fn test_place_rejects_negative_price() {
        assert!(matches!(
            Order::place(request(vec![item(1, -0.5)])),
            Err(OrderError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_apply_only_touches_transition_fields() {
        let mut order = Order::place(request(vec![item(1, 20.0)])).unwrap();
        let total_before = order.total_amount;

        order.apply(&StatusChange {
            status: OrderStatus::Accepted,
            estimated_minutes: Some(25),
            rejection_reason: None,
        });
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.estimated_minutes, Some(25));

        // A later change without minutes leaves the earlier estimate intact.
        order.apply(&StatusChange::to(OrderStatus::Ready));
        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(order.estimated_minutes, Some(25));
        assert_eq!(order.total_amount, total_before);
    }
}
