use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::OrderItem;

// ============================================================================
// Order Lifecycle Events
// ============================================================================
//
// One event per accepted transition, published to its own topic and keyed by
// the order id so consumers observe per-order history in commit order. Field
// names are camelCase on the wire; timestamps serialize as RFC 3339 UTC with
// a trailing `Z`.
//
// ============================================================================

/// Item projection carried by events. Downstream consumers only need the
/// display name and count, not prices.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventItem {
    pub name: String,
    pub quantity: i32,
}

impl EventItem {
    pub fn from_items(items: &[OrderItem]) -> Vec<Self> {
        items
            .iter()
            .map(|item| Self {
                name: item.name.clone(),
                quantity: item.quantity,
            })
            .collect()
    }
}

/// Base trait for all order lifecycle events.
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn topic(&self) -> &'static str;
    fn order_id(&self) -> Uuid;
    fn timestamp(&self) -> DateTime<Utc>;
}

macro_rules! domain_event {
    ($event:ty, $event_type:literal, $topic:literal, $ts:ident) => {
        impl DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn topic(&self) -> &'static str {
                $topic
            }

            fn order_id(&self) -> Uuid {
                self.order_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.$ts
            }
        }
    };
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub distance: f64,
    pub items: Vec<EventItem>,
}

domain_event!(OrderCreated, "OrderCreated", "order-created", created_at);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderAccepted {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub partner_name: String,
    pub partner_address: String,
    pub delivery_address: String,
    pub delivery_fee: f64,
    pub distance: f64,
    pub estimated_minutes: i32,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<EventItem>,
}

domain_event!(OrderAccepted, "OrderAccepted", "order-accepted", timestamp);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderRejected {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

domain_event!(OrderRejected, "OrderRejected", "order-rejected", timestamp);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderReady {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub partner_name: String,
    pub partner_address: String,
    pub agent_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

domain_event!(OrderReady, "OrderReady", "order-ready", timestamp);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AgentAssigned {
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub agent_id: Uuid,
    pub partner_name: String,
    pub partner_address: String,
    pub delivery_address: String,
    pub delivery_fee: f64,
    pub items: Vec<EventItem>,
    pub timestamp: DateTime<Utc>,
}

domain_event!(AgentAssigned, "AgentAssigned", "agent-assigned", timestamp);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderPickedUp {
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub customer_id: Uuid,
    pub agent_name: String,
    pub timestamp: DateTime<Utc>,
}

domain_event!(OrderPickedUp, "OrderPickedUp", "order-picked-up", timestamp);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderDelivered {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

domain_event!(OrderDelivered, "OrderDelivered", "order-delivered", timestamp);

/// Union of all order lifecycle events.
#[derive(Clone, Debug)]
pub enum OrderEvent {
    Created(OrderCreated),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Ready(OrderReady),
    AgentAssigned(AgentAssigned),
    PickedUp(OrderPickedUp),
    Delivered(OrderDelivered),
}

impl OrderEvent {
    fn inner(&self) -> &dyn DomainEvent {
        match self {
            OrderEvent::Created(e) => e,
            OrderEvent::Accepted(e) => e,
            OrderEvent::Rejected(e) => e,
            OrderEvent::Ready(e) => e,
            OrderEvent::AgentAssigned(e) => e,
            OrderEvent::PickedUp(e) => e,
            OrderEvent::Delivered(e) => e,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.inner().event_type()
    }

    pub fn topic(&self) -> &'static str {
        self.inner().topic()
    }

    pub fn order_id(&self) -> Uuid {
        self.inner().order_id()
    }

    /// Partition key: per-order ordering hinges on every event of an order
    /// carrying the same key.
    pub fn key(&self) -> String {
        self.order_id().to_string()
    }

    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            OrderEvent::Created(e) => serde_json::to_string(e),
            OrderEvent::Accepted(e) => serde_json::to_string(e),
            OrderEvent::Rejected(e) => serde_json::to_string(e),
            OrderEvent::Ready(e) => serde_json::to_string(e),
            OrderEvent::AgentAssigned(e) => serde_json::to_string(e),
            OrderEvent::PickedUp(e) => serde_json::to_string(e),
            OrderEvent::Delivered(e) => serde_json::to_string(e),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
