use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Single line of an order. Fixed at creation time, never mutated afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub food_item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Accepted,
    Rejected,
    Ready,
    PickedUp,
    Delivered,
}

impl OrderStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Ready => "Ready",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Placed" => Some(OrderStatus::Placed),
            "Accepted" => Some(OrderStatus::Accepted),
            "Rejected" => Some(OrderStatus::Rejected),
            "Ready" => Some(OrderStatus::Ready),
            "PickedUp" => Some(OrderStatus::PickedUp),
            "Delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    pub fn all() -> [OrderStatus; 6] {
        [
            OrderStatus::Placed,
            OrderStatus::Accepted,
            OrderStatus::Rejected,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
        ]
    }
}

/// Role a requester claims when reading an order. Anything the transport
/// hands us that is not one of the three known roles collapses to `Unknown`,
/// which every access check denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequesterRole {
    Customer,
    Partner,
    Agent,
    Unknown,
}

impl RequesterRole {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "Customer" => RequesterRole::Customer,
            "Partner" => RequesterRole::Partner,
            "Agent" => RequesterRole::Agent,
            _ => RequesterRole::Unknown,
        }
    }
}

// Unknown roles must deserialize to a denial, never to an error.
impl<'de> Deserialize<'de> for RequesterRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(RequesterRole::from_raw(&raw))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            food_item_id: Uuid::new_v4(),
            name: "Margherita".to_string(),
            quantity: 3,
            unit_price: 12.5,
        };
        assert_eq!(item.line_total(), 37.5);
    }

    #[test]
    fn test_order_item_serialization() {
        let item = OrderItem {
            food_item_id: Uuid::new_v4(),
            name: "Pad Thai".to_string(),
            quantity: 2,
            unit_price: 9.0,
        };

        let json = serde_json::to_string(&item).unwrap();
        let deserialized: OrderItem = serde_json::from_str(&json).unwrap();

        assert_eq!(item, deserialized);
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in OrderStatus::all() {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("Shipped"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Placed.is_terminal());
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
        assert!(!OrderStatus::PickedUp.is_terminal());
    }

    #[test]
    fn test_unknown_role_fallback() {
        assert_eq!(RequesterRole::from_raw("Customer"), RequesterRole::Customer);
        assert_eq!(RequesterRole::from_raw("Partner"), RequesterRole::Partner);
        assert_eq!(RequesterRole::from_raw("Agent"), RequesterRole::Agent);
        assert_eq!(RequesterRole::from_raw("Admin"), RequesterRole::Unknown);
        assert_eq!(RequesterRole::from_raw(""), RequesterRole::Unknown);
    }

    #[test]
    fn test_unknown_role_deserializes_from_any_string() {
        let role: RequesterRole = serde_json::from_str("\"SuperUser\"").unwrap();
        assert_eq!(role, RequesterRole::Unknown);
    }
}
