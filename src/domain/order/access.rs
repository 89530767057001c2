use uuid::Uuid;

use super::model::Order;
use super::value_objects::RequesterRole;

// ============================================================================
// Access Guard
// ============================================================================
//
// Ownership predicate for read access to an order. Each role maps to exactly
// one owner field on the order; an unknown role is a denial, not an error.
//
// ============================================================================

pub fn can_access(order: &Order, requester_id: Uuid, role: RequesterRole) -> bool {
    match role {
        RequesterRole::Customer => order.customer_id == requester_id,
        RequesterRole::Partner => order.partner_id == requester_id,
        RequesterRole::Agent => order.agent_id == Some(requester_id),
        RequesterRole::Unknown => false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::model::{CreateOrder, Order};
    use crate::domain::order::value_objects::OrderItem;

    fn sample_order(customer_id: Uuid, partner_id: Uuid, agent_id: Option<Uuid>) -> Order {
        let mut order = Order::place(CreateOrder {
            customer_id,
            partner_id,
            delivery_address: "12 Curry Lane".to_string(),
            delivery_fee: 10.0,
            distance: 3.2,
            items: vec![OrderItem {
                food_item_id: Uuid::new_v4(),
                name: "Biryani".to_string(),
                quantity: 1,
                unit_price: 14.0,
            }],
        })
        .unwrap();
        order.agent_id = agent_id;
        order
    }

    #[test]
    fn test_each_role_matches_only_its_owner_field() {
        let customer = Uuid::new_v4();
        let partner = Uuid::new_v4();
        let agent = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let order = sample_order(customer, partner, Some(agent));

        assert!(can_access(&order, customer, RequesterRole::Customer));
        assert!(can_access(&order, partner, RequesterRole::Partner));
        assert!(can_access(&order, agent, RequesterRole::Agent));

        // Right id, wrong role.
        assert!(!can_access(&order, customer, RequesterRole::Partner));
        assert!(!can_access(&order, partner, RequesterRole::Agent));
        assert!(!can_access(&order, agent, RequesterRole::Customer));

        // Unrelated requester is denied under every role.
        assert!(!can_access(&order, stranger, RequesterRole::Customer));
        assert!(!can_access(&order, stranger, RequesterRole::Partner));
        assert!(!can_access(&order, stranger, RequesterRole::Agent));
    }

    #[test]
    fn test_agent_role_denied_before_assignment() {
        let agent = Uuid::new_v4();
        let order = sample_order(Uuid::new_v4(), Uuid::new_v4(), None);
        assert!(!can_access(&order, agent, RequesterRole::Agent));
    }

    #[test]
    fn test_unknown_role_is_denied_even_for_owners() {
        let customer = Uuid::new_v4();
        let order = sample_order(customer, Uuid::new_v4(), None);
        assert!(!can_access(&order, customer, RequesterRole::Unknown));
    }
}
