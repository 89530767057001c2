use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::model::{Order, StatusChange};
use crate::domain::order::value_objects::OrderStatus;

use super::{AssignOutcome, OrderFilter, OrderStore, StoreError};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Map behind an async RwLock; the conditional writes hold the write guard
// across check and mutation, which gives them the same exactly-one-winner
// semantics as the database-backed store.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list_matching<F>(&self, filter: OrderFilter, owner: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let orders = self.orders.read().await;
        let mut matches: Vec<Order> = orders
            .values()
            .filter(|order| owner(order) && filter.matches(order))
            .cloned()
            .collect();
        matches.sort_by_key(|order| order.created_at);
        matches
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn apply_transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> Result<Option<Order>, StoreError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.apply(&change);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn try_assign_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&order_id) else {
            return Ok(AssignOutcome::NotFound);
        };

        if order.agent_id.is_some() {
            return Ok(AssignOutcome::AlreadyAssigned);
        }
        if !matches!(order.status, OrderStatus::Accepted | OrderStatus::Ready) {
            return Ok(AssignOutcome::InvalidStatus(order.status));
        }

        order.agent_id = Some(agent_id);
        Ok(AssignOutcome::Assigned(order.clone()))
    }

    async fn list_by_customer(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .list_matching(filter, |order| order.customer_id == customer_id)
            .await)
    }

    async fn list_by_partner(
        &self,
        partner_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .list_matching(filter, |order| order.partner_id == partner_id)
            .await)
    }

    async fn list_by_agent(
        &self,
        agent_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .list_matching(filter, |order| order.agent_id == Some(agent_id))
            .await)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::model::CreateOrder;
    use crate::domain::order::value_objects::OrderItem;

    fn placed_order(customer_id: Uuid, partner_id: Uuid) -> Order {
        Order::place(CreateOrder {
            customer_id,
            partner_id,
            delivery_address: "1 Test Road".to_string(),
            delivery_fee: 15.0,
            distance: 2.0,
            items: vec![OrderItem {
                food_item_id: Uuid::new_v4(),
                name: "Falafel Wrap".to_string(),
                quantity: 1,
                unit_price: 8.0,
            }],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let store = MemoryOrderStore::new();
        let order = placed_order(Uuid::new_v4(), Uuid::new_v4());

        store.insert(&order).await.unwrap();
        let loaded = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, order.id);
        assert_eq!(loaded.status, OrderStatus::Placed);

        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_transition_requires_source_status() {
        let store = MemoryOrderStore::new();
        let order = placed_order(Uuid::new_v4(), Uuid::new_v4());
        store.insert(&order).await.unwrap();

        // Wrong source state writes nothing.
        let missed = store
            .apply_transition(
                order.id,
                OrderStatus::Accepted,
                StatusChange::to(OrderStatus::Ready),
            )
            .await
            .unwrap();
        assert!(missed.is_none());
        assert_eq!(
            store.get(order.id).await.unwrap().unwrap().status,
            OrderStatus::Placed
        );

        let updated = store
            .apply_transition(
                order.id,
                OrderStatus::Placed,
                StatusChange {
                    status: OrderStatus::Accepted,
                    estimated_minutes: Some(20),
                    rejection_reason: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Accepted);
        assert_eq!(updated.estimated_minutes, Some(20));
    }

    #[tokio::test]
    async fn test_assign_agent_cas_admits_one_winner() {
        let store = MemoryOrderStore::new();
        let mut order = placed_order(Uuid::new_v4(), Uuid::new_v4());
        order.status = OrderStatus::Accepted;
        store.insert(&order).await.unwrap();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        match store.try_assign_agent(order.id, first).await.unwrap() {
            AssignOutcome::Assigned(updated) => assert_eq!(updated.agent_id, Some(first)),
            other => panic!("expected Assigned, got {other:?}"),
        }
        assert!(matches!(
            store.try_assign_agent(order.id, second).await.unwrap(),
            AssignOutcome::AlreadyAssigned
        ));
        assert_eq!(
            store.get(order.id).await.unwrap().unwrap().agent_id,
            Some(first)
        );
    }

    #[tokio::test]
    async fn test_assign_agent_outcomes_for_missing_and_wrong_status() {
        let store = MemoryOrderStore::new();
        assert!(matches!(
            store.try_assign_agent(Uuid::new_v4(), Uuid::new_v4()).await.unwrap(),
            AssignOutcome::NotFound
        ));

        let order = placed_order(Uuid::new_v4(), Uuid::new_v4());
        store.insert(&order).await.unwrap();
        assert!(matches!(
            store.try_assign_agent(order.id, Uuid::new_v4()).await.unwrap(),
            AssignOutcome::InvalidStatus(OrderStatus::Placed)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_owner_and_active() {
        let store = MemoryOrderStore::new();
        let customer = Uuid::new_v4();

        let open = placed_order(customer, Uuid::new_v4());
        let mut closed = placed_order(customer, Uuid::new_v4());
        closed.status = OrderStatus::Delivered;
        let foreign = placed_order(Uuid::new_v4(), Uuid::new_v4());

        store.insert(&open).await.unwrap();
        store.insert(&closed).await.unwrap();
        store.insert(&foreign).await.unwrap();

        let all = store
            .list_by_customer(customer, OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let active = store
            .list_by_customer(customer, OrderFilter::active())
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);
    }
}
