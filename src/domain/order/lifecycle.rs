use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::directory::{AgentDirectory, PartnerDirectory};
use crate::messaging::EventPublisher;
use crate::storage::{AssignOutcome, OrderFilter, OrderStore};
use crate::utils::{retry_with_backoff, RetryConfig, RetryResult};

use super::access;
use super::errors::OrderError;
use super::events::{
    AgentAssigned, EventItem, OrderAccepted, OrderCreated, OrderDelivered, OrderEvent,
    OrderPickedUp, OrderReady, OrderRejected,
};
use super::model::{CreateOrder, Order, StatusChange};
use super::value_objects::{OrderStatus, RequesterRole};

// ============================================================================
// Order Lifecycle - Orchestrator
// ============================================================================
//
// One method per lifecycle operation. Every mutating operation follows the
// same shape: load, guard, conditional write, event, observers, publish.
// The write is the commit point; a publish failure is logged and counted but
// never rolls the committed state back.
//
// ============================================================================

const DEFAULT_REJECT_REASON: &str = "No reason provided";

/// Post-commit hook. Keeps audit/metrics side channels out of the state
/// machine; the lifecycle is fully functional with no observers registered.
pub trait LifecycleObserver: Send + Sync {
    /// A transition has committed (the event may still fail to publish).
    fn on_transition(&self, event: &OrderEvent);

    /// The broker rejected the event after retries.
    fn on_publish_failure(&self, _event: &OrderEvent) {}
}

pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    partners: Arc<dyn PartnerDirectory>,
    agents: Arc<dyn AgentDirectory>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    publish_retry: RetryConfig,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        partners: Arc<dyn PartnerDirectory>,
        agents: Arc<dyn AgentDirectory>,
    ) -> Self {
        Self {
            store,
            publisher,
            partners,
            agents,
            observers: Vec::new(),
            publish_retry: RetryConfig::conservative(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Validate and persist a new order in `Placed`.
    pub async fn create(&self, request: CreateOrder) -> Result<Order, OrderError> {
        let order = Order::place(request)?;
        self.store.insert(&order).await?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            partner_id = %order.partner_id,
            item_count = order.items.len(),
            total_amount = order.total_amount,
            "Order placed"
        );

        self.emit(OrderEvent::Created(OrderCreated {
            order_id: order.id,
            partner_id: order.partner_id,
            created_at: order.created_at,
            distance: order.distance,
            items: EventItem::from_items(&order.items),
        }))
        .await;

        Ok(order)
    }

    /// Partner accepts a placed order and commits to an estimate.
    pub async fn accept(
        &self,
        order_id: Uuid,
        estimated_minutes: i32,
    ) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        require_status(&order, OrderStatus::Placed)?;

        let updated = self
            .transition(
                order_id,
                OrderStatus::Placed,
                StatusChange {
                    status: OrderStatus::Accepted,
                    estimated_minutes: Some(estimated_minutes),
                    rejection_reason: None,
                },
            )
            .await?;

        let (partner_name, partner_address) = self.partner_display(updated.partner_id).await;

        tracing::info!(order_id = %order_id, estimated_minutes, "Order accepted");

        self.emit(OrderEvent::Accepted(OrderAccepted {
            order_id,
            customer_id: updated.customer_id,
            partner_name,
            partner_address,
            delivery_address: updated.delivery_address.clone(),
            delivery_fee: updated.delivery_fee,
            distance: updated.distance,
            estimated_minutes,
            timestamp: Utc::now(),
            items: EventItem::from_items(&updated.items),
        }))
        .await;

        Ok(updated)
    }

    /// Partner rejects a placed order. The reason is stripped of CR/LF
    /// before it is stored or published.
    pub async fn reject(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        require_status(&order, OrderStatus::Placed)?;

        let reason = sanitize_reason(reason);

        let updated = self
            .transition(
                order_id,
                OrderStatus::Placed,
                StatusChange {
                    status: OrderStatus::Rejected,
                    estimated_minutes: None,
                    rejection_reason: Some(reason.clone()),
                },
            )
            .await?;

        tracing::info!(order_id = %order_id, reason = %reason, "Order rejected");

        self.emit(OrderEvent::Rejected(OrderRejected {
            order_id,
            customer_id: updated.customer_id,
            reason,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(updated)
    }

    /// Partner marks an accepted order as ready for pickup.
    pub async fn set_ready(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        require_status(&order, OrderStatus::Accepted)?;

        let updated = self
            .transition(
                order_id,
                OrderStatus::Accepted,
                StatusChange::to(OrderStatus::Ready),
            )
            .await?;

        let (partner_name, partner_address) = self.partner_display(updated.partner_id).await;

        tracing::info!(order_id = %order_id, "Order ready for pickup");

        self.emit(OrderEvent::Ready(OrderReady {
            order_id,
            customer_id: updated.customer_id,
            partner_name,
            partner_address,
            agent_id: updated.agent_id,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(updated)
    }

    /// Claim an order for a delivery agent. The store-level compare-and-swap
    /// admits exactly one winner per order; losers are told apart from
    /// plain misuse by the distinct outcome.
    pub async fn assign_agent(&self, order_id: Uuid, agent_id: Uuid) -> Result<Order, OrderError> {
        match self.store.try_assign_agent(order_id, agent_id).await? {
            AssignOutcome::Assigned(order) => {
                let (partner_name, partner_address) = self.partner_display(order.partner_id).await;

                tracing::info!(order_id = %order_id, agent_id = %agent_id, "Agent assigned");

                self.emit(OrderEvent::AgentAssigned(AgentAssigned {
                    order_id,
                    partner_id: order.partner_id,
                    agent_id,
                    partner_name,
                    partner_address,
                    delivery_address: order.delivery_address.clone(),
                    delivery_fee: order.delivery_fee,
                    items: EventItem::from_items(&order.items),
                    timestamp: Utc::now(),
                }))
                .await;

                Ok(order)
            }
            AssignOutcome::AlreadyAssigned => {
                tracing::warn!(order_id = %order_id, agent_id = %agent_id, "Assignment race lost");
                Err(OrderError::AgentAlreadyAssigned)
            }
            AssignOutcome::InvalidStatus(current) => Err(OrderError::InvalidStatus { current }),
            AssignOutcome::NotFound => Err(OrderError::NotFound(order_id)),
        }
    }

    /// Assigned agent picks the order up at the partner.
    pub async fn pickup(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        require_status(&order, OrderStatus::Ready)?;
        let agent_id = order.agent_id.ok_or(OrderError::NoAgentAssigned)?;

        let updated = self
            .transition(
                order_id,
                OrderStatus::Ready,
                StatusChange::to(OrderStatus::PickedUp),
            )
            .await?;

        let agent_name = self.agent_display(agent_id).await;

        tracing::info!(order_id = %order_id, agent_id = %agent_id, "Order picked up");

        self.emit(OrderEvent::PickedUp(OrderPickedUp {
            order_id,
            partner_id: updated.partner_id,
            customer_id: updated.customer_id,
            agent_name,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(updated)
    }

    /// Assigned agent hands the order to the customer. Terminal.
    pub async fn complete_delivery(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        require_status(&order, OrderStatus::PickedUp)?;
        if order.agent_id.is_none() {
            return Err(OrderError::NoAgentAssigned);
        }

        let updated = self
            .transition(
                order_id,
                OrderStatus::PickedUp,
                StatusChange::to(OrderStatus::Delivered),
            )
            .await?;

        tracing::info!(order_id = %order_id, "Order delivered");

        self.emit(OrderEvent::Delivered(OrderDelivered {
            order_id,
            customer_id: updated.customer_id,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Full projection of one order, gated by ownership.
    pub async fn get_detail(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
        role: RequesterRole,
    ) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        if !access::can_access(&order, requester_id, role) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_by_customer(customer_id, filter).await?)
    }

    pub async fn list_for_partner(
        &self,
        partner_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_by_partner(partner_id, filter).await?)
    }

    pub async fn list_for_agent(
        &self,
        agent_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_by_agent(agent_id, filter).await?)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn load(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.store
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Conditional write; a miss means the row moved (or vanished) between
    /// our read and the write, and is reported from the row's fresh state.
    async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> Result<Order, OrderError> {
        match self.store.apply_transition(order_id, from, change).await? {
            Some(updated) => Ok(updated),
            None => match self.store.get(order_id).await? {
                Some(current) => Err(OrderError::InvalidStatus {
                    current: current.status,
                }),
                None => Err(OrderError::NotFound(order_id)),
            },
        }
    }

    async fn partner_display(&self, partner_id: Uuid) -> (String, String) {
        match self.partners.partner(partner_id).await {
            Ok(Some(partner)) => (partner.name, partner.address),
            Ok(None) => {
                tracing::warn!(partner_id = %partner_id, "Partner not found, event degraded");
                (String::new(), String::new())
            }
            Err(error) => {
                tracing::warn!(partner_id = %partner_id, error = %error, "Partner lookup failed, event degraded");
                (String::new(), String::new())
            }
        }
    }

    async fn agent_display(&self, agent_id: Uuid) -> String {
        match self.agents.agent(agent_id).await {
            Ok(Some(agent)) => agent.name,
            Ok(None) => {
                tracing::warn!(agent_id = %agent_id, "Agent not found, event degraded");
                String::new()
            }
            Err(error) => {
                tracing::warn!(agent_id = %agent_id, error = %error, "Agent lookup failed, event degraded");
                String::new()
            }
        }
    }

    /// Notify observers of the committed transition, then publish. The state
    /// change is already durable here; a publish failure leaves a gap the
    /// downstream consumers must tolerate (at-least-once, not exactly-once).
    async fn emit(&self, event: OrderEvent) {
        for observer in &self.observers {
            observer.on_transition(&event);
        }

        let payload = match event.payload_json() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(
                    order_id = %event.order_id(),
                    event_type = event.event_type(),
                    error = %error,
                    "Event serialization failed, nothing published"
                );
                for observer in &self.observers {
                    observer.on_publish_failure(&event);
                }
                return;
            }
        };

        let key = event.key();
        let outcome = retry_with_backoff(self.publish_retry.clone(), |_attempt| {
            self.publisher.publish(event.topic(), &key, &payload)
        })
        .await;

        if let RetryResult::Failed(error) = outcome {
            tracing::error!(
                order_id = %event.order_id(),
                topic = event.topic(),
                error = %error,
                "Event publish failed, state change stays committed"
            );
            for observer in &self.observers {
                observer.on_publish_failure(&event);
            }
        }
    }
}

fn require_status(order: &Order, expected: OrderStatus) -> Result<(), OrderError> {
    if order.status != expected {
        return Err(OrderError::InvalidStatus {
            current: order.status,
        });
    }
    Ok(())
}

fn sanitize_reason(reason: Option<String>) -> String {
    match reason {
        Some(raw) => raw.chars().filter(|c| *c != '\r' && *c != '\n').collect(),
        None => DEFAULT_REJECT_REASON.to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
