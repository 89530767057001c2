mod server;

use prometheus::{IntCounterVec, Opts, Registry};

pub use server::start_metrics_server;

use crate::domain::order::events::OrderEvent;
use crate::domain::order::lifecycle::LifecycleObserver;

// ============================================================================
// Metrics - Prometheus counters for the order lifecycle
// ============================================================================
//
// Wired as a LifecycleObserver so the state machine itself carries no
// metrics calls; counters move only after a transition has committed.
//
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub transitions_committed: IntCounterVec,
    pub events_publish_failed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transitions_committed = IntCounterVec::new(
            Opts::new(
                "order_transitions_committed_total",
                "Committed order lifecycle transitions",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(transitions_committed.clone()))?;

        let events_publish_failed = IntCounterVec::new(
            Opts::new(
                "order_events_publish_failed_total",
                "Lifecycle events that could not be published to the broker",
            ),
            &["topic"],
        )?;
        registry.register(Box::new(events_publish_failed.clone()))?;

        Ok(Self {
            registry,
            transitions_committed,
            events_publish_failed,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl LifecycleObserver for Metrics {
    fn on_transition(&self, event: &OrderEvent) {
        self.transitions_committed
            .with_label_values(&[event.event_type()])
            .inc();
    }

    fn on_publish_failure(&self, event: &OrderEvent) {
        self.events_publish_failed
            .with_label_values(&[event.topic()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_observer_moves_counters() {
        let metrics = Metrics::new().unwrap();
        let event = OrderEvent::Delivered(crate::domain::order::events::OrderDelivered {
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });

        metrics.on_transition(&event);
        metrics.on_transition(&event);
        metrics.on_publish_failure(&event);

        assert_eq!(
            metrics
                .transitions_committed
                .with_label_values(&["OrderDelivered"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .events_publish_failed
                .with_label_values(&["order-delivered"])
                .get(),
            1
        );
    }
}
