use std::sync::Arc;

use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod directory;
mod domain;
mod messaging;
mod metrics;
mod storage;
mod utils;

use directory::StaticDirectory;
use domain::order::lifecycle::OrderLifecycle;
use domain::order::model::CreateOrder;
use domain::order::value_objects::{OrderItem, RequesterRole};
use messaging::RedpandaClient;
use storage::{OrderFilter, ScyllaOrderStore};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering.
    // Default to INFO level, can be overridden with RUST_LOG env var.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,delivery_orders=debug")),
        )
        .init();

    tracing::info!("Starting delivery order lifecycle service");

    // === 1. ScyllaDB session and schema ===
    let scylla_node = env_or("SCYLLA_NODE", "127.0.0.1:9042");
    tracing::info!(node = %scylla_node, "Connecting to ScyllaDB");
    let session: Session = SessionBuilder::new().known_node(&scylla_node).build().await?;

    session
        .query_unpaged(
            "CREATE KEYSPACE IF NOT EXISTS delivery_orders WITH REPLICATION = \
             {'class': 'SimpleStrategy', 'replication_factor': 1}",
            &[],
        )
        .await?;
    session.use_keyspace("delivery_orders", false).await?;
    let session = Arc::new(session);

    let store = Arc::new(ScyllaOrderStore::new(session.clone()));
    store.init_schema().await?;

    // === 2. Prometheus metrics ===
    let lifecycle_metrics = Arc::new(metrics::Metrics::new()?);
    let metrics_port: u16 = env_or("METRICS_PORT", "9090").parse()?;
    let metrics_registry = Arc::new(lifecycle_metrics.registry().clone());
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Metrics runtime error: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Redpanda producer ===
    let brokers = env_or("REDPANDA_BROKERS", "127.0.0.1:9092");
    let publisher = Arc::new(RedpandaClient::new(&brokers)?);

    // === 4. Directories (demo: fixed partner and agent) ===
    let partner_id = Uuid::new_v4();
    let agent_id = Uuid::new_v4();
    let directory = Arc::new(
        StaticDirectory::new()
            .with_partner(partner_id, "Golden Wok", "3 Market Square")
            .with_agent(agent_id, "Sam Rider"),
    );

    // === 5. Lifecycle orchestrator ===
    let lifecycle = OrderLifecycle::new(store, publisher, directory.clone(), directory)
        .with_observer(lifecycle_metrics);

    // === 6. Drive a full order lifecycle ===
    let customer_id = Uuid::new_v4();
    let order = lifecycle
        .create(CreateOrder {
            customer_id,
            partner_id,
            delivery_address: "7 Harbour Street".to_string(),
            delivery_fee: 29.0,
            distance: 4.7,
            items: vec![
                OrderItem {
                    food_item_id: Uuid::new_v4(),
                    name: "Spring Rolls".to_string(),
                    quantity: 2,
                    unit_price: 50.0,
                },
                OrderItem {
                    food_item_id: Uuid::new_v4(),
                    name: "Duck Noodles".to_string(),
                    quantity: 1,
                    unit_price: 75.0,
                },
            ],
        })
        .await?;
    tracing::info!(order_id = %order.id, total = order.total_amount, "Order created");

    lifecycle.accept(order.id, 15).await?;
    tracing::info!(order_id = %order.id, "Order accepted");

    lifecycle.set_ready(order.id).await?;
    tracing::info!(order_id = %order.id, "Order ready");

    lifecycle.assign_agent(order.id, agent_id).await?;
    tracing::info!(order_id = %order.id, agent_id = %agent_id, "Agent assigned");

    lifecycle.pickup(order.id).await?;
    tracing::info!(order_id = %order.id, "Order picked up");

    lifecycle.complete_delivery(order.id).await?;
    tracing::info!(order_id = %order.id, "Order delivered");

    let detail = lifecycle
        .get_detail(order.id, customer_id, RequesterRole::Customer)
        .await?;
    tracing::info!(
        order_id = %detail.id,
        status = ?detail.status,
        "Customer view of the finished order"
    );

    let active = lifecycle
        .list_for_customer(customer_id, OrderFilter::active())
        .await?;
    tracing::info!(active_orders = active.len(), "Active orders for customer");

    tracing::info!("Lifecycle demo complete");
    Ok(())
}
