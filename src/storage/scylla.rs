use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla::response::query_result::QueryResult;
use scylla::value::{CqlValue, Row};
use uuid::Uuid;

use crate::domain::order::model::{Order, StatusChange};
use crate::domain::order::value_objects::{OrderItem, OrderStatus};

use super::{AssignOutcome, OrderFilter, OrderStore, StoreError};

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// One row per order. Lifecycle writes are lightweight transactions
// conditioned on the current row state; a condition that does not hold
// leaves the row untouched and the `[applied]` flag tells the caller.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, customer_id, partner_id, agent_id, status, items, \
     delivery_address, distance, delivery_fee, service_fee, total_amount, \
     estimated_minutes, rejection_reason, created_at";

type OrderRow = (
    Uuid,
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    String,
    String,
    f64,
    f64,
    f64,
    f64,
    Option<i32>,
    Option<String>,
    DateTime<Utc>,
);

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Create the orders table and owner indexes. Idempotent.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        self.session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS orders (
                    id uuid PRIMARY KEY,
                    customer_id uuid,
                    partner_id uuid,
                    agent_id uuid,
                    status text,
                    items text,
                    delivery_address text,
                    distance double,
                    delivery_fee double,
                    service_fee double,
                    total_amount double,
                    estimated_minutes int,
                    rejection_reason text,
                    created_at timestamp
                )",
                &[],
            )
            .await
            .map_err(backend)?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS orders_by_customer ON orders (customer_id)",
            "CREATE INDEX IF NOT EXISTS orders_by_partner ON orders (partner_id)",
            "CREATE INDEX IF NOT EXISTS orders_by_agent ON orders (agent_id)",
        ] {
            self.session
                .query_unpaged(statement, &[])
                .await
                .map_err(backend)?;
        }

        tracing::info!("Orders schema ready");
        Ok(())
    }

    async fn list_where(
        &self,
        cql: &str,
        owner_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        let result = self
            .session
            .query_unpaged(cql, (owner_id,))
            .await
            .map_err(backend)?;

        let mut orders = Vec::new();

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(orders), // No rows
        };

        for row in rows_result.rows::<OrderRow>().map_err(backend)? {
            let order = decode_row(row.map_err(backend)?)?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }

        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let items_json = serde_json::to_string(&order.items).map_err(backend)?;

        self.session
            .query_unpaged(
                "INSERT INTO orders (id, customer_id, partner_id, agent_id, status, items, \
                 delivery_address, distance, delivery_fee, service_fee, total_amount, \
                 estimated_minutes, rejection_reason, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    order.id,
                    order.customer_id,
                    order.partner_id,
                    order.agent_id,
                    order.status.as_str(),
                    items_json,
                    order.delivery_address.as_str(),
                    order.distance,
                    order.delivery_fee,
                    order.service_fee,
                    order.total_amount,
                    order.estimated_minutes,
                    order.rejection_reason.as_deref(),
                    order.created_at,
                ),
            )
            .await
            .map_err(backend)?;

        tracing::debug!(order_id = %order.id, "Inserted order row");
        Ok(())
    }

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let result = self
            .session
            .query_unpaged(
                format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"),
                (order_id,),
            )
            .await
            .map_err(backend)?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None), // No rows
        };

        match rows_result.maybe_first_row::<OrderRow>().map_err(backend)? {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    async fn apply_transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        change: StatusChange,
    ) -> Result<Option<Order>, StoreError> {
        let Some(mut order) = self.get(order_id).await? else {
            return Ok(None);
        };
        if order.status != from {
            return Ok(None);
        }

        // The conditioned update is the authority; the pre-read above only
        // exists so the caller gets the full row back on success.
        let result = match (&change.estimated_minutes, &change.rejection_reason) {
            (Some(minutes), _) => {
                self.session
                    .query_unpaged(
                        "UPDATE orders SET status = ?, estimated_minutes = ? \
                         WHERE id = ? IF status = ?",
                        (change.status.as_str(), *minutes, order_id, from.as_str()),
                    )
                    .await
            }
            (_, Some(reason)) => {
                self.session
                    .query_unpaged(
                        "UPDATE orders SET status = ?, rejection_reason = ? \
                         WHERE id = ? IF status = ?",
                        (change.status.as_str(), reason.as_str(), order_id, from.as_str()),
                    )
                    .await
            }
            _ => {
                self.session
                    .query_unpaged(
                        "UPDATE orders SET status = ? WHERE id = ? IF status = ?",
                        (change.status.as_str(), order_id, from.as_str()),
                    )
                    .await
            }
        }
        .map_err(backend)?;

        if !applied_flag(result)? {
            return Ok(None);
        }

        order.apply(&change);
        Ok(Some(order))
    }

    async fn try_assign_agent(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<AssignOutcome, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "UPDATE orders SET agent_id = ? WHERE id = ? \
                 IF agent_id = null AND status IN ('Accepted', 'Ready')",
                (agent_id, order_id),
            )
            .await
            .map_err(backend)?;

        if applied_flag(result)? {
            return match self.get(order_id).await? {
                Some(order) => Ok(AssignOutcome::Assigned(order)),
                None => Ok(AssignOutcome::NotFound),
            };
        }

        // Not applied: read the row back to tell the loser why.
        match self.get(order_id).await? {
            None => Ok(AssignOutcome::NotFound),
            Some(order) if order.agent_id.is_some() => Ok(AssignOutcome::AlreadyAssigned),
            Some(order) => Ok(AssignOutcome::InvalidStatus(order.status)),
        }
    }

    async fn list_by_customer(
        &self,
        customer_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        self.list_where(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?"),
            customer_id,
            filter,
        )
        .await
    }

    async fn list_by_partner(
        &self,
        partner_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        self.list_where(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE partner_id = ?"),
            partner_id,
            filter,
        )
        .await
    }

    async fn list_by_agent(
        &self,
        agent_id: Uuid,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        self.list_where(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE agent_id = ?"),
            agent_id,
            filter,
        )
        .await
    }
}

fn backend<E: std::fmt::Display>(error: E) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Read the `[applied]` flag of a lightweight-transaction result. The row
/// shape differs between applied and not-applied responses, so only the
/// first column is inspected.
fn applied_flag(result: QueryResult) -> Result<bool, StoreError> {
    let rows_result = result.into_rows_result().map_err(backend)?;
    let row = rows_result.maybe_first_row::<Row>().map_err(backend)?;

    match row.and_then(|row| row.columns.into_iter().next().flatten()) {
        Some(CqlValue::Boolean(applied)) => Ok(applied),
        other => Err(StoreError::Backend(format!(
            "Conditional update returned no [applied] column: {other:?}"
        ))),
    }
}

fn decode_row(row: OrderRow) -> Result<Order, StoreError> {
    let (
        id,
        customer_id,
        partner_id,
        agent_id,
        status,
        items_json,
        delivery_address,
        distance,
        delivery_fee,
        service_fee,
        total_amount,
        estimated_minutes,
        rejection_reason,
        created_at,
    ) = row;

    let status = OrderStatus::parse(&status).ok_or_else(|| StoreError::Corrupt {
        order_id: id,
        detail: format!("unknown status {status:?}"),
    })?;

    let items: Vec<OrderItem> =
        serde_json::from_str(&items_json).map_err(|e| StoreError::Corrupt {
            order_id: id,
            detail: format!("undecodable items: {e}"),
        })?;

    Ok(Order {
        id,
        customer_id,
        partner_id,
        agent_id,
        status,
        items,
        delivery_address,
        distance,
        delivery_fee,
        service_fee,
        total_amount,
        estimated_minutes,
        rejection_reason,
        created_at,
    })
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// The conditional-update paths (applied/not-applied LWT responses, the
// concurrent assignment race against a live coordinator, index-backed list
// queries) require a running ScyllaDB instance and are exercised by
// integration environments, not unit tests. The same contract is covered
// in-process against MemoryOrderStore.
//
// ============================================================================
