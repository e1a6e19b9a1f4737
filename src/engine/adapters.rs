//! Thin entry points used by the HTTP layer: push a freshly created order
//! onto the queue, or let a courier atomically claim the next one.

use tracing::{info, warn};

use crate::error::{AppError, StorageError};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Enqueues a message for an order that was just created with status
/// `queued`. On failure the order is not rolled back; it stays queryable
/// but undispatchable and the caller gets a retriable error.
pub async fn enqueue_order(state: &AppState, order_id: u64) -> Result<String, AppError> {
    let message_id = state.queue.send(order_id).await?;
    state.metrics.orders_enqueued_total.inc();
    info!(order_id, message_id = %message_id, "order enqueued for assignment");
    Ok(message_id)
}

/// Courier-initiated claim: the requesting courier takes the next pending
/// order directly, bypassing round-robin (the cursor is untouched). The
/// message is acknowledged only after the assignment commits; on a commit
/// failure it is left pending for redelivery.
pub async fn claim_next_order(
    state: &AppState,
    courier_id: u64,
) -> Result<Option<Order>, AppError> {
    let courier = state
        .directory
        .get_courier(courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    // Messages whose order record is gone are dead weight; ack them and
    // keep receiving until a claimable message or an empty queue.
    let (message, order) = loop {
        let Some(mut message) = state.queue.receive().await? else {
            return Ok(None);
        };

        match message.order.take() {
            Some(order) => break (message, order),
            None => {
                warn!(
                    order_id = message.order_id,
                    "claimed message references a missing order; discarding"
                );
                state.queue.acknowledge(&message.receipt).await;
            }
        }
    };

    if order.status != OrderStatus::Queued {
        // Stale redelivery of an order that was already dispatched.
        state.queue.acknowledge(&message.receipt).await;
        return Err(AppError::Conflict(format!(
            "order {} is already {:?}",
            order.id, order.status
        )));
    }

    match state.directory.assign_order(order.id, courier.id) {
        Ok(assigned) => {
            if !state.queue.acknowledge(&message.receipt).await {
                warn!(
                    order_id = assigned.id,
                    "claim committed but acknowledge failed; message may be redelivered"
                );
            }
            state
                .metrics
                .assignments_total
                .with_label_values(&["claimed"])
                .inc();
            info!(
                order_id = assigned.id,
                courier_id = courier.id,
                courier = %courier.name,
                "order claimed"
            );
            Ok(Some(assigned))
        }
        Err(StorageError::OrderNotFound(id)) => {
            state.queue.acknowledge(&message.receipt).await;
            Err(AppError::NotFound(format!("order {id} not found")))
        }
        Err(StorageError::AlreadyAssigned(id)) => {
            // Lost the race to a concurrent consumer of a duplicate message.
            state.queue.acknowledge(&message.receipt).await;
            Err(AppError::Conflict(format!("order {id} is already assigned")))
        }
        // Message intentionally left unacknowledged so it is redelivered.
        Err(err) => Err(AppError::Internal(format!("assignment failed: {err}"))),
    }
}
