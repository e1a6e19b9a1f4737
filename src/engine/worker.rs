//! Background assignment worker.
//!
//! A single long-lived task: poll the queue, resolve the order, pick a
//! courier round-robin, commit the assignment, then acknowledge the
//! message. One message is fully processed before the next is fetched. No
//! single cycle's failure stops the loop; only the shutdown signal does,
//! and it is observed between cycles so an in-flight cycle always finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::engine::selector::select_next;
use crate::engine::state::{SelectionState, StateStore};
use crate::error::StorageError;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Throttle between back-to-back messages.
const CYCLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Queue empty or transport error; wait a full poll interval.
    Idle,
    /// A message was processed to completion.
    Processed,
    /// The order was requeued for a later attempt.
    Requeued,
}

pub struct Worker {
    state: Arc<AppState>,
    store: Arc<dyn StateStore>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(state: Arc<AppState>, store: Arc<dyn StateStore>, poll_interval: Duration) -> Self {
        Self {
            state,
            store,
            poll_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            "assignment worker started"
        );

        let mut selection = self.store.load();

        loop {
            let outcome = self.run_cycle(&mut selection).await;
            let delay = match outcome {
                CycleOutcome::Processed => CYCLE_DELAY,
                CycleOutcome::Idle | CycleOutcome::Requeued => self.poll_interval,
            };

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep(delay) => {}
            }
        }

        info!("assignment worker stopped");
    }

    /// One pass of the poll/resolve/select/assign/acknowledge machine.
    pub async fn run_cycle(&self, selection: &mut SelectionState) -> CycleOutcome {
        let message = match self.state.queue.receive().await {
            Ok(Some(message)) => message,
            Ok(None) => return CycleOutcome::Idle,
            Err(err) => {
                error!(error = %err, "failed to receive from queue");
                return CycleOutcome::Idle;
            }
        };

        let order_id = message.order_id;
        info!(order_id, message_id = %message.message_id, "received assignment message");

        let Some(order) = message.order else {
            // The record is gone; there is nothing to assign or retry.
            warn!(order_id, "message references a missing order; discarding");
            self.acknowledge(&message.receipt, order_id).await;
            return CycleOutcome::Processed;
        };

        if order.status != OrderStatus::Queued {
            // Duplicate delivery of an order someone else already dispatched.
            warn!(order_id, status = ?order.status, "order already dispatched; discarding message");
            self.acknowledge(&message.receipt, order_id).await;
            return CycleOutcome::Processed;
        }

        let roster = self.state.directory.list_couriers();
        let Some(courier) = select_next(&roster, selection) else {
            warn!(order_id, "no couriers registered; requeueing");
            self.requeue(order_id).await;
            // The original message stays pending on purpose: redelivery and
            // the requeued copy both retry this order.
            return CycleOutcome::Requeued;
        };

        if let Err(err) = self.store.save(*selection) {
            // Non-fatal: worst case the cursor repeats a pick after restart.
            warn!(error = %err, "failed to persist selection state");
        }

        match self.state.directory.assign_order(order_id, courier.id) {
            Ok(assigned) => {
                info!(
                    order_id = assigned.id,
                    courier_id = courier.id,
                    courier = %courier.name,
                    "order assigned"
                );
                self.state
                    .metrics
                    .assignments_total
                    .with_label_values(&["assigned"])
                    .inc();
                self.acknowledge(&message.receipt, order_id).await;
                CycleOutcome::Processed
            }
            Err(StorageError::OrderNotFound(_)) => {
                warn!(order_id, "order vanished before assignment; discarding message");
                self.acknowledge(&message.receipt, order_id).await;
                CycleOutcome::Processed
            }
            Err(StorageError::AlreadyAssigned(_)) => {
                // A concurrent consumer of a duplicate message committed
                // first; their assignment stands.
                warn!(order_id, "lost assignment race; discarding message");
                self.acknowledge(&message.receipt, order_id).await;
                CycleOutcome::Processed
            }
            Err(err) => {
                error!(
                    error = %err,
                    order_id,
                    courier_id = courier.id,
                    "assignment failed; requeueing"
                );
                self.state
                    .metrics
                    .assignments_total
                    .with_label_values(&["failed"])
                    .inc();
                self.requeue(order_id).await;
                // Ack the original even so: retries are bounded to the
                // explicit requeue instead of piling up via redelivery.
                self.acknowledge(&message.receipt, order_id).await;
                CycleOutcome::Requeued
            }
        }
    }

    async fn requeue(&self, order_id: u64) {
        match self.state.queue.send(order_id).await {
            Ok(_) => self.state.metrics.orders_requeued_total.inc(),
            Err(err) => error!(error = %err, order_id, "failed to requeue order"),
        }
    }

    async fn acknowledge(&self, receipt: &str, order_id: u64) {
        if !self.state.queue.acknowledge(receipt).await {
            warn!(order_id, "failed to acknowledge message; it may be redelivered");
        }
    }
}
