use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;

use crate::error::StorageError;
use crate::models::courier::Courier;
use crate::models::order::{Order, OrderStatus};
use crate::storage::{Directory, NewCourier, NewOrder};

/// In-process directory backed by concurrent maps. Ids are assigned from
/// monotonic counters starting at 1.
#[derive(Default)]
pub struct MemoryDirectory {
    couriers: DashMap<u64, Courier>,
    orders: DashMap<u64, Order>,
    next_courier_id: AtomicU64,
    next_order_id: AtomicU64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directory for MemoryDirectory {
    fn create_courier(&self, new: NewCourier) -> Courier {
        let id = self.next_courier_id.fetch_add(1, Ordering::SeqCst) + 1;
        let courier = Courier {
            id,
            name: new.name,
            phone: new.phone,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        self.couriers.insert(id, courier.clone());
        courier
    }

    fn get_courier(&self, id: u64) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    fn list_couriers(&self) -> Vec<Courier> {
        let mut roster: Vec<Courier> = self
            .couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap iteration order is arbitrary; sort for a stable roster.
        roster.sort_by_key(|courier| courier.id);
        roster
    }

    fn create_order(&self, new: NewOrder) -> Order {
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = Order {
            id,
            restaurant: new.restaurant,
            pickup_address: new.pickup_address,
            customer_address: new.customer_address,
            status: OrderStatus::Queued,
            courier_id: None,
            created_at: Utc::now(),
        };
        self.orders.insert(id, order.clone());
        order
    }

    fn get_order(&self, id: u64) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }

    fn assign_order(&self, order_id: u64, courier_id: u64) -> Result<Order, StorageError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(StorageError::OrderNotFound(order_id))?;

        // Checked under the entry guard: duplicate in-flight messages let
        // two consumers race to commit the same order, and the loser must
        // not overwrite the winner.
        if order.status != OrderStatus::Queued {
            return Err(StorageError::AlreadyAssigned(order_id));
        }

        order.courier_id = Some(courier_id);
        order.status = OrderStatus::Assigned;
        Ok(order.clone())
    }

    fn update_order_status(&self, order_id: u64, status: OrderStatus) -> Option<Order> {
        let mut order = self.orders.get_mut(&order_id)?;
        order.status = status;
        Some(order.clone())
    }
}
