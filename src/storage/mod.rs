//! Order/courier directory collaborator.
//!
//! The assignment pipeline only needs a narrow contract over whatever stores
//! the records: create/lookup for orders, a stable roster listing for
//! couriers, and an atomic per-order assignment update.

pub mod memory;

pub use memory::MemoryDirectory;

use crate::error::StorageError;
use crate::models::courier::Courier;
use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone)]
pub struct NewCourier {
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub restaurant: String,
    pub pickup_address: String,
    pub customer_address: String,
}

pub trait Directory: Send + Sync {
    fn create_courier(&self, new: NewCourier) -> Courier;

    fn get_courier(&self, id: u64) -> Option<Courier>;

    /// Roster snapshot for round-robin selection. Ordering is
    /// implementation-defined but stable within a single call.
    fn list_couriers(&self) -> Vec<Courier>;

    /// Persists a new order with status `queued`.
    fn create_order(&self, new: NewOrder) -> Order;

    fn get_order(&self, id: u64) -> Option<Order>;

    fn list_orders(&self) -> Vec<Order>;

    /// Atomically sets the courier and moves the order to `assigned`.
    fn assign_order(&self, order_id: u64, courier_id: u64) -> Result<Order, StorageError>;

    /// Returns `None` if the order no longer exists.
    fn update_order_status(&self, order_id: u64, status: OrderStatus) -> Option<Order>;
}
