use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Queued,
    Assigned,
    PickedUp,
    Delivered,
}

impl OrderStatus {
    /// Whether `next` is a legal transition from the current status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Queued, OrderStatus::Assigned)
                | (OrderStatus::Assigned, OrderStatus::PickedUp)
                | (OrderStatus::PickedUp, OrderStatus::Delivered)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub restaurant: String,
    pub pickup_address: String,
    pub customer_address: String,
    pub status: OrderStatus,
    pub courier_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}
