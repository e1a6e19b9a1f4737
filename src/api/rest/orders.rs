use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;

use crate::engine::adapters::enqueue_order;
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;
use crate::storage::NewOrder;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/pickup", post(confirm_pickup))
        .route("/orders/:id/delivered", post(confirm_delivery))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant: String,
    pub pickup_address: String,
    pub customer_address: String,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub courier_id: u64,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    for (field, value) in [
        ("restaurant", &payload.restaurant),
        ("pickup_address", &payload.pickup_address),
        ("customer_address", &payload.customer_address),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} cannot be empty")));
        }
    }

    let order = state.directory.create_order(NewOrder {
        restaurant: payload.restaurant,
        pickup_address: payload.pickup_address,
        customer_address: payload.customer_address,
    });

    // On enqueue failure the order stays created but undispatchable; the
    // caller gets a retriable error and may resubmit.
    enqueue_order(&state, order.id).await?;

    Ok(Json(order))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.directory.list_orders())
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .directory
        .get_order(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<Order>, AppError> {
    confirm_status(&state, id, payload.courier_id, OrderStatus::PickedUp)
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<Order>, AppError> {
    confirm_status(&state, id, payload.courier_id, OrderStatus::Delivered)
}

fn confirm_status(
    state: &AppState,
    order_id: u64,
    courier_id: u64,
    next: OrderStatus,
) -> Result<Json<Order>, AppError> {
    let order = state
        .directory
        .get_order(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if order.courier_id != Some(courier_id) {
        return Err(AppError::Conflict(format!(
            "order {order_id} is not assigned to courier {courier_id}"
        )));
    }

    if !order.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "order {order_id} cannot move from {:?} to {next:?}",
            order.status
        )));
    }

    let updated = state
        .directory
        .update_order_status(order_id, next)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    Ok(Json(updated))
}
