use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;

use crate::engine::adapters::claim_next_order;
use crate::error::AppError;
use crate::models::courier::Courier;
use crate::state::AppState;
use crate::storage::NewCourier;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/:id", get(get_courier))
        .route("/couriers/:id/claim", post(claim_order))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub phone: Option<String>,
    /// Pre-computed by the auth layer; stored verbatim.
    pub password_hash: Option<String>,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let courier = state.directory.create_courier(NewCourier {
        name: payload.name,
        phone: payload.phone,
        password_hash: payload.password_hash,
    });

    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.directory.list_couriers())
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Courier>, AppError> {
    let courier = state
        .directory
        .get_courier(id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}

/// Dequeue adapter: the courier pulls their next order synchronously. An
/// empty queue is "nothing available" (204), not an error.
async fn claim_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    match claim_next_order(&state, id).await? {
        Some(order) => Ok(Json(order).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
