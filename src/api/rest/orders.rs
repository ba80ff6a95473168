use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::auth::Caller;
use crate::api::rest::extract::JsonBody;
use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/assign", post(assign_partner))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/status", post(transition_status))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/estimates", patch(update_estimates))
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub partner_id: Uuid,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateEstimatesRequest {
    pub prep_minutes: Option<u32>,
    pub eta_minutes: Option<u32>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    JsonBody(payload): JsonBody<NewOrder>,
) -> Result<Json<Order>, AppError> {
    let order = state.dispatcher.create_order(payload, &actor).await?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.dispatcher.list_orders(query.status).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.dispatcher.get_order(id).await?;
    Ok(Json(order))
}

async fn assign_partner(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .assign_partner(id, payload.partner_id, &actor)
        .await?;
    Ok(Json(order))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.dispatcher.accept_order(id, actor.id, &actor).await?;
    Ok(Json(order))
}

async fn transition_status(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .transition_status(id, payload.status, &actor)
        .await?;
    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<CancelRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .cancel_order(id, &payload.reason, &actor)
        .await?;
    Ok(Json(order))
}

async fn update_estimates(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateEstimatesRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatcher
        .update_estimates(id, payload.prep_minutes, payload.eta_minutes, &actor)
        .await?;
    Ok(Json(order))
}
