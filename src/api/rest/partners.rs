use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::api::rest::auth::Caller;
use crate::api::rest::extract::JsonBody;
use crate::error::AppError;
use crate::models::partner::{NewPartner, Partner};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/partners", post(register_partner).get(list_partners))
        .route("/partners/:id", get(get_partner).delete(deactivate_partner))
}

async fn register_partner(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    JsonBody(payload): JsonBody<NewPartner>,
) -> Result<Json<Partner>, AppError> {
    let partner = state.dispatcher.register_partner(payload, &actor).await?;
    Ok(Json(partner))
}

async fn list_partners(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Partner>>, AppError> {
    let partners = state.dispatcher.list_partners().await?;
    Ok(Json(partners))
}

async fn get_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Partner>, AppError> {
    let partner = state.dispatcher.get_partner(id).await?;
    Ok(Json(partner))
}

async fn deactivate_partner(
    State(state): State<Arc<AppState>>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Partner>, AppError> {
    let partner = state.dispatcher.deactivate_partner(id, &actor).await?;
    Ok(Json(partner))
}
