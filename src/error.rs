use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::order::OrderStatus;
use crate::store::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    StateConflict,
    NotFound,
    Authorization,
    Storage,
}

/// Errors returned by the order lifecycle and assignment engine.
///
/// State conflicts carry both competing values so callers can explain the
/// failure without re-reading the records.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("partner {0} not found")]
    PartnerNotFound(Uuid),

    #[error("order {order_id} is {status}; only PREP orders can be assigned")]
    InvalidOrderStateForAssignment { order_id: Uuid, status: OrderStatus },

    #[error("order {order_id} is already assigned to partner {partner_id}")]
    OrderAlreadyAssigned { order_id: Uuid, partner_id: Uuid },

    #[error("partner {partner_id} cannot accept an order (current order: {current_order:?})")]
    PartnerUnavailable {
        partner_id: Uuid,
        current_order: Option<Uuid>,
    },

    #[error("partner {partner_id} is already assigned to active order {order_id}")]
    PartnerAlreadyAssignedElsewhere { partner_id: Uuid, order_id: Uuid },

    #[error("partner {partner_id} is not available")]
    NotAvailable { partner_id: Uuid },

    #[error("order {order_id} is not assigned to caller {caller}")]
    NotAssignedToCaller { order_id: Uuid, caller: Uuid },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {order_id} is already {status}")]
    AlreadyTerminal { order_id: Uuid, status: OrderStatus },

    #[error("estimates of order {order_id} are frozen (status {status}, assigned: {assigned})")]
    EstimatesFrozen {
        order_id: Uuid,
        status: OrderStatus,
        assigned: bool,
    },

    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DispatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DispatchError::Validation(_) => ErrorCategory::Validation,
            DispatchError::OrderNotFound(_) | DispatchError::PartnerNotFound(_) => {
                ErrorCategory::NotFound
            }
            DispatchError::InvalidOrderStateForAssignment { .. }
            | DispatchError::OrderAlreadyAssigned { .. }
            | DispatchError::PartnerUnavailable { .. }
            | DispatchError::PartnerAlreadyAssignedElsewhere { .. }
            | DispatchError::NotAvailable { .. }
            | DispatchError::InvalidTransition { .. }
            | DispatchError::AlreadyTerminal { .. }
            | DispatchError::EstimatesFrozen { .. } => ErrorCategory::StateConflict,
            DispatchError::NotAssignedToCaller { .. } | DispatchError::Forbidden { .. } => {
                ErrorCategory::Authorization
            }
            DispatchError::Storage(_) => ErrorCategory::Storage,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "validation",
            DispatchError::OrderNotFound(_) => "order_not_found",
            DispatchError::PartnerNotFound(_) => "partner_not_found",
            DispatchError::InvalidOrderStateForAssignment { .. } => {
                "invalid_order_state_for_assignment"
            }
            DispatchError::OrderAlreadyAssigned { .. } => "order_already_assigned",
            DispatchError::PartnerUnavailable { .. } => "partner_unavailable",
            DispatchError::PartnerAlreadyAssignedElsewhere { .. } => {
                "partner_already_assigned_elsewhere"
            }
            DispatchError::NotAvailable { .. } => "not_available",
            DispatchError::NotAssignedToCaller { .. } => "not_assigned_to_caller",
            DispatchError::InvalidTransition { .. } => "invalid_transition",
            DispatchError::AlreadyTerminal { .. } => "already_terminal",
            DispatchError::EstimatesFrozen { .. } => "estimates_frozen",
            DispatchError::Forbidden { .. } => "forbidden",
            DispatchError::Storage(_) => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Dispatch(DispatchError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Dispatch(err) => {
                let status = match err.category() {
                    ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                    ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                    ErrorCategory::StateConflict => StatusCode::CONFLICT,
                    ErrorCategory::Authorization => StatusCode::FORBIDDEN,
                    ErrorCategory::Storage => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code(), err.to_string())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg.clone())
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
