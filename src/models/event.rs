use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        code: String,
        created_by: Uuid,
        dispatch_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    OrderAssigned {
        order_id: Uuid,
        partner_id: Uuid,
        assigned_by: Uuid,
        assigned_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        actor: Uuid,
        partner_id: Option<Uuid>,
        at: DateTime<Utc>,
    },
    EstimatesUpdated {
        order_id: Uuid,
        prep_minutes: u32,
        eta_minutes: u32,
        dispatch_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "order_created",
            DomainEvent::OrderAssigned { .. } => "order_assigned",
            DomainEvent::OrderStatusChanged { .. } => "order_status_changed",
            DomainEvent::EstimatesUpdated { .. } => "estimates_updated",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            DomainEvent::OrderCreated { order_id, .. }
            | DomainEvent::OrderAssigned { order_id, .. }
            | DomainEvent::OrderStatusChanged { order_id, .. }
            | DomainEvent::EstimatesUpdated { order_id, .. } => *order_id,
        }
    }
}
