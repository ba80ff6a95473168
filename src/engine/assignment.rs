use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::availability::{can_accept_order, reserve};
use crate::engine::{require_staff, EngineContext};
use crate::error::{DispatchError, ErrorCategory};
use crate::models::actor::{Actor, Role};
use crate::models::event::DomainEvent;
use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Initiator {
    /// A manager pushes the order to a partner.
    Manager,
    /// The partner accepts the order themselves.
    SelfAccept,
}

impl Initiator {
    fn as_str(&self) -> &'static str {
        match self {
            Initiator::Manager => "manager",
            Initiator::SelfAccept => "self_accept",
        }
    }
}

/// Binds one available partner to one PREP order.
pub struct AssignmentCoordinator {
    ctx: Arc<EngineContext>,
}

impl AssignmentCoordinator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub async fn assign(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        require_staff(actor, "assign partners")?;
        self.timed(order_id, partner_id, actor, Initiator::Manager)
            .await
    }

    pub async fn accept(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        match actor.role {
            Role::Partner if actor.id == partner_id => {}
            Role::Partner => {
                return Err(DispatchError::Forbidden {
                    role: actor.role,
                    action: "accept orders for another partner",
                });
            }
            Role::Manager | Role::Admin => {
                return Err(DispatchError::Forbidden {
                    role: actor.role,
                    action: "accept orders on behalf of a partner",
                });
            }
        }

        self.timed(order_id, partner_id, actor, Initiator::SelfAccept)
            .await
    }

    async fn timed(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
        initiator: Initiator,
    ) -> Result<Order, DispatchError> {
        let start = Instant::now();
        let result = self.bind(order_id, partner_id, actor, initiator).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(_) => self.ctx.metrics.observe_assignment("success", elapsed),
            Err(err) if err.category() == ErrorCategory::Storage => {
                self.ctx.metrics.observe_assignment("error", elapsed);
                error!(
                    order_id = %order_id,
                    partner_id = %partner_id,
                    error = %err,
                    "assignment failed in storage"
                );
            }
            Err(err) => {
                self.ctx.metrics.observe_assignment("rejected", elapsed);
                warn!(
                    order_id = %order_id,
                    partner_id = %partner_id,
                    initiator = initiator.as_str(),
                    reason = err.code(),
                    "assignment rejected"
                );
            }
        }

        result
    }

    async fn bind(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
        initiator: Initiator,
    ) -> Result<Order, DispatchError> {
        let _order_guard = self.ctx.locks.orders.lock(order_id).await;

        let mut order = self.ctx.load_order(order_id).await?;

        if order.status != OrderStatus::Prep {
            return Err(DispatchError::InvalidOrderStateForAssignment {
                order_id,
                status: order.status,
            });
        }

        if let Some(existing) = order.assigned_partner {
            return Err(DispatchError::OrderAlreadyAssigned {
                order_id,
                partner_id: existing,
            });
        }

        let _partner_guard = self.ctx.locks.partners.lock(partner_id).await;

        let mut partner = match self.ctx.partners.find_by_id(partner_id).await? {
            Some(partner) if partner.active => partner,
            _ => return Err(DispatchError::PartnerNotFound(partner_id)),
        };

        if initiator == Initiator::SelfAccept && !partner.available {
            return Err(DispatchError::NotAvailable { partner_id });
        }

        if !can_accept_order(&partner) {
            return Err(DispatchError::PartnerUnavailable {
                partner_id,
                current_order: partner.current_order,
            });
        }

        // Independent of the partner's own current_order field.
        let elsewhere = self
            .ctx
            .orders
            .find_one(&|other: &Order| other.id != order_id && other.holds_partner(partner_id))
            .await?;
        if let Some(other) = elsewhere {
            return Err(DispatchError::PartnerAlreadyAssignedElsewhere {
                partner_id,
                order_id: other.id,
            });
        }

        let previous_partner = partner.clone();
        reserve(&mut partner, order_id)?;

        let now = Utc::now();
        order.assigned_partner = Some(partner_id);
        order.assigned_at = Some(now);
        order.updated_at = now;

        self.ctx.partners.save(partner).await?;
        if let Err(err) = self.ctx.orders.save(order.clone()).await {
            if let Err(rollback) = self.ctx.partners.save(previous_partner).await {
                error!(
                    partner_id = %partner_id,
                    error = %rollback,
                    "failed to roll back partner reservation"
                );
            }
            return Err(err.into());
        }

        self.ctx.metrics.available_partners.dec();
        self.ctx.events.publish(DomainEvent::OrderAssigned {
            order_id,
            partner_id,
            assigned_by: actor.id,
            assigned_at: now,
            created_at: order.created_at,
        });

        info!(
            order_id = %order_id,
            partner_id = %partner_id,
            initiator = initiator.as_str(),
            actor = %actor.id,
            "order assigned"
        );

        Ok(order)
    }
}
