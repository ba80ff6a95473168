use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::availability::{record_completion, release};
use crate::engine::dispatch_time::{compute_dispatch_time, elapsed_minutes, is_on_time};
use crate::engine::transitions::validate_transition;
use crate::engine::{require_staff, EngineContext};
use crate::error::DispatchError;
use crate::models::actor::{Actor, Role};
use crate::models::event::DomainEvent;
use crate::models::order::{
    order_total, NewOrder, Order, OrderStatus, StatusChange, MAX_PREP_MINUTES, MIN_PREP_MINUTES,
};
use crate::models::partner::Partner;

/// Creates orders and advances them through PREP → PICKED → ON_ROUTE →
/// DELIVERED, or to CANCELLED from any non-terminal status.
pub struct OrderLifecycleService {
    ctx: Arc<EngineContext>,
    /// Last issued code sequence, seeded from the stored order count on the
    /// first order this service creates.
    sequence: Mutex<Option<u64>>,
}

impl OrderLifecycleService {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            ctx,
            sequence: Mutex::new(None),
        }
    }

    /// Issues the next `ORD-YYYYMMDD-NNNNNN` code. Codes already present in
    /// the repository, written by an earlier process or another dispatcher
    /// over the same store, are skipped.
    async fn next_code(&self, now: DateTime<Utc>) -> Result<String, DispatchError> {
        let mut sequence = self.sequence.lock().await;
        let mut seq = match *sequence {
            Some(seq) => seq,
            None => self.ctx.orders.count().await? as u64,
        };

        let date = now.format("%Y%m%d");
        loop {
            seq += 1;
            let code = format!("ORD-{date}-{seq:06}");
            let taken = self
                .ctx
                .orders
                .find_one(&|order: &Order| order.code == code)
                .await?;
            if taken.is_none() {
                *sequence = Some(seq);
                return Ok(code);
            }
        }
    }

    pub async fn create_order(
        &self,
        params: NewOrder,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        require_staff(actor, "create orders")?;
        validate_new_order(&params)?;

        let now = Utc::now();
        let code = self.next_code(now).await?;
        let order = Order {
            id: Uuid::new_v4(),
            code,
            total: order_total(&params.items),
            items: params.items,
            customer: params.customer,
            prep_minutes: params.prep_minutes,
            eta_minutes: params.eta_minutes,
            dispatch_at: compute_dispatch_time(now, params.prep_minutes, params.eta_minutes),
            priority: params.priority,
            status: OrderStatus::Prep,
            assigned_partner: None,
            assigned_at: None,
            history: vec![StatusChange {
                status: OrderStatus::Prep,
                at: now,
                actor: actor.id,
                note: None,
            }],
            created_by: actor.id,
            created_at: now,
            updated_at: now,
        };

        self.ctx.orders.save(order.clone()).await?;
        self.ctx.metrics.orders_created_total.inc();
        self.ctx.events.publish(DomainEvent::OrderCreated {
            order_id: order.id,
            code: order.code.clone(),
            created_by: actor.id,
            dispatch_at: order.dispatch_at,
            at: now,
        });

        info!(order_id = %order.id, code = %order.code, created_by = %actor.id, "order created");
        Ok(order)
    }

    pub async fn transition(
        &self,
        order_id: Uuid,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        let _order_guard = self.ctx.locks.orders.lock(order_id).await;
        let order = self.ctx.load_order(order_id).await?;

        match actor.role {
            Role::Partner => {
                if order.assigned_partner != Some(actor.id) {
                    warn!(order_id = %order_id, caller = %actor.id, "transition by unbound partner");
                    return Err(DispatchError::NotAssignedToCaller {
                        order_id,
                        caller: actor.id,
                    });
                }
            }
            Role::Manager | Role::Admin => {
                if requested != OrderStatus::Cancelled {
                    return Err(DispatchError::Forbidden {
                        role: actor.role,
                        action: "advance order status",
                    });
                }
            }
        }

        if let Err(err) = validate_transition(order.status, requested) {
            warn!(order_id = %order_id, from = %order.status, to = %requested, "transition rejected");
            return Err(err);
        }

        self.apply(order, requested, actor, None).await
    }

    pub async fn cancel(
        &self,
        order_id: Uuid,
        reason: &str,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        require_staff(actor, "cancel orders")?;

        let _order_guard = self.ctx.locks.orders.lock(order_id).await;
        let order = self.ctx.load_order(order_id).await?;

        if order.is_terminal() {
            return Err(DispatchError::AlreadyTerminal {
                order_id,
                status: order.status,
            });
        }

        let reason = reason.trim();
        let note = (!reason.is_empty()).then(|| reason.to_string());
        self.apply(order, OrderStatus::Cancelled, actor, note).await
    }

    pub async fn update_estimates(
        &self,
        order_id: Uuid,
        prep_minutes: Option<u32>,
        eta_minutes: Option<u32>,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        require_staff(actor, "update estimates")?;

        if prep_minutes.is_none() && eta_minutes.is_none() {
            return Err(DispatchError::Validation(
                "at least one of prep_minutes or eta_minutes is required".to_string(),
            ));
        }
        if let Some(prep) = prep_minutes {
            validate_prep(prep)?;
        }
        if let Some(eta) = eta_minutes {
            validate_eta(eta)?;
        }

        let _order_guard = self.ctx.locks.orders.lock(order_id).await;
        let mut order = self.ctx.load_order(order_id).await?;

        if order.status != OrderStatus::Prep || order.assigned_partner.is_some() {
            return Err(DispatchError::EstimatesFrozen {
                order_id,
                status: order.status,
                assigned: order.assigned_partner.is_some(),
            });
        }

        let now = Utc::now();
        order.prep_minutes = prep_minutes.unwrap_or(order.prep_minutes);
        order.eta_minutes = eta_minutes.unwrap_or(order.eta_minutes);
        order.dispatch_at =
            compute_dispatch_time(order.created_at, order.prep_minutes, order.eta_minutes);
        order.updated_at = now;

        self.ctx.orders.save(order.clone()).await?;
        self.ctx.events.publish(DomainEvent::EstimatesUpdated {
            order_id,
            prep_minutes: order.prep_minutes,
            eta_minutes: order.eta_minutes,
            dispatch_at: order.dispatch_at,
            at: now,
        });

        info!(
            order_id = %order_id,
            prep_minutes = order.prep_minutes,
            eta_minutes = order.eta_minutes,
            "estimates updated"
        );
        Ok(order)
    }

    /// Records an already validated transition. The caller holds the order lock.
    async fn apply(
        &self,
        mut order: Order,
        requested: OrderStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<Order, DispatchError> {
        let now = Utc::now();
        let from = order.status;

        order.history.push(StatusChange {
            status: requested,
            at: now,
            actor: actor.id,
            note,
        });
        order.status = requested;
        order.updated_at = now;

        let released = match (requested.is_terminal(), order.assigned_partner) {
            (true, Some(partner_id)) => self.release_partner(&order, partner_id, now).await?,
            _ => None,
        };

        if let Err(err) = self.ctx.orders.save(order.clone()).await {
            if let Some(previous) = released {
                if let Err(rollback) = self.ctx.partners.save(previous).await {
                    error!(
                        order_id = %order.id,
                        error = %rollback,
                        "failed to roll back partner release"
                    );
                }
            }
            return Err(err.into());
        }

        if released.is_some() {
            self.ctx.metrics.available_partners.inc();
        }
        self.ctx
            .metrics
            .status_transitions_total
            .with_label_values(&[requested.as_str()])
            .inc();
        self.ctx.events.publish(DomainEvent::OrderStatusChanged {
            order_id: order.id,
            from,
            to: requested,
            actor: actor.id,
            partner_id: order.assigned_partner,
            at: now,
        });

        info!(
            order_id = %order.id,
            from = %from,
            to = %requested,
            actor = %actor.id,
            "order status changed"
        );

        if requested.is_terminal() {
            self.ctx.locks.orders.prune();
            self.ctx.locks.partners.prune();
        }

        Ok(order)
    }

    /// Frees the partner bound to a terminating order and, on delivery,
    /// records the completion. Returns the partner as it was before, for
    /// rollback, or `None` if there was nothing to release.
    async fn release_partner(
        &self,
        order: &Order,
        partner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Partner>, DispatchError> {
        let _partner_guard = self.ctx.locks.partners.lock(partner_id).await;

        let Some(mut partner) = self.ctx.partners.find_by_id(partner_id).await? else {
            warn!(order_id = %order.id, partner_id = %partner_id, "bound partner missing on release");
            return Ok(None);
        };

        if partner.current_order != Some(order.id) {
            warn!(
                order_id = %order.id,
                partner_id = %partner_id,
                current_order = ?partner.current_order,
                "partner no longer holds this order"
            );
            return Ok(None);
        }

        let previous = partner.clone();
        release(&mut partner);

        if order.status == OrderStatus::Delivered {
            let minutes = elapsed_minutes(order.created_at, now);
            let on_time = is_on_time(
                minutes,
                order.prep_minutes,
                order.eta_minutes,
                self.ctx.config.on_time_buffer_minutes,
            );
            record_completion(&mut partner, minutes, on_time);
        }

        self.ctx.partners.save(partner).await?;
        Ok(Some(previous))
    }
}

fn validate_prep(prep_minutes: u32) -> Result<(), DispatchError> {
    if !(MIN_PREP_MINUTES..=MAX_PREP_MINUTES).contains(&prep_minutes) {
        return Err(DispatchError::Validation(format!(
            "prep_minutes must be between {MIN_PREP_MINUTES} and {MAX_PREP_MINUTES}, got {prep_minutes}"
        )));
    }
    Ok(())
}

fn validate_eta(eta_minutes: u32) -> Result<(), DispatchError> {
    if eta_minutes == 0 {
        return Err(DispatchError::Validation(
            "eta_minutes must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_new_order(params: &NewOrder) -> Result<(), DispatchError> {
    if params.items.is_empty() {
        return Err(DispatchError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }

    for item in &params.items {
        if item.name.trim().is_empty() {
            return Err(DispatchError::Validation(
                "item name cannot be empty".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(DispatchError::Validation(format!(
                "quantity of {} must be >= 1",
                item.name
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(DispatchError::Validation(format!(
                "price of {} must be >= 0",
                item.name
            )));
        }
    }

    let customer = &params.customer;
    if customer.name.trim().is_empty()
        || customer.phone.trim().is_empty()
        || customer.address.trim().is_empty()
    {
        return Err(DispatchError::Validation(
            "customer name, phone and address are required".to_string(),
        ));
    }

    validate_prep(params.prep_minutes)?;
    validate_eta(params.eta_minutes)
}
