//! Order lifecycle and partner assignment engine.
//!
//! [`Dispatcher`] is the entry point used by transports. It owns an
//! [`AssignmentCoordinator`] and an [`OrderLifecycleService`] that share one
//! [`EngineContext`]: the repositories, the event sink and the per-entity
//! locks that serialize every read-modify-write on an order or a partner.
//!
//! Binding and releasing a partner are two writes: the partner record first,
//! then the order, with the partner restored if the order write fails. Both
//! happen under the order lock. Operations that take the locks always see the
//! pair in step. The plain reads below ([`Dispatcher::get_order`],
//! [`Dispatcher::list_orders`], [`Dispatcher::get_partner`],
//! [`Dispatcher::list_partners`]) take no lock and may observe the partner
//! side of an assignment a moment before the order side.

pub mod assignment;
pub mod availability;
pub mod dispatch_time;
pub mod lifecycle;
pub mod locks;
pub mod transitions;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::assignment::AssignmentCoordinator;
use crate::engine::dispatch_time::DEFAULT_ON_TIME_BUFFER_MINUTES;
use crate::engine::lifecycle::OrderLifecycleService;
use crate::engine::locks::EntityLocks;
use crate::error::DispatchError;
use crate::events::EventSink;
use crate::models::actor::Actor;
use crate::models::order::{NewOrder, Order, OrderStatus};
use crate::models::partner::{NewPartner, Partner};
use crate::observability::metrics::Metrics;
use crate::store::{OrderRepository, PartnerRepository};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Grace period added to prep + ETA when judging a delivery on time.
    pub on_time_buffer_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            on_time_buffer_minutes: DEFAULT_ON_TIME_BUFFER_MINUTES,
        }
    }
}

pub struct EngineContext {
    pub orders: Arc<OrderRepository>,
    pub partners: Arc<PartnerRepository>,
    pub events: Arc<dyn EventSink>,
    pub locks: EntityLocks,
    pub metrics: Metrics,
    pub config: EngineConfig,
}

impl EngineContext {
    pub async fn load_order(&self, order_id: Uuid) -> Result<Order, DispatchError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(DispatchError::OrderNotFound(order_id))
    }

    pub async fn load_partner(&self, partner_id: Uuid) -> Result<Partner, DispatchError> {
        self.partners
            .find_by_id(partner_id)
            .await?
            .ok_or(DispatchError::PartnerNotFound(partner_id))
    }
}

pub fn require_staff(actor: &Actor, action: &'static str) -> Result<(), DispatchError> {
    if actor.is_staff() {
        Ok(())
    } else {
        Err(DispatchError::Forbidden {
            role: actor.role,
            action,
        })
    }
}

pub struct Dispatcher {
    ctx: Arc<EngineContext>,
    assignments: AssignmentCoordinator,
    lifecycle: OrderLifecycleService,
}

impl Dispatcher {
    pub fn new(
        orders: Arc<OrderRepository>,
        partners: Arc<PartnerRepository>,
        events: Arc<dyn EventSink>,
        metrics: Metrics,
        config: EngineConfig,
    ) -> Self {
        let ctx = Arc::new(EngineContext {
            orders,
            partners,
            events,
            locks: EntityLocks::default(),
            metrics,
            config,
        });

        Self {
            assignments: AssignmentCoordinator::new(ctx.clone()),
            lifecycle: OrderLifecycleService::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub async fn create_order(
        &self,
        params: NewOrder,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.lifecycle.create_order(params, actor).await
    }

    pub async fn assign_partner(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.assignments.assign(order_id, partner_id, actor).await
    }

    pub async fn accept_order(
        &self,
        order_id: Uuid,
        partner_id: Uuid,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.assignments.accept(order_id, partner_id, actor).await
    }

    pub async fn transition_status(
        &self,
        order_id: Uuid,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.lifecycle.transition(order_id, requested, actor).await
    }

    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: &str,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.lifecycle.cancel(order_id, reason, actor).await
    }

    pub async fn update_estimates(
        &self,
        order_id: Uuid,
        prep_minutes: Option<u32>,
        eta_minutes: Option<u32>,
        actor: &Actor,
    ) -> Result<Order, DispatchError> {
        self.lifecycle
            .update_estimates(order_id, prep_minutes, eta_minutes, actor)
            .await
    }

    /// Lock-free read; see the module docs for what it may observe mid-assignment.
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, DispatchError> {
        self.ctx.load_order(order_id).await
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, DispatchError> {
        let mut orders = self
            .ctx
            .orders
            .find_all(&|order: &Order| status.is_none_or(|s| order.status == s))
            .await?;
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }

    pub async fn register_partner(
        &self,
        params: NewPartner,
        actor: &Actor,
    ) -> Result<Partner, DispatchError> {
        require_staff(actor, "register partners")?;

        if params.name.trim().is_empty() {
            return Err(DispatchError::Validation("name cannot be empty".to_string()));
        }
        if params.phone.trim().is_empty() {
            return Err(DispatchError::Validation("phone cannot be empty".to_string()));
        }

        let partner = Partner::register(params);
        self.ctx.partners.save(partner.clone()).await?;
        self.ctx.metrics.available_partners.inc();

        info!(partner_id = %partner.id, registered_by = %actor.id, "partner registered");
        Ok(partner)
    }

    /// Soft-deletes a partner. A partner holding an order must finish or have
    /// it cancelled first.
    pub async fn deactivate_partner(
        &self,
        partner_id: Uuid,
        actor: &Actor,
    ) -> Result<Partner, DispatchError> {
        require_staff(actor, "deactivate partners")?;

        let _guard = self.ctx.locks.partners.lock(partner_id).await;
        let mut partner = self.ctx.load_partner(partner_id).await?;

        if partner.current_order.is_some() {
            return Err(DispatchError::PartnerUnavailable {
                partner_id,
                current_order: partner.current_order,
            });
        }
        if !partner.active {
            return Ok(partner);
        }

        partner.active = false;
        partner.updated_at = Utc::now();
        self.ctx.partners.save(partner.clone()).await?;
        if partner.available {
            self.ctx.metrics.available_partners.dec();
        }

        info!(partner_id = %partner_id, deactivated_by = %actor.id, "partner deactivated");
        Ok(partner)
    }

    pub async fn get_partner(&self, partner_id: Uuid) -> Result<Partner, DispatchError> {
        self.ctx.load_partner(partner_id).await
    }

    pub async fn list_partners(&self) -> Result<Vec<Partner>, DispatchError> {
        let mut partners = self.ctx.partners.find_all(&|_: &Partner| true).await?;
        partners.sort_by_key(|partner| partner.created_at);
        Ok(partners)
    }

    pub async fn counts(&self) -> Result<(usize, usize), DispatchError> {
        Ok((
            self.ctx.orders.count().await?,
            self.ctx.partners.count().await?,
        ))
    }
}
