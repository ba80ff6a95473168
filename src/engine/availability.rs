//! Partner availability: who may take an order, and the counters updated when
//! an order ends.
//!
//! `current_order` and `available` only ever change together, through
//! [`reserve`] and [`release`].

use chrono::Utc;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::partner::Partner;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

pub fn can_accept_order(partner: &Partner) -> bool {
    partner.active && partner.available && partner.current_order.is_none()
}

pub fn reserve(partner: &mut Partner, order_id: Uuid) -> Result<(), DispatchError> {
    if !can_accept_order(partner) {
        return Err(DispatchError::PartnerUnavailable {
            partner_id: partner.id,
            current_order: partner.current_order,
        });
    }

    partner.current_order = Some(order_id);
    partner.available = false;
    partner.updated_at = Utc::now();
    Ok(())
}

/// Returns the partner to the pool. Releasing a free partner is a no-op.
pub fn release(partner: &mut Partner) {
    if partner.current_order.is_none() && partner.available {
        return;
    }

    partner.current_order = None;
    partner.available = true;
    partner.updated_at = Utc::now();
}

pub fn record_completion(partner: &mut Partner, delivery_minutes: u32, was_on_time: bool) {
    let stats = &mut partner.stats;
    stats.total_deliveries = stats.total_deliveries.saturating_add(1);
    stats.completed_deliveries = stats.completed_deliveries.saturating_add(1);
    if was_on_time {
        stats.on_time_deliveries = stats.on_time_deliveries.saturating_add(1);
    }

    let n = f64::from(stats.total_deliveries);
    stats.average_delivery_minutes =
        (stats.average_delivery_minutes * (n - 1.0) + f64::from(delivery_minutes)) / n;

    partner.rating = rating_for(stats.on_time_ratio());
    partner.updated_at = Utc::now();
}

pub fn rating_for(on_time_ratio: f64) -> f64 {
    (3.0 + 2.0 * on_time_ratio).clamp(MIN_RATING, MAX_RATING)
}
