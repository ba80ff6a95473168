use crate::error::DispatchError;
use crate::models::order::OrderStatus;

/// Statuses reachable in one step from `current`. Every non-terminal status
/// can be cancelled; nothing leaves a terminal status.
pub const fn legal_next(current: OrderStatus) -> &'static [OrderStatus] {
    match current {
        OrderStatus::Prep => &[OrderStatus::Picked, OrderStatus::Cancelled],
        OrderStatus::Picked => &[OrderStatus::OnRoute, OrderStatus::Cancelled],
        OrderStatus::OnRoute => &[OrderStatus::Delivered, OrderStatus::Cancelled],
        OrderStatus::Delivered | OrderStatus::Cancelled => &[],
    }
}

pub fn is_legal(current: OrderStatus, requested: OrderStatus) -> bool {
    legal_next(current).contains(&requested)
}

pub fn validate_transition(
    current: OrderStatus,
    requested: OrderStatus,
) -> Result<(), DispatchError> {
    if is_legal(current, requested) {
        Ok(())
    } else {
        Err(DispatchError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}
