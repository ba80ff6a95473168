use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_ON_TIME_BUFFER_MINUTES: u32 = 10;

/// Promised hand-off time: creation plus preparation plus delivery estimate.
pub fn compute_dispatch_time(
    created_at: DateTime<Utc>,
    prep_minutes: u32,
    eta_minutes: u32,
) -> DateTime<Utc> {
    created_at + Duration::minutes(i64::from(prep_minutes) + i64::from(eta_minutes))
}

/// Whole minutes elapsed between creation and delivery, never negative.
pub fn elapsed_minutes(created_at: DateTime<Utc>, delivered_at: DateTime<Utc>) -> u32 {
    let minutes = (delivered_at - created_at).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

pub fn is_on_time(
    elapsed_minutes: u32,
    prep_minutes: u32,
    eta_minutes: u32,
    buffer_minutes: u32,
) -> bool {
    u64::from(elapsed_minutes)
        <= u64::from(prep_minutes) + u64::from(eta_minutes) + u64::from(buffer_minutes)
}
