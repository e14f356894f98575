use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockState {
    pub expired: bool,
    /// Exact milliseconds until expiry, negative once past. None when the
    /// shipment never expires.
    pub remaining_ms: Option<i64>,
}

/// Reports expiry state only; closing the shipment is an effect the caller
/// applies exactly once.
pub fn clock_state(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ClockState {
    match expires_at {
        None => ClockState {
            expired: false,
            remaining_ms: None,
        },
        Some(expires_at) => {
            let remaining_ms = (expires_at - now).num_milliseconds();
            ClockState {
                expired: remaining_ms <= 0,
                remaining_ms: Some(remaining_ms),
            }
        }
    }
}
