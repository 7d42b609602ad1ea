//! Exponential backoff for reconnection attempts.

use std::time::Duration;

/// Computes the delay before retry number `attempt` (1-based).
///
/// `min(base * 2^(attempt-1), cap)` - doubling per attempt, capped so a
/// long outage never pushes the next probe absurdly far out.
#[must_use]
pub fn delay_for_attempt(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let millis = (base.as_millis() as u64).saturating_mul(1u64 << exponent);
    Duration::from_millis(millis.min(cap.as_millis() as u64))
}
