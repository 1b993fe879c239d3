//! Exponential backoff with full jitter (§4.7): base 500ms, cap 30s, factor 2.

use gw_types::RandomSource;
use std::time::Duration;

const BASE: Duration = Duration::from_millis(500);
const CAP: Duration = Duration::from_secs(30);
const FACTOR: u32 = 2;

/// `attempt` is 0-indexed (the first retry after an initial failure is
/// attempt 0). Returns a duration in `[0, min(cap, base * factor^attempt))`.
pub fn backoff_for_attempt(attempt: u32, random: &dyn RandomSource) -> Duration {
    let exponent = attempt.min(16);
    let scaled_ms = (BASE.as_millis() as u64).saturating_mul(
        (FACTOR as u64).saturating_pow(exponent),
    );
    let capped_ms = scaled_ms.min(CAP.as_millis() as u64);
    let jittered_ms = (random.next_f64() * capped_ms as f64) as u64;
    Duration::from_millis(jittered_ms)
}
