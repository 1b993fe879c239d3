//! # Gateway Types
//!
//! Shared value types for the multi-chain RPC acceleration gateway: tiers
//! and their numeric budgets, canonical chain identifiers, the universal
//! response envelope, bounded block-timing windows, and the HTTP-facing
//! error vocabulary. No behavior lives here beyond trivial derivations --
//! everything else in the workspace builds on top of these.

pub mod chain;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod random;
pub mod tier;
pub mod timing;

pub use chain::ChainName;
pub use clock::{Clock, ManualClock, RealClock};
pub use envelope::{Performance, ResponseEnvelope};
pub use error::ErrorKind;
pub use random::{FixedRandom, OsRandom, RandomSource};
pub use tier::{BreakerParams, Tier, TierBudgets};
pub use timing::{BlockTiming, BlockTimingWindow, MAX_BLOCK_TIMINGS};

/// Current unix time in seconds, the timestamp unit every wire payload in
/// this workspace uses (§6.2).
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
