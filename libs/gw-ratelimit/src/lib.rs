//! Tiered admission control: per-identifier token buckets, the API key
//! registry, and hierarchical WebSocket connection quotas (§4.1-§4.3).

pub mod apikey;
pub mod bucket;
pub mod error;
pub mod registry;
pub mod wsquota;

pub use apikey::{digest_key, ApiKeyRecord, ApiKeyRegistry, KeyDigest, BOOTSTRAP_KEY};
pub use bucket::RateBucket;
pub use error::RateLimitError;
pub use registry::TokenBucketLimiter;
pub use wsquota::{WsQuotaAccountant, WsQuotaGuard};
