//! Content-addressed predictive cache with single-flight coalescing (§4.5).

pub mod aggressive;
pub mod cache;
pub mod canonicalize;
pub mod entry;
pub mod error;
pub mod key;
pub mod singleflight;
pub mod ttl;

pub use aggressive::{LatencyTracker, WELL_KNOWN_METHODS};
pub use cache::{CacheStore, Lookup};
pub use canonicalize::canonicalize;
pub use entry::CacheEntry;
pub use error::CacheError;
pub use key::cache_key;
pub use singleflight::{FlightResult, SingleFlightGroup};
pub use ttl::TtlModel;
