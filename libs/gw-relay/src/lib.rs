//! Chain backend registry, relay connection lifecycle, health probes, and
//! fastpath snapshots (§4.6, §4.7).

pub mod backend;
pub mod backoff;
pub mod fastpath;
pub mod probe;
pub mod registry;
pub mod state;

pub use backend::{BackendError, ChainBackend, JsonRpcBackend};
pub use backoff::backoff_for_attempt;
pub use fastpath::{FastpathSnapshot, LATEST_REFRESH_INTERVAL, STATUS_REFRESH_INTERVAL};
pub use probe::{probe_connect, probe_health, ProbeOutcome, PROBE_METHODS, PROBE_TICK_INTERVAL};
pub use registry::{BackendRegistry, RegisteredBackend};
pub use state::{RelayState, RelayStateMachine, DEGRADATION_THRESHOLD};
