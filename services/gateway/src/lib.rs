//! Library surface for the gateway binary and its integration tests
//! (`tests/`). The binary (`main.rs`) is a thin wrapper around these
//! modules so request handling can be driven end-to-end without a running
//! process.

pub mod auth;
pub mod error;
pub mod fastpath;
pub mod handlers;
pub mod middleware;
pub mod relay_loop;
pub mod router;
pub mod server;
