//! HTTP surface for the creatorflow core: REST endpoints, a WebSocket relay of
//! call updates, and Prometheus metrics.

pub mod api;
pub mod metrics;
pub mod state;
