//! HTTP adapters for the routing and ETA pipeline.
//!
//! Responsibilities:
//! - Talk to the primary mapping service and the secondary OSRM service.
//! - Decode inconsistent provider payloads into `reserve-core` types.
//! - Apply caching, retries and circuit breaking around every request.
//!
//! Boundaries:
//! - Do not encode reconciliation or ETA rules (live in `reserve-core`).
//! - Keep blocking I/O off async executors; bridge through an owned runtime.
//!
//! Invariants:
//! - Every failure collapses to "no result" at the client boundary.
//! - No global mutable state; caches and breakers are injected.

pub mod routing;
