//! Domain types and the ports the orchestrator depends on.

pub mod fingerprint;
pub mod outcome;
pub mod ports;
pub mod request;
