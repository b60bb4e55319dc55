//! Concrete adapters for the domain ports.

pub mod in_memory;
pub mod simulated_gateway;
