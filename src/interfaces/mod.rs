//! Boundary adapters: batch input and caller-facing responses.

pub mod csv;
pub mod json;
