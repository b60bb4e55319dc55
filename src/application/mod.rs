//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `PaymentOrchestrator`, the entry point for payment
//! submissions. It checks the idempotency ledger, drives the provider workflow
//! with retries on the commit step, and serializes same-key submissions with
//! per-key async locks.

pub mod key_lock;
pub mod orchestrator;
pub mod retry;
