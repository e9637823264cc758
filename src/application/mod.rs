//! Application layer containing the core business logic orchestration.
//!
//! `PaymentEngine` is the entry point for payment submissions. It admits each
//! payment id once under a short admission lock and then drives the charge on
//! its own `tokio` task, so backoff never blocks unrelated requests.

pub mod admission;
pub mod engine;
pub mod forms;
pub mod in_flight;
pub mod users;
