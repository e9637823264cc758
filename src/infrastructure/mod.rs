//! Adapters behind the domain ports.

pub mod gateway;
pub mod in_memory;
pub mod rate_limiter;
