//! Infrastructure adapters and runtime bootstrap.

pub mod commerce;
pub mod error;
pub mod http;
pub mod telemetry;
