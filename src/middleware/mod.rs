//! Middleware for the loan billing API

mod tracing;

pub use tracing::request_tracing;
