//! Loan Billing Engine Library
//!
//! Installment loans with weekly billing, delinquency detection and
//! exact-amount payments, served over HTTP and persisted in Postgres.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
