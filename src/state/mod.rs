//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::loan::LoanService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub loan_service: Arc<LoanService>,
    /// Pool checked by the health endpoint; absent when running without Postgres
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(loan_service: Arc<LoanService>, db_pool: Option<PgPool>) -> Self {
        Self {
            loan_service,
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}
