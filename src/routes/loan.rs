//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{create_loan, get_current_loan, make_payment};
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(create_loan))
        .route("/api/users/:user_id/loans/current", get(get_current_loan))
        .route("/api/loans/:loan_id/payments", post(make_payment))
}
