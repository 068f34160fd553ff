//! Request and response models for the HTTP API

use serde::{Deserialize, Serialize};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Body of `POST /api/loans`. Amounts travel as decimal strings.
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub user_id: String,
    pub amount: String,
    pub payment_duration_weeks: i32,
}

/// Body of `POST /api/loans/:loan_id/payments`
#[derive(Debug, Deserialize)]
pub struct MakePaymentRequest {
    pub payment_amount: String,
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}
