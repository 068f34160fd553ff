//! Loan API handlers

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::loan::{CreateLoanCommand, Loan, LoanDetail, LoanService, MakePaymentCommand};
use crate::models::{ApiResponse, CreateLoanRequest, MakePaymentRequest};

/// POST /api/loans - Create a loan for a user without an ongoing one
pub async fn create_loan(
    State(loan_service): State<Arc<LoanService>>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Loan>>)> {
    let Json(req) = payload?;
    let cmd = CreateLoanCommand {
        user_id: parse_uuid(&req.user_id, "invalid user id")?,
        amount: parse_decimal(&req.amount, "invalid amount")?,
        payment_duration_weeks: req.payment_duration_weeks,
    };

    let loan = loan_service.create_loan(cmd).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(loan))))
}

/// GET /api/users/:user_id/loans/current - Billing state of the user's ongoing loan
pub async fn get_current_loan(
    State(loan_service): State<Arc<LoanService>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<LoanDetail>>> {
    let user_id = parse_uuid(&user_id, "invalid user id")?;

    let detail = loan_service.get_current_loan(user_id).await?;

    Ok(Json(ApiResponse::ok(detail)))
}

/// POST /api/loans/:loan_id/payments - Pay the current bill of a loan
pub async fn make_payment(
    State(loan_service): State<Arc<LoanService>>,
    Path(loan_id): Path<String>,
    payload: Result<Json<MakePaymentRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<LoanDetail>>> {
    let Json(req) = payload?;
    let cmd = MakePaymentCommand {
        loan_id: parse_uuid(&loan_id, "invalid loan id")?,
        payment_amount: parse_decimal(&req.payment_amount, "invalid payment amount")?,
    };

    let detail = loan_service.make_payment(cmd).await?;

    Ok(Json(ApiResponse::ok(detail)))
}

fn parse_uuid(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::InvalidArgument(message.to_string()))
}

fn parse_decimal(raw: &str, message: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw.trim()).map_err(|_| ApiError::InvalidArgument(message.to_string()))
}
