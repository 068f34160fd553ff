//! Loan service layer - use cases for creating, inspecting and paying loans

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{BusinessError, StoreError};
use crate::loan::repository::LoanRepository;
use crate::loan::{apply_payment, Loan, LoanStatus};

/// Input for creating a loan
#[derive(Debug, Clone)]
pub struct CreateLoanCommand {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub payment_duration_weeks: i32,
}

/// Input for paying the current bill of a loan
#[derive(Debug, Clone)]
pub struct MakePaymentCommand {
    pub loan_id: Uuid,
    pub payment_amount: Decimal,
}

/// Loan together with its billing state at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanDetail {
    pub loan: Loan,
    pub outstanding_amount: Decimal,
    pub current_bill_amount: Decimal,
    pub is_delinquent: bool,
}

impl LoanDetail {
    fn at(loan: Loan, now: DateTime<Utc>, paid_amount: Decimal) -> Self {
        Self {
            outstanding_amount: loan.outstanding_amount(paid_amount),
            current_bill_amount: loan.current_bill_amount(now, paid_amount),
            is_delinquent: loan.is_delinquent(now, paid_amount),
            loan,
        }
    }
}

/// Loan service for managing loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    repo: Arc<dyn LoanRepository>,
    interest_rate: Decimal,
}

impl LoanService {
    /// Create a new loan service charging `interest_rate` on new loans
    pub fn new(repo: Arc<dyn LoanRepository>, interest_rate: Decimal) -> Self {
        Self {
            repo,
            interest_rate,
        }
    }

    /// Create a loan unless the user still has an ongoing one
    pub async fn create_loan(&self, cmd: CreateLoanCommand) -> Result<Loan, BusinessError> {
        let loan = Loan::create(
            cmd.user_id,
            cmd.amount,
            cmd.payment_duration_weeks,
            self.interest_rate,
        )?;

        let candidate = loan.clone();
        self.repo
            .create_loan(
                &loan,
                Box::new(move |latest| candidate.validate_against_latest(latest)),
            )
            .await
            .map_err(|err| ensure_business_error(err, "create_loan"))?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            amount = %loan.amount,
            payment_amount = %loan.payment_amount,
            weeks = loan.payment_duration_weeks,
            "Loan created"
        );

        Ok(loan)
    }

    /// Billing detail of the user's ongoing loan
    pub async fn get_current_loan(&self, user_id: Uuid) -> Result<LoanDetail, BusinessError> {
        let latest = self
            .repo
            .latest_loan(user_id)
            .await
            .map_err(|err| ensure_business_error(err, "get_current_loan"))?;

        let loan = match latest {
            Some(loan) if loan.status == LoanStatus::Ongoing => loan,
            _ => return Err(BusinessError::LoanNotFound),
        };

        let now = Utc::now();
        let paid_amount = self
            .repo
            .paid_amount(loan.id)
            .await
            .map_err(|err| ensure_business_error(err, "get_current_loan"))?;

        Ok(LoanDetail::at(loan, now, paid_amount))
    }

    /// Pay exactly the current bill of a loan
    pub async fn make_payment(&self, cmd: MakePaymentCommand) -> Result<LoanDetail, BusinessError> {
        let now = Utc::now();
        let payment_amount = cmd.payment_amount;

        let settled = self
            .repo
            .make_payment(
                cmd.loan_id,
                Box::new(move |loan, paid_amount| {
                    apply_payment(loan, now, paid_amount, payment_amount)
                }),
            )
            .await
            .map_err(|err| ensure_business_error(err, "make_payment"))?;

        tracing::info!(
            loan_id = %settled.loan.id,
            payment_id = %settled.payment.id,
            amount = %settled.payment.amount,
            paid_amount = %settled.paid_amount,
            "Loan payment recorded"
        );
        if settled.loan.status == LoanStatus::Paid {
            tracing::info!(loan_id = %settled.loan.id, "Loan fully paid");
        }

        Ok(LoanDetail::at(settled.loan, now, settled.paid_amount))
    }
}

/// Pass business errors through; hide everything else behind [`BusinessError::Unexpected`]
fn ensure_business_error(err: StoreError, operation: &'static str) -> BusinessError {
    if let Some(business) = err.business() {
        tracing::warn!(operation, error = %business, kind = ?business.kind(), "Request rejected");
        return business.clone();
    }

    tracing::error!(
        operation,
        error = %err,
        retryable = err.is_serialization_failure(),
        "Unexpected storage failure"
    );
    BusinessError::Unexpected
}
