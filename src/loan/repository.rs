//! Persistence seam for the loan workflows

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{BusinessError, StoreError};
use crate::loan::{Loan, LoanPayment, PaymentOutcome};

/// Decides whether a new loan may be written, given the user's most recent loan
pub type LatestLoanGuard = Box<dyn FnOnce(Option<&Loan>) -> Result<(), BusinessError> + Send>;

/// Decides what a payment writes, given the stored loan and the amount paid so far
pub type PaymentDecision =
    Box<dyn FnOnce(Option<Loan>, Decimal) -> Result<PaymentOutcome, BusinessError> + Send>;

/// State committed by a successful payment workflow
#[derive(Debug, Clone, PartialEq)]
pub struct SettledPayment {
    pub loan: Loan,
    pub payment: LoanPayment,
    /// Cumulative paid amount including `payment`
    pub paid_amount: Decimal,
}

/// Storage for loans and their payments.
///
/// `create_loan` and `make_payment` run their read, decide and write steps in
/// one transaction with serializable semantics; the callbacks carry the
/// domain decision while the implementation owns the transaction.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Insert `loan` unless `guard` rejects the user's latest loan
    async fn create_loan(&self, loan: &Loan, guard: LatestLoanGuard) -> Result<(), StoreError>;

    /// Most recently created loan of a user
    async fn latest_loan(&self, user_id: Uuid) -> Result<Option<Loan>, StoreError>;

    /// Sum of all payments of a loan, zero when there are none
    async fn paid_amount(&self, loan_id: Uuid) -> Result<Decimal, StoreError>;

    /// Record the payment chosen by `decide` and close the loan if asked to
    async fn make_payment(
        &self,
        loan_id: Uuid,
        decide: PaymentDecision,
    ) -> Result<SettledPayment, StoreError>;
}
