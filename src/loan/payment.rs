//! Loan payment record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BusinessError;

/// One accepted payment against a loan. Never mutated once created.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct LoanPayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanPayment {
    /// Create a validated payment of `amount` for `loan_id`
    pub fn create(loan_id: Uuid, amount: Decimal) -> Result<Self, BusinessError> {
        let now = Utc::now();
        let payment = Self {
            id: Uuid::now_v7(),
            loan_id,
            amount,
            created_at: now,
            updated_at: now,
        };

        payment.validate()?;
        Ok(payment)
    }

    pub fn validate(&self) -> Result<(), BusinessError> {
        if self.id.is_nil() {
            return Err(BusinessError::PaymentEmptyId);
        }
        if self.loan_id.is_nil() {
            return Err(BusinessError::PaymentEmptyLoanId);
        }
        if self.amount <= Decimal::ZERO {
            return Err(BusinessError::PaymentInvalidAmount);
        }
        if self.created_at == DateTime::<Utc>::default() {
            return Err(BusinessError::PaymentEmptyCreatedAt);
        }
        if self.updated_at == DateTime::<Utc>::default() {
            return Err(BusinessError::PaymentEmptyUpdatedAt);
        }
        Ok(())
    }
}
