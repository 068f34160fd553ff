//! In-memory loan repository
//!
//! Each workflow holds a single lock for its whole read, decide and write
//! sequence, so concurrent callers observe the same serial history that
//! serializable isolation gives the Postgres repository. Used by tests and for
//! running the API without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::loan::repository::{LatestLoanGuard, LoanRepository, PaymentDecision, SettledPayment};
use crate::loan::{Loan, LoanPayment};

#[derive(Default)]
struct Tables {
    loans: HashMap<Uuid, Loan>,
    payments: Vec<LoanPayment>,
}

impl Tables {
    fn latest_loan(&self, user_id: Uuid) -> Option<&Loan> {
        self.loans
            .values()
            .filter(|loan| loan.user_id == user_id)
            .max_by_key(|loan| loan.created_at)
    }

    fn paid_amount(&self, loan_id: Uuid) -> Decimal {
        self.payments
            .iter()
            .filter(|payment| payment.loan_id == loan_id)
            .map(|payment| payment.amount)
            .sum()
    }

    fn insert_loan(&mut self, loan: Loan) -> Result<(), StoreError> {
        if self.loans.contains_key(&loan.id) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "duplicate loan id {}",
                loan.id
            ))));
        }
        self.loans.insert(loan.id, loan);
        Ok(())
    }
}

/// Thread-safe in-memory store for loans and payments
#[derive(Default, Clone)]
pub struct InMemoryLoanRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLoanRepository {
    /// Creates a new, empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a loan as-is, bypassing the ongoing-loan guard
    pub async fn insert_loan(&self, loan: Loan) -> Result<(), StoreError> {
        self.tables.lock().await.insert_loan(loan)
    }

    /// Store a payment as-is, bypassing the billing rules
    pub async fn insert_payment(&self, payment: LoanPayment) {
        self.tables.lock().await.payments.push(payment);
    }

    /// Loan by id
    pub async fn get_loan(&self, loan_id: Uuid) -> Option<Loan> {
        self.tables.lock().await.loans.get(&loan_id).cloned()
    }

    /// Payments of a loan in insertion order
    pub async fn payments(&self, loan_id: Uuid) -> Vec<LoanPayment> {
        self.tables
            .lock()
            .await
            .payments
            .iter()
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn create_loan(&self, loan: &Loan, guard: LatestLoanGuard) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        guard(tables.latest_loan(loan.user_id))?;
        tables.insert_loan(loan.clone())
    }

    async fn latest_loan(&self, user_id: Uuid) -> Result<Option<Loan>, StoreError> {
        Ok(self.tables.lock().await.latest_loan(user_id).cloned())
    }

    async fn paid_amount(&self, loan_id: Uuid) -> Result<Decimal, StoreError> {
        Ok(self.tables.lock().await.paid_amount(loan_id))
    }

    async fn make_payment(
        &self,
        loan_id: Uuid,
        decide: PaymentDecision,
    ) -> Result<SettledPayment, StoreError> {
        let mut tables = self.tables.lock().await;
        let loan = tables.loans.get(&loan_id).cloned();
        let paid_amount = tables.paid_amount(loan_id);

        let outcome = decide(loan, paid_amount)?;

        tables.payments.push(outcome.payment.clone());
        if outcome.should_update_loan {
            tables.loans.insert(outcome.loan.id, outcome.loan.clone());
        }

        Ok(SettledPayment {
            paid_amount: paid_amount + outcome.payment.amount,
            loan: outcome.loan,
            payment: outcome.payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusinessError;
    use crate::loan::{apply_payment, LoanStatus};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn loan_days_ago(user_id: Uuid, days: i64) -> Loan {
        let created_at = Utc::now() - Duration::days(days);
        Loan {
            id: Uuid::now_v7(),
            user_id,
            amount: dec!(1000),
            payment_duration_weeks: 10,
            payment_amount: dec!(1000),
            status: LoanStatus::Ongoing,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_latest_loan_is_newest_by_creation() {
        let repo = InMemoryLoanRepository::new();
        let user_id = Uuid::new_v4();
        let older = loan_days_ago(user_id, 30);
        let newer = loan_days_ago(user_id, 2);

        repo.insert_loan(newer.clone()).await.unwrap();
        repo.insert_loan(older).await.unwrap();
        repo.insert_loan(loan_days_ago(Uuid::new_v4(), 1)).await.unwrap();

        assert_eq!(repo.latest_loan(user_id).await.unwrap(), Some(newer));
        assert_eq!(repo.latest_loan(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_guard_rejection_writes_nothing() {
        let repo = InMemoryLoanRepository::new();
        let loan = loan_days_ago(Uuid::new_v4(), 0);

        let result = repo
            .create_loan(&loan, Box::new(|_| Err(BusinessError::StillHasOngoingLoan)))
            .await;

        assert_eq!(
            result.unwrap_err().business(),
            Some(&BusinessError::StillHasOngoingLoan)
        );
        assert!(repo.get_loan(loan.id).await.is_none());
    }

    #[tokio::test]
    async fn test_paid_amount_defaults_to_zero() {
        let repo = InMemoryLoanRepository::new();
        assert_eq!(repo.paid_amount(Uuid::new_v4()).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_make_payment_rejected_decision_writes_nothing() {
        let repo = InMemoryLoanRepository::new();
        let loan = loan_days_ago(Uuid::new_v4(), 7);
        repo.insert_loan(loan.clone()).await.unwrap();

        let now = Utc::now();
        let result = repo
            .make_payment(
                loan.id,
                Box::new(move |loan, paid| apply_payment(loan, now, paid, dec!(55))),
            )
            .await;

        assert_eq!(
            result.unwrap_err().business(),
            Some(&BusinessError::NotExactPaymentAmount)
        );
        assert!(repo.payments(loan.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_make_payment_closes_loan_on_final_payment() {
        let repo = InMemoryLoanRepository::new();
        let loan = loan_days_ago(Uuid::new_v4(), 70);
        repo.insert_loan(loan.clone()).await.unwrap();
        repo.insert_payment(LoanPayment::create(loan.id, dec!(900)).unwrap())
            .await;

        let now = Utc::now();
        let settled = repo
            .make_payment(
                loan.id,
                Box::new(move |loan, paid| apply_payment(loan, now, paid, dec!(100))),
            )
            .await
            .unwrap();

        assert_eq!(settled.paid_amount, dec!(1000));
        assert_eq!(settled.loan.status, LoanStatus::Paid);
        assert_eq!(
            repo.get_loan(loan.id).await.map(|loan| loan.status),
            Some(LoanStatus::Paid)
        );
        assert_eq!(repo.payments(loan.id).await.len(), 2);
    }
}
