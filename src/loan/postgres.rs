//! PostgreSQL implementation of the loan repository

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{BusinessError, StoreError};
use crate::loan::repository::{LatestLoanGuard, LoanRepository, PaymentDecision, SettledPayment};
use crate::loan::{Loan, LoanPayment, LoanStatus};

/// Row shape of the `loans` table
#[derive(Debug, sqlx::FromRow)]
struct LoanRow {
    id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    payment_duration_weeks: i32,
    payment_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = BusinessError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let loan = Loan {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            payment_duration_weeks: row.payment_duration_weeks,
            payment_amount: row.payment_amount,
            status: LoanStatus::parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        loan.validate()?;
        Ok(loan)
    }
}

/// Loan repository backed by a Postgres pool
#[derive(Clone)]
pub struct PgLoanRepository {
    db_pool: PgPool,
    transaction_timeout: Duration,
}

impl PgLoanRepository {
    /// Create a new repository; every transactional workflow is bounded by `transaction_timeout`
    pub fn new(db_pool: PgPool, transaction_timeout: Duration) -> Self {
        Self {
            db_pool,
            transaction_timeout,
        }
    }

    async fn begin_serializable(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.db_pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Run a workflow under the transaction deadline. Dropping an unfinished
    /// transaction rolls it back.
    async fn within_deadline<T, F>(&self, workflow: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.transaction_timeout, workflow).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = %self.transaction_timeout.as_millis(),
                    "Transaction deadline exceeded, rolled back"
                );
                Err(StoreError::Timeout(self.transaction_timeout))
            }
        }
    }
}

#[async_trait]
impl LoanRepository for PgLoanRepository {
    async fn create_loan(&self, loan: &Loan, guard: LatestLoanGuard) -> Result<(), StoreError> {
        self.within_deadline(async {
            let mut tx = self.begin_serializable().await?;
            let result = insert_unless_guarded(&mut tx, loan, guard).await;
            finish_transaction(result, tx).await
        })
        .await
    }

    async fn latest_loan(&self, user_id: Uuid) -> Result<Option<Loan>, StoreError> {
        let mut conn = self.db_pool.acquire().await?;
        fetch_latest_loan(&mut conn, user_id).await
    }

    async fn paid_amount(&self, loan_id: Uuid) -> Result<Decimal, StoreError> {
        let mut conn = self.db_pool.acquire().await?;
        fetch_paid_amount(&mut conn, loan_id).await
    }

    async fn make_payment(
        &self,
        loan_id: Uuid,
        decide: PaymentDecision,
    ) -> Result<SettledPayment, StoreError> {
        self.within_deadline(async {
            let mut tx = self.begin_serializable().await?;
            let result = record_decided_payment(&mut tx, loan_id, decide).await;
            finish_transaction(result, tx).await
        })
        .await
    }
}

/// Commit on success, roll back on failure. A failed rollback is reported
/// together with the error that caused it.
async fn finish_transaction<T>(
    result: Result<T, StoreError>,
    tx: Transaction<'_, Postgres>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if err.is_serialization_failure() {
                tracing::warn!(error = %err, "Serialization conflict, transaction rolled back");
            }
            match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback) => Err(StoreError::Rollback {
                    source: Box::new(err),
                    rollback,
                }),
            }
        }
    }
}

async fn insert_unless_guarded(
    conn: &mut PgConnection,
    loan: &Loan,
    guard: LatestLoanGuard,
) -> Result<(), StoreError> {
    let latest = fetch_latest_loan(conn, loan.user_id).await?;
    guard(latest.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO loans (
            id, user_id, amount, payment_duration_weeks,
            payment_amount, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(loan.id)
    .bind(loan.user_id)
    .bind(loan.amount)
    .bind(loan.payment_duration_weeks)
    .bind(loan.payment_amount)
    .bind(loan.status.as_str())
    .bind(loan.created_at)
    .bind(loan.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn record_decided_payment(
    conn: &mut PgConnection,
    loan_id: Uuid,
    decide: PaymentDecision,
) -> Result<SettledPayment, StoreError> {
    let loan = fetch_loan(conn, loan_id).await?;
    let paid_amount = fetch_paid_amount(conn, loan_id).await?;

    let outcome = decide(loan, paid_amount)?;

    sqlx::query(
        r#"
        INSERT INTO loan_payments (id, loan_id, amount, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(outcome.payment.id)
    .bind(outcome.payment.loan_id)
    .bind(outcome.payment.amount)
    .bind(outcome.payment.created_at)
    .bind(outcome.payment.updated_at)
    .execute(&mut *conn)
    .await?;

    if outcome.should_update_loan {
        sqlx::query("UPDATE loans SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(outcome.loan.status.as_str())
            .bind(outcome.loan.updated_at)
            .bind(outcome.loan.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(SettledPayment {
        paid_amount: paid_amount + outcome.payment.amount,
        loan: outcome.loan,
        payment: outcome.payment,
    })
}

async fn fetch_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Option<Loan>, StoreError> {
    let row = sqlx::query_as::<_, LoanRow>(
        r#"
        SELECT id, user_id, amount, payment_duration_weeks,
               payment_amount, status, created_at, updated_at
        FROM loans
        WHERE id = $1
        "#,
    )
    .bind(loan_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Loan::try_from).transpose()?)
}

async fn fetch_latest_loan(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Loan>, StoreError> {
    let row = sqlx::query_as::<_, LoanRow>(
        r#"
        SELECT id, user_id, amount, payment_duration_weeks,
               payment_amount, status, created_at, updated_at
        FROM loans
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Loan::try_from).transpose()?)
}

async fn fetch_paid_amount(conn: &mut PgConnection, loan_id: Uuid) -> Result<Decimal, StoreError> {
    let paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM loan_payments WHERE loan_id = $1",
    )
    .bind(loan_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(paid)
}

/// Payments of a loan in insertion order
pub async fn list_payments(pool: &PgPool, loan_id: Uuid) -> Result<Vec<LoanPayment>, StoreError> {
    let payments = sqlx::query_as::<_, LoanPayment>(
        r#"
        SELECT id, loan_id, amount, created_at, updated_at
        FROM loan_payments
        WHERE loan_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(loan_id)
    .fetch_all(pool)
    .await?;

    Ok(payments)
}
