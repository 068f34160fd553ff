//! Postgres repository tests
//!
//! Run with `TEST_DATABASE_URL` pointing at a disposable database and
//! `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    use loan_billing_engine::error::BusinessError;
    use loan_billing_engine::loan::postgres::list_payments;
    use loan_billing_engine::loan::{
        CreateLoanCommand, Loan, LoanRepository, LoanService, LoanStatus, MakePaymentCommand,
        PgLoanRepository,
    };

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/loan_billing_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn setup_service(pool: &PgPool) -> LoanService {
        let repo = PgLoanRepository::new(pool.clone(), StdDuration::from_secs(5));
        LoanService::new(Arc::new(repo), dec!(0.10))
    }

    /// Insert a loan created `weeks_ago` whole weeks in the past
    async fn seed_loan(pool: &PgPool, weeks_ago: i64) -> Loan {
        let mut loan = Loan::create(Uuid::new_v4(), dec!(1000), 10, Decimal::ZERO).unwrap();
        loan.created_at = Utc::now() - Duration::weeks(weeks_ago);
        loan.updated_at = loan.created_at;

        let repo = PgLoanRepository::new(pool.clone(), StdDuration::from_secs(5));
        repo.create_loan(&loan, Box::new(|_| Ok(()))).await.unwrap();
        loan
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_and_read_back() {
        let pool = setup_test_db().await;
        let service = setup_service(&pool);
        let user_id = Uuid::new_v4();

        let loan = service
            .create_loan(CreateLoanCommand {
                user_id,
                amount: dec!(5_000_000),
                payment_duration_weeks: 50,
            })
            .await
            .unwrap();

        let detail = service.get_current_loan(user_id).await.unwrap();
        assert_eq!(detail.loan.id, loan.id);
        assert_eq!(detail.loan.payment_amount, dec!(5_500_000));
        assert_eq!(detail.outstanding_amount, dec!(5_500_000));
        assert!(!detail.is_delinquent);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_creates_for_one_user() {
        let pool = setup_test_db().await;
        let service = Arc::new(setup_service(&pool));
        let user_id = Uuid::new_v4();
        let cmd = CreateLoanCommand {
            user_id,
            amount: dec!(1000),
            payment_duration_weeks: 10,
        };

        let (first, second) = tokio::join!(
            service.create_loan(cmd.clone()),
            service.create_loan(cmd.clone())
        );

        // Exactly one wins; the loser sees the ongoing loan or loses the
        // serialization race and is reported as unexpected
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                BusinessError::StillHasOngoingLoan | BusinessError::Unexpected
            ));
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_payments_on_one_loan() {
        let pool = setup_test_db().await;
        let service = Arc::new(setup_service(&pool));
        let loan = seed_loan(&pool, 3).await;
        let cmd = MakePaymentCommand {
            loan_id: loan.id,
            payment_amount: dec!(300),
        };

        let (first, second) = tokio::join!(
            service.make_payment(cmd.clone()),
            service.make_payment(cmd.clone())
        );

        // The loser either sees the settled bill or loses the serialization race
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                BusinessError::CurrentWeekAlreadyPaid | BusinessError::Unexpected
            ));
        }

        let payments = list_payments(&pool, loan.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, dec!(300));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_payment_closes_loan_atomically() {
        let pool = setup_test_db().await;
        let service = setup_service(&pool);
        let loan = seed_loan(&pool, 12).await;

        let detail = service
            .make_payment(MakePaymentCommand {
                loan_id: loan.id,
                payment_amount: dec!(1000),
            })
            .await
            .unwrap();
        assert_eq!(detail.loan.status, LoanStatus::Paid);

        let status: String = sqlx::query_scalar("SELECT status FROM loans WHERE id = $1")
            .bind(loan.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "paid");
        assert_eq!(list_payments(&pool, loan.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_rejected_payment_writes_nothing() {
        let pool = setup_test_db().await;
        let service = setup_service(&pool);
        let loan = seed_loan(&pool, 3).await;

        let result = service
            .make_payment(MakePaymentCommand {
                loan_id: loan.id,
                payment_amount: dec!(299),
            })
            .await;

        assert_eq!(result, Err(BusinessError::NotExactPaymentAmount));
        assert!(list_payments(&pool, loan.id).await.unwrap().is_empty());
    }
}
