//! Loan domain: aggregates, billing rules, persistence and use cases

pub mod memory;
pub mod model;
pub mod payment;
pub mod postgres;
pub mod repository;
pub mod service;

pub use memory::InMemoryLoanRepository;
pub use model::{
    apply_payment, current_bill_amount, is_delinquent, outstanding_amount, Loan, LoanStatus,
    PaymentOutcome, DELINQUENCY_THRESHOLD_WEEKS,
};
pub use payment::LoanPayment;
pub use postgres::PgLoanRepository;
pub use repository::{LatestLoanGuard, LoanRepository, PaymentDecision, SettledPayment};
pub use service::{CreateLoanCommand, LoanDetail, LoanService, MakePaymentCommand};
