//! API handlers for the loan billing engine

pub mod health;
pub mod loan;

pub use health::{health_check, root};
pub use loan::{create_loan, get_current_loan, make_payment};
