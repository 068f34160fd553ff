//! Loan aggregate: amortization, weekly billing and delinquency rules

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BusinessError;
use crate::loan::payment::LoanPayment;

/// Number of unpaid weeks tolerated before a loan is considered delinquent
pub const DELINQUENCY_THRESHOLD_WEEKS: i64 = 2;

const WEEK_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Ongoing,
    Paid,
}

impl LoanStatus {
    /// Storage representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Ongoing => "ongoing",
            LoanStatus::Paid => "paid",
        }
    }

    /// Parse the storage representation of a status
    pub fn parse(s: &str) -> Result<Self, BusinessError> {
        match s {
            "ongoing" => Ok(LoanStatus::Ongoing),
            "paid" => Ok(LoanStatus::Paid),
            _ => Err(BusinessError::LoanInvalidStatus),
        }
    }
}

/// Loan model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Principal amount
    pub amount: Decimal,
    pub payment_duration_weeks: i32,
    /// Principal plus interest, fixed at creation
    pub payment_amount: Decimal,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of accepting a payment against a loan.
///
/// `loan` is the transaction-local copy of the loan; it only needs to be
/// written back when `should_update_loan` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub loan: Loan,
    pub payment: LoanPayment,
    pub should_update_loan: bool,
}

impl Loan {
    /// Create a new ongoing loan for `user_id`.
    ///
    /// The total payment amount is the principal plus the interest rounded up
    /// to a whole unit.
    pub fn create(
        user_id: Uuid,
        amount: Decimal,
        payment_duration_weeks: i32,
        interest_rate: Decimal,
    ) -> Result<Self, BusinessError> {
        let mut interest = amount
            .checked_mul(interest_rate)
            .ok_or(BusinessError::LoanInvalidAmount)?
            .round_dp_with_strategy(0, RoundingStrategy::AwayFromZero);
        // A product below the smallest representable scale comes back as zero
        if interest.is_zero() && amount > Decimal::ZERO && interest_rate > Decimal::ZERO {
            interest = Decimal::ONE;
        }
        let payment_amount = amount
            .checked_add(interest)
            .ok_or(BusinessError::LoanInvalidAmount)?;

        let now = Utc::now();
        let loan = Self {
            id: Uuid::now_v7(),
            user_id,
            amount,
            payment_duration_weeks,
            payment_amount,
            status: LoanStatus::Ongoing,
            created_at: now,
            updated_at: now,
        };

        loan.validate()?;
        Ok(loan)
    }

    /// Check every field invariant, failing with the first violation
    pub fn validate(&self) -> Result<(), BusinessError> {
        if self.id.is_nil() {
            return Err(BusinessError::LoanEmptyId);
        }
        if self.user_id.is_nil() {
            return Err(BusinessError::LoanEmptyUserId);
        }
        if self.amount <= Decimal::ZERO {
            return Err(BusinessError::LoanInvalidAmount);
        }
        if self.payment_duration_weeks <= 0 {
            return Err(BusinessError::LoanInvalidPaymentDurationWeeks);
        }
        if self.payment_amount <= Decimal::ZERO {
            return Err(BusinessError::LoanInvalidPaymentAmount);
        }
        if self.created_at == DateTime::<Utc>::default() {
            return Err(BusinessError::LoanEmptyCreatedAt);
        }
        if self.updated_at == DateTime::<Utc>::default() {
            return Err(BusinessError::LoanEmptyUpdatedAt);
        }
        Ok(())
    }

    /// Reject creation while the same user still has an ongoing loan
    pub fn validate_against_latest(&self, latest: Option<&Loan>) -> Result<(), BusinessError> {
        match latest {
            Some(latest) if latest.user_id == self.user_id && latest.status == LoanStatus::Ongoing => {
                Err(BusinessError::StillHasOngoingLoan)
            }
            _ => Ok(()),
        }
    }

    /// Monday 00:00 UTC of the calendar week the loan was created in
    pub fn billing_anchor(&self) -> DateTime<Utc> {
        let created = self.created_at.date_naive();
        let monday = created - Duration::days(i64::from(created.weekday().num_days_from_monday()));
        Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
    }

    /// Whole weeks elapsed between the billing anchor and `now`, never negative
    pub fn current_week(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.billing_anchor()).num_seconds();
        if elapsed <= 0 {
            return 0;
        }
        elapsed / WEEK_SECONDS
    }

    /// Weekly installment, truncated to a whole unit so the last week absorbs the remainder
    pub fn weekly_payment_amount(&self) -> Decimal {
        if self.payment_duration_weeks <= 0 {
            return Decimal::ZERO;
        }
        (self.payment_amount / Decimal::from(self.payment_duration_weeks)).trunc()
    }

    /// Total obligation minus payments, floored at zero
    pub fn outstanding_amount(&self, paid_amount: Decimal) -> Decimal {
        (self.payment_amount - paid_amount).max(Decimal::ZERO)
    }

    /// Amount owed for the weeks elapsed at `now`, net of `paid_amount`
    pub fn current_bill_amount(&self, now: DateTime<Utc>, paid_amount: Decimal) -> Decimal {
        let current_week = self.current_week(now);
        let obligation = if current_week >= i64::from(self.payment_duration_weeks) {
            self.payment_amount
        } else {
            self.weekly_payment_amount() * Decimal::from(current_week)
        };

        (obligation - paid_amount).max(Decimal::ZERO)
    }

    /// Whether more than [`DELINQUENCY_THRESHOLD_WEEKS`] weeks are unpaid at `now`
    pub fn is_delinquent(&self, now: DateTime<Utc>, paid_amount: Decimal) -> bool {
        if self.status == LoanStatus::Paid || self.payment_amount == paid_amount {
            return false;
        }

        let weekly = self.weekly_payment_amount();
        if weekly.is_zero() {
            return false;
        }

        let unpaid_weeks = (self.current_bill_amount(now, paid_amount) / weekly)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        unpaid_weeks > Decimal::from(DELINQUENCY_THRESHOLD_WEEKS)
    }

    /// Accept `payment_amount` if it settles exactly the current bill.
    ///
    /// The loan is marked paid when this payment completes the total payment
    /// amount; otherwise it is returned untouched.
    pub fn apply_payment(
        mut self,
        now: DateTime<Utc>,
        paid_amount: Decimal,
        payment_amount: Decimal,
    ) -> Result<PaymentOutcome, BusinessError> {
        let bill_amount = self.current_bill_amount(now, paid_amount);
        if bill_amount.is_zero() {
            return Err(BusinessError::CurrentWeekAlreadyPaid);
        }
        if bill_amount != payment_amount {
            return Err(BusinessError::NotExactPaymentAmount);
        }

        let payment = LoanPayment::create(self.id, payment_amount)?;

        let should_update_loan = paid_amount + payment_amount == self.payment_amount;
        if should_update_loan {
            self.status = LoanStatus::Paid;
            self.updated_at = now;
        }

        Ok(PaymentOutcome {
            loan: self,
            payment,
            should_update_loan,
        })
    }
}

/// Bill for a possibly absent loan; an absent loan owes nothing
pub fn current_bill_amount(loan: Option<&Loan>, now: DateTime<Utc>, paid_amount: Decimal) -> Decimal {
    loan.map_or(Decimal::ZERO, |loan| loan.current_bill_amount(now, paid_amount))
}

/// Outstanding amount for a possibly absent loan
pub fn outstanding_amount(loan: Option<&Loan>, paid_amount: Decimal) -> Decimal {
    loan.map_or(Decimal::ZERO, |loan| loan.outstanding_amount(paid_amount))
}

/// Delinquency for a possibly absent loan; an absent loan is never delinquent
pub fn is_delinquent(loan: Option<&Loan>, now: DateTime<Utc>, paid_amount: Decimal) -> bool {
    loan.is_some_and(|loan| loan.is_delinquent(now, paid_amount))
}

/// Apply a payment to a possibly absent loan
pub fn apply_payment(
    loan: Option<Loan>,
    now: DateTime<Utc>,
    paid_amount: Decimal,
    payment_amount: Decimal,
) -> Result<PaymentOutcome, BusinessError> {
    loan.ok_or(BusinessError::LoanNotFound)?
        .apply_payment(now, paid_amount, payment_amount)
}
