//! Loan amortization schedules.
//!
//! Level-payment annuity schedules with skipped-payment capitalization and
//! per-payment overrides. The schedule is regenerated on every call from
//! the loan terms and its two sparse side-tables; it is never persisted.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ledger::Loan;
use crate::types::{round_cents, with_metadata, ComputationOutput, Money, Month};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Residual balance below which the loan counts as fully amortized.
const BALANCE_EPSILON: Decimal = dec!(0.01);

const MONTHS_PER_YEAR: Decimal = dec!(12);
const PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One scheduled payment. A skipped payment records zero payment and
/// principal while its interest capitalizes into the running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub number: u32,
    pub date: NaiveDate,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_balance: Money,
    pub skipped: bool,
    pub overridden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    /// Level payment from the annuity formula (`principal / n` at 0%).
    pub level_payment: Money,
    pub payment_count: u32,
    pub payments: Vec<PaymentRecord>,
    /// All interest accrued over the life of the loan, including interest
    /// capitalized during skip periods.
    pub total_interest: Money,
    pub total_paid: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the full payment-by-payment schedule for a loan.
///
/// The payment count is `term_months / 12 × payments_per_year`, truncated
/// toward an integer when the term is not divisible by the frequency. The
/// running balance is rounded to cents after every arithmetic step; the
/// final scheduled payment (when neither skipped nor overridden) is forced
/// to `balance + interest` so the balance lands on exactly zero.
pub fn compute_amortization_schedule(
    loan: &Loan,
) -> EngineResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_loan(loan)?;

    let n = payment_count(loan);
    let rate = periodic_rate(loan);
    let level_payment = level_payment(loan.principal, rate, n);

    let mut balance = round_cents(loan.principal);
    let mut payments = Vec::with_capacity(n as usize);
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for number in 1..=n {
        let interest = round_cents(balance * rate);
        let date = payment_date(loan, number)?;
        total_interest = round_cents(total_interest + interest);

        if loan.skipped_payments.contains(&number) {
            // Capitalization: the missed interest inflates the balance and
            // the schedule continues from there.
            balance = round_cents(balance + interest);
            payments.push(PaymentRecord {
                number,
                date,
                payment: Decimal::ZERO,
                interest,
                principal: Decimal::ZERO,
                ending_balance: balance,
                skipped: true,
                overridden: false,
            });
            continue;
        }

        let override_amount = loan.payment_overrides.get(&number).copied();
        let scheduled = if number == n {
            round_cents(balance + interest)
        } else {
            level_payment
        };
        let payment = override_amount.map(round_cents).unwrap_or(scheduled);

        let mut principal = round_cents(payment - interest);
        if principal > balance {
            // An oversized override pays the loan off; the balance never
            // goes negative.
            principal = balance;
        }
        balance = round_cents(balance - principal);
        total_paid = round_cents(total_paid + payment);

        payments.push(PaymentRecord {
            number,
            date,
            payment,
            interest,
            principal,
            ending_balance: balance,
            skipped: false,
            overridden: override_amount.is_some(),
        });
    }

    if balance.abs() > BALANCE_EPSILON {
        warnings.push(format!(
            "Schedule for loan '{}' ends with a residual balance of {balance}; \
             skipped payments or overrides left the loan not fully amortized",
            loan.name
        ));
    }

    let schedule = AmortizationSchedule {
        level_payment,
        payment_count: n,
        payments,
        total_interest,
        total_paid,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-Payment Amortization with Skip Capitalization",
        loan,
        warnings,
        elapsed,
        schedule,
    ))
}

/// Interest accrued per calendar month, skipped periods included: the
/// capitalized interest is still that month's interest accrual and the
/// balance-sheet liability grows by it.
pub fn interest_by_month(schedule: &AmortizationSchedule) -> BTreeMap<Month, Money> {
    let mut months: BTreeMap<Month, Money> = BTreeMap::new();
    for record in &schedule.payments {
        if record.interest.is_zero() {
            continue;
        }
        let entry = months.entry(Month::from_date(record.date)).or_default();
        *entry = round_cents(*entry + record.interest);
    }
    months
}

/// Cash actually paid per calendar month (skipped payments pay nothing).
pub fn cash_paid_by_month(schedule: &AmortizationSchedule) -> BTreeMap<Month, Money> {
    let mut months: BTreeMap<Month, Money> = BTreeMap::new();
    for record in &schedule.payments {
        if record.skipped || record.payment.is_zero() {
            continue;
        }
        let entry = months.entry(Month::from_date(record.date)).or_default();
        *entry = round_cents(*entry + record.payment);
    }
    months
}

/// Outstanding balance at the end of `as_of`: zero before origination,
/// the full principal before the first payment lands, then the ending
/// balance of the last payment dated in or before `as_of`.
pub fn balance_as_of(loan: &Loan, schedule: &AmortizationSchedule, as_of: Month) -> Money {
    if as_of < Month::from_date(loan.start_date) {
        return Decimal::ZERO;
    }
    schedule
        .payments
        .iter()
        .filter(|p| Month::from_date(p.date) <= as_of)
        .next_back()
        .map(|p| p.ending_balance)
        .unwrap_or(loan.principal)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn validate_loan(loan: &Loan) -> EngineResult<()> {
    if loan.payments_per_year == 0 {
        return Err(EngineError::InvalidInput {
            field: "payments_per_year".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if loan.principal < Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "principal".into(),
            reason: format!("Must be non-negative, got {}", loan.principal),
        });
    }
    if payment_count(loan) == 0 {
        return Err(EngineError::InvalidInput {
            field: "term_months".into(),
            reason: "Term and payment frequency produce zero scheduled payments".into(),
        });
    }
    Ok(())
}

fn payment_count(loan: &Loan) -> u32 {
    // trunc(term_months / 12 × payments_per_year)
    (loan.term_months as u64 * loan.payments_per_year as u64 / 12) as u32
}

fn periodic_rate(loan: &Loan) -> Decimal {
    loan.annual_rate_pct / PERCENT / Decimal::from(loan.payments_per_year)
}

/// Level payment via the annuity formula `P·r(1+r)^n / ((1+r)^n − 1)`.
fn level_payment(principal: Money, rate: Decimal, n: u32) -> Money {
    if rate.is_zero() {
        return round_cents(principal / Decimal::from(n));
    }
    let factor = (Decimal::ONE + rate).powi(n as i64);
    round_cents(principal * rate * factor / (factor - Decimal::ONE))
}

/// Payment `i` lands `round((12/ppy)·(i−1))` months after the first
/// payment date when one is configured, else `round((12/ppy)·i)` months
/// after the start date.
fn payment_date(loan: &Loan, number: u32) -> EngineResult<NaiveDate> {
    let period_months = MONTHS_PER_YEAR / Decimal::from(loan.payments_per_year);
    let (base, steps) = match loan.first_payment_date {
        Some(first) => (first, Decimal::from(number - 1)),
        None => (loan.start_date, Decimal::from(number)),
    };
    let offset = (period_months * steps)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let offset = offset.to_u32().ok_or_else(|| {
        EngineError::DateError(format!("Payment {number} offset out of range"))
    })?;
    base.checked_add_months(Months::new(offset))
        .ok_or_else(|| EngineError::DateError(format!("Payment {number} date overflows")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
