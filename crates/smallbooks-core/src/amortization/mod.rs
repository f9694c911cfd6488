pub mod schedule;

pub use schedule::{
    balance_as_of, cash_paid_by_month, compute_amortization_schedule, interest_by_month,
    AmortizationSchedule, PaymentRecord,
};
