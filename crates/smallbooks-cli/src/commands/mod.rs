pub mod break_even;
pub mod ledger;
pub mod schedules;
