pub mod schedule;

pub use schedule::{
    accumulated_through, compute_depreciation_schedule, monthly_depreciation, net_book_value,
    DepreciationSchedule,
};
