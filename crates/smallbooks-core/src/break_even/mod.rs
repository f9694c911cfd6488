pub mod chart;
pub mod model;

pub use chart::{chart_points, compute_break_even_chart, ChartPoint};
pub use model::{
    compute_break_even, compute_break_even_timeline, monthly_fixed_costs, solve_break_even,
    B2bChannel, BreakEvenConfig, BreakEvenResult, ConsumerChannel, FixedCostInputs,
    FixedCostToggles, TimelinePoint,
};
