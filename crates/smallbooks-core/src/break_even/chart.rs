//! Chart-ready break-even series.
//!
//! Points along the consumer-unit axis with revenue and cost lines scaled
//! to the full timeline: the B2B channel contributes its committed volume
//! for every month, and fixed costs scale by the month count.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::break_even::model::BreakEvenConfig;
use crate::error::EngineError;
use crate::types::{round_cents, with_metadata, ComputationOutput, Money};
use crate::EngineResult;

const MIN_STEPS_FACTOR: Decimal = dec!(10);
const SPAN_FACTOR: Decimal = dec!(2);

/// One point on the cost-volume-profit chart. `units` is cumulative
/// consumer volume over the timeline; the cost lines cross revenue at the
/// break-even point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub units: Decimal,
    pub revenue: Money,
    pub variable_cost: Money,
    pub fixed_cost: Money,
    pub total_cost: Money,
}

/// Produce chart points at `unit_increment` steps from zero up to at least
/// twice the timeline break-even volume (or ten increments, whichever is
/// larger).
pub fn chart_points(
    config: &BreakEvenConfig,
    monthly_fixed_costs: Money,
    timeline_months: i64,
) -> EngineResult<Vec<ChartPoint>> {
    if config.unit_increment <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "unit_increment".into(),
            reason: format!("Chart step must be positive, got {}", config.unit_increment),
        });
    }

    let months = Decimal::from(timeline_months.max(1));
    let total_fixed = round_cents(monthly_fixed_costs * months);

    let (b2b_revenue, b2b_variable, b2b_contribution) = if config.b2b.enabled {
        let units = config.b2b.monthly_units * months;
        (
            round_cents(units * config.b2b.rate_per_unit),
            round_cents(units * config.b2b.cogs_per_unit),
            round_cents(units * (config.b2b.rate_per_unit - config.b2b.cogs_per_unit)),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    };

    // Timeline-scale solve for the axis span.
    let remaining_fixed = (total_fixed - b2b_contribution).max(Decimal::ZERO);
    let break_even_units = match config.consumer.contribution_margin() {
        Some(cm) => (remaining_fixed / cm).ceil(),
        None => Decimal::ZERO,
    };

    let max_units = (break_even_units * SPAN_FACTOR)
        .max(config.unit_increment * MIN_STEPS_FACTOR);
    let steps = (max_units / config.unit_increment).ceil();

    let (price, unit_cogs) = if config.consumer.enabled {
        (config.consumer.avg_price, config.consumer.avg_cogs)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let mut points = Vec::new();
    let mut step = Decimal::ZERO;
    while step <= steps {
        let units = step * config.unit_increment;
        let variable_cost = round_cents(units * unit_cogs + b2b_variable);
        points.push(ChartPoint {
            units,
            revenue: round_cents(units * price + b2b_revenue),
            variable_cost,
            fixed_cost: total_fixed,
            total_cost: round_cents(variable_cost + total_fixed),
        });
        step += Decimal::ONE;
    }

    Ok(points)
}

pub fn compute_break_even_chart(
    config: &BreakEvenConfig,
    monthly_fixed_costs: Money,
    timeline_months: i64,
) -> EngineResult<ComputationOutput<Vec<ChartPoint>>> {
    let start = Instant::now();
    let points = chart_points(config, monthly_fixed_costs, timeline_months)?;
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cost-Volume-Profit Chart Series",
        config,
        Vec::new(),
        elapsed,
        points,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::break_even::model::{B2bChannel, ConsumerChannel};
    use pretty_assertions::assert_eq;

    fn config() -> BreakEvenConfig {
        BreakEvenConfig {
            consumer: ConsumerChannel {
                enabled: true,
                avg_price: dec!(50),
                avg_cogs: dec!(20),
            },
            unit_increment: dec!(25),
            ..Default::default()
        }
    }

    #[test]
    fn test_axis_spans_twice_the_break_even_volume() {
        // 3,000/month over 12 months = 36,000 fixed; 36,000/30 = 1,200
        // break-even units, so the axis runs to at least 2,400.
        let points = chart_points(&config(), dec!(3000), 12).unwrap();

        let first = points.first().unwrap();
        let last = points.last().unwrap();
        assert_eq!(first.units, dec!(0));
        assert!(last.units >= dec!(2400));

        // Steps are exactly one increment apart.
        assert_eq!(points[1].units - points[0].units, dec!(25));
    }

    #[test]
    fn test_lines_cross_at_break_even() {
        let points = chart_points(&config(), dec!(3000), 12).unwrap();

        // At exactly 1,200 units: revenue 60,000 = 24,000 variable + 36,000 fixed.
        let at_be = points.iter().find(|p| p.units == dec!(1200)).unwrap();
        assert_eq!(at_be.revenue, dec!(60000.00));
        assert_eq!(at_be.total_cost, dec!(60000.00));

        // Below break-even the cost line sits above revenue, above it flips.
        let below = points.iter().find(|p| p.units == dec!(600)).unwrap();
        assert!(below.total_cost > below.revenue);
        let above = points.iter().find(|p| p.units == dec!(1800)).unwrap();
        assert!(above.total_cost < above.revenue);
    }

    #[test]
    fn test_b2b_floor_lifts_revenue_at_zero_units() {
        let mut cfg = config();
        cfg.b2b = B2bChannel {
            enabled: true,
            monthly_units: dec!(10),
            rate_per_unit: dec!(100),
            cogs_per_unit: dec!(40),
        };

        let points = chart_points(&cfg, dec!(3000), 12).unwrap();
        let first = &points[0];
        // 10 units × 12 months × $100 committed revenue at zero consumer units.
        assert_eq!(first.units, dec!(0));
        assert_eq!(first.revenue, dec!(12000.00));
        assert_eq!(first.variable_cost, dec!(4800.00));
    }

    #[test]
    fn test_minimum_span_without_break_even() {
        // Consumer channel disabled: no solve, but the chart still spans
        // ten increments.
        let mut cfg = config();
        cfg.consumer.enabled = false;

        let points = chart_points(&cfg, dec!(3000), 6).unwrap();
        assert_eq!(points.last().unwrap().units, dec!(250));
    }

    #[test]
    fn test_zero_increment_rejected() {
        let mut cfg = config();
        cfg.unit_increment = dec!(0);
        assert!(chart_points(&cfg, dec!(3000), 12).is_err());
    }
}
