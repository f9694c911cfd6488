//! Dual-channel contribution-margin break-even model.
//!
//! Two independent sales channels: a variable-volume consumer channel and a
//! committed-volume B2B channel. B2B contribution offsets fixed costs
//! first; the solve finds the consumer unit volume covering the remainder.
//! When neither channel can cover fixed costs the result says so
//! (`is_valid = false`) instead of guessing.

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{round_cents, with_metadata, ComputationOutput, Money, Month, MonthRange};
use crate::EngineResult;

const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-unit consumer channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerChannel {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub avg_price: Money,
    #[serde(default)]
    pub avg_cogs: Money,
}

impl ConsumerChannel {
    /// Per-unit contribution margin; `None` when the channel cannot carry
    /// the solve (disabled, non-positive price, or non-positive margin).
    pub fn contribution_margin(&self) -> Option<Money> {
        if !self.enabled || self.avg_price <= Decimal::ZERO {
            return None;
        }
        let cm = round_cents(self.avg_price - self.avg_cogs);
        (cm > Decimal::ZERO).then_some(cm)
    }
}

/// Committed-volume B2B channel: a fixed monthly unit count at a fixed
/// rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct B2bChannel {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub monthly_units: Decimal,
    #[serde(default)]
    pub rate_per_unit: Money,
    #[serde(default)]
    pub cogs_per_unit: Money,
}

impl B2bChannel {
    pub fn monthly_contribution(&self) -> Money {
        if !self.enabled {
            return Decimal::ZERO;
        }
        round_cents(self.monthly_units * (self.rate_per_unit - self.cogs_per_unit))
    }

    pub fn monthly_revenue(&self) -> Money {
        if !self.enabled {
            return Decimal::ZERO;
        }
        round_cents(self.monthly_units * self.rate_per_unit)
    }
}

/// Which fixed-cost sources participate in the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCostToggles {
    #[serde(default = "default_true")]
    pub include_budget: bool,
    #[serde(default = "default_true")]
    pub include_depreciation: bool,
    #[serde(default = "default_true")]
    pub include_loan_interest: bool,
    #[serde(default = "default_true")]
    pub include_asset_purchases: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FixedCostToggles {
    fn default() -> Self {
        FixedCostToggles {
            include_budget: true,
            include_depreciation: true,
            include_loan_interest: true,
            include_asset_purchases: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenConfig {
    #[serde(default)]
    pub consumer: ConsumerChannel,
    #[serde(default)]
    pub b2b: B2bChannel,
    #[serde(default)]
    pub fixed_costs: FixedCostToggles,
    /// Chart step size on the consumer-unit axis.
    #[serde(default = "default_unit_increment")]
    pub unit_increment: Decimal,
    /// Local timeline override; callers fall back to the app-wide timeline
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<MonthRange>,
}

fn default_unit_increment() -> Decimal {
    dec!(10)
}

/// Month-indexed fixed-cost sources, assembled by the caller from budget
/// figures and the computed depreciation/amortization schedules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCostInputs {
    #[serde(default)]
    pub budget_by_month: BTreeMap<Month, Money>,
    #[serde(default)]
    pub depreciation_by_month: BTreeMap<Month, Money>,
    #[serde(default)]
    pub loan_interest_by_month: BTreeMap<Month, Money>,
    /// One-time asset purchase costs, amortized evenly over the timeline
    /// when the toggle is on.
    #[serde(default)]
    pub one_time_asset_costs: Money,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenResult {
    /// False when no finite break-even exists; the remaining figures are
    /// zeroed and must not be used.
    pub is_valid: bool,
    pub monthly_fixed_costs: Money,
    pub consumer_contribution_margin: Money,
    pub b2b_monthly_contribution: Money,
    /// Consumer units required after B2B's contribution offsets fixed
    /// costs (whole units; partial units cannot be sold).
    pub consumer_units_needed: Decimal,
    /// Consumer units plus the committed B2B volume.
    pub break_even_units: Decimal,
    pub break_even_revenue: Money,
    /// Weighted contribution margin percent at break-even volume; present
    /// only for a valid break-even with positive revenue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_contribution_margin_pct: Option<Decimal>,
}

impl BreakEvenResult {
    fn invalid(monthly_fixed_costs: Money, consumer_cm: Money, b2b_contribution: Money) -> Self {
        BreakEvenResult {
            is_valid: false,
            monthly_fixed_costs,
            consumer_contribution_margin: consumer_cm,
            b2b_monthly_contribution: b2b_contribution,
            consumer_units_needed: Decimal::ZERO,
            break_even_units: Decimal::ZERO,
            break_even_revenue: Decimal::ZERO,
            weighted_contribution_margin_pct: None,
        }
    }
}

/// One month of the progress-tracking timeline: that month's fixed costs
/// and the revenue target actuals are compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub month: Month,
    pub fixed_costs: Money,
    pub is_valid: bool,
    pub consumer_units_needed: Decimal,
    pub required_revenue: Money,
}

// ---------------------------------------------------------------------------
// Solve
// ---------------------------------------------------------------------------

/// Solve for break-even volume against one month's fixed costs.
pub fn solve_break_even(config: &BreakEvenConfig, monthly_fixed_costs: Money) -> BreakEvenResult {
    let consumer_cm = config.consumer.contribution_margin();
    let b2b_contribution = config.b2b.monthly_contribution();
    let cm_for_report = consumer_cm.unwrap_or(Decimal::ZERO);

    let remaining_fixed = (monthly_fixed_costs - b2b_contribution).max(Decimal::ZERO);

    let consumer_units = match consumer_cm {
        Some(cm) => (remaining_fixed / cm).ceil(),
        // No workable consumer channel: valid only if committed B2B volume
        // alone already covers fixed costs.
        None => {
            if config.b2b.enabled && remaining_fixed.is_zero() && b2b_contribution > Decimal::ZERO {
                Decimal::ZERO
            } else {
                return BreakEvenResult::invalid(
                    monthly_fixed_costs,
                    cm_for_report,
                    b2b_contribution,
                );
            }
        }
    };

    let b2b_units = if config.b2b.enabled {
        config.b2b.monthly_units
    } else {
        Decimal::ZERO
    };
    let consumer_revenue = round_cents(consumer_units * config.consumer.avg_price);
    let consumer_variable = round_cents(consumer_units * config.consumer.avg_cogs);
    let b2b_variable = if config.b2b.enabled {
        round_cents(config.b2b.monthly_units * config.b2b.cogs_per_unit)
    } else {
        Decimal::ZERO
    };

    let break_even_revenue = round_cents(consumer_revenue + config.b2b.monthly_revenue());
    let total_variable = round_cents(consumer_variable + b2b_variable);

    let weighted_cm_pct = if break_even_revenue > Decimal::ZERO {
        Some(
            ((break_even_revenue - total_variable) / break_even_revenue * HUNDRED)
                .round_dp(2),
        )
    } else {
        None
    };

    BreakEvenResult {
        is_valid: true,
        monthly_fixed_costs,
        consumer_contribution_margin: cm_for_report,
        b2b_monthly_contribution: b2b_contribution,
        consumer_units_needed: consumer_units,
        break_even_units: consumer_units + b2b_units,
        break_even_revenue,
        weighted_contribution_margin_pct: weighted_cm_pct,
    }
}

/// Assemble one month's fixed costs from the toggled sources. One-time
/// asset costs spread evenly across the timeline.
pub fn monthly_fixed_costs(
    config: &BreakEvenConfig,
    inputs: &FixedCostInputs,
    month: Month,
    timeline_months: i64,
) -> Money {
    let toggles = &config.fixed_costs;
    let mut total = Decimal::ZERO;

    if toggles.include_budget {
        if let Some(amount) = inputs.budget_by_month.get(&month) {
            total = round_cents(total + amount);
        }
    }
    if toggles.include_depreciation {
        if let Some(amount) = inputs.depreciation_by_month.get(&month) {
            total = round_cents(total + amount);
        }
    }
    if toggles.include_loan_interest {
        if let Some(amount) = inputs.loan_interest_by_month.get(&month) {
            total = round_cents(total + amount);
        }
    }
    if toggles.include_asset_purchases && timeline_months > 0 {
        total = round_cents(total + inputs.one_time_asset_costs / Decimal::from(timeline_months));
    }

    total
}

// ---------------------------------------------------------------------------
// Enveloped entry points
// ---------------------------------------------------------------------------

pub fn compute_break_even(
    config: &BreakEvenConfig,
    monthly_fixed_costs: Money,
) -> EngineResult<ComputationOutput<BreakEvenResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = solve_break_even(config, monthly_fixed_costs);
    if !result.is_valid {
        warnings.push(
            "No finite break-even: no enabled channel has positive contribution \
             margin covering fixed costs"
                .to_string(),
        );
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Dual-Channel Contribution-Margin Break-Even",
        config,
        warnings,
        elapsed,
        result,
    ))
}

/// Per-month solve across a timeline. Fixed costs are reassembled for each
/// month, so schedules that taper (declining-balance depreciation, loan
/// payoff) lower the later targets.
pub fn compute_break_even_timeline(
    config: &BreakEvenConfig,
    inputs: &FixedCostInputs,
    range: &MonthRange,
) -> EngineResult<ComputationOutput<Vec<TimelinePoint>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let timeline_months = range.len();
    let mut points = Vec::with_capacity(timeline_months as usize);
    for month in range.iter() {
        let fixed = monthly_fixed_costs(config, inputs, month, timeline_months);
        let solved = solve_break_even(config, fixed);
        points.push(TimelinePoint {
            month,
            fixed_costs: fixed,
            is_valid: solved.is_valid,
            consumer_units_needed: solved.consumer_units_needed,
            required_revenue: solved.break_even_revenue,
        });
    }

    if points.iter().any(|p| !p.is_valid) {
        warnings.push("Some months have no reachable break-even".to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly Break-Even Timeline",
        config,
        warnings,
        elapsed,
        points,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn consumer_only(price: Money, cogs: Money) -> BreakEvenConfig {
        BreakEvenConfig {
            consumer: ConsumerChannel {
                enabled: true,
                avg_price: price,
                avg_cogs: cogs,
            },
            ..Default::default()
        }
    }

    fn with_b2b(mut config: BreakEvenConfig, units: Decimal, rate: Money, cogs: Money) -> BreakEvenConfig {
        config.b2b = B2bChannel {
            enabled: true,
            monthly_units: units,
            rate_per_unit: rate,
            cogs_per_unit: cogs,
        };
        config
    }

    #[test]
    fn test_consumer_only_scenario() {
        // $50 price, $20 cogs, $3,000 fixed: 100 units, $5,000 revenue.
        let result = solve_break_even(&consumer_only(dec!(50), dec!(20)), dec!(3000));

        assert!(result.is_valid);
        assert_eq!(result.consumer_contribution_margin, dec!(30.00));
        assert_eq!(result.consumer_units_needed, dec!(100));
        assert_eq!(result.break_even_units, dec!(100));
        assert_eq!(result.break_even_revenue, dec!(5000.00));
        assert_eq!(result.weighted_contribution_margin_pct, Some(dec!(60.00)));
    }

    #[test]
    fn test_partial_units_round_up() {
        let result = solve_break_even(&consumer_only(dec!(50), dec!(20)), dec!(3010));
        // 3010 / 30 = 100.33 → 101 whole units.
        assert_eq!(result.consumer_units_needed, dec!(101));
    }

    #[test]
    fn test_b2b_contribution_offsets_fixed_costs_first() {
        let config = with_b2b(consumer_only(dec!(50), dec!(20)), dec!(40), dec!(100), dec!(40));
        // B2B contributes 40 × (100 − 40) = 2,400 of the 3,000 fixed.
        let result = solve_break_even(&config, dec!(3000));

        assert!(result.is_valid);
        assert_eq!(result.b2b_monthly_contribution, dec!(2400.00));
        // Remaining 600 / 30 = 20 consumer units.
        assert_eq!(result.consumer_units_needed, dec!(20));
        assert_eq!(result.break_even_units, dec!(60));
        // 20 × 50 + 40 × 100 = 5,000.
        assert_eq!(result.break_even_revenue, dec!(5000.00));
    }

    #[test]
    fn test_b2b_alone_covers_fixed_costs() {
        let mut config = with_b2b(BreakEvenConfig::default(), dec!(50), dec!(100), dec!(40));
        config.consumer.enabled = false;

        let result = solve_break_even(&config, dec!(2500));
        assert!(result.is_valid);
        assert_eq!(result.consumer_units_needed, dec!(0));
        assert_eq!(result.break_even_units, dec!(50));
        assert_eq!(result.break_even_revenue, dec!(5000.00));
    }

    #[test]
    fn test_b2b_alone_falling_short_is_invalid() {
        let mut config = with_b2b(BreakEvenConfig::default(), dec!(10), dec!(100), dec!(40));
        config.consumer.enabled = false;

        // 600 of contribution against 2,500 fixed and no consumer channel.
        let result = solve_break_even(&config, dec!(2500));
        assert!(!result.is_valid);
        assert_eq!(result.break_even_revenue, dec!(0));
        assert_eq!(result.weighted_contribution_margin_pct, None);
    }

    #[test]
    fn test_no_channels_is_invalid_not_a_panic() {
        let result = solve_break_even(&BreakEvenConfig::default(), dec!(1000));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_negative_consumer_margin_is_invalid() {
        let result = solve_break_even(&consumer_only(dec!(20), dec!(50)), dec!(1000));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_fixed_cost_monotonicity() {
        let config = consumer_only(dec!(50), dec!(20));
        let mut last_units = Decimal::ZERO;
        for fixed in [dec!(0), dec!(500), dec!(1500), dec!(3000), dec!(9000)] {
            let result = solve_break_even(&config, fixed);
            assert!(result.consumer_units_needed >= last_units);
            last_units = result.consumer_units_needed;
        }
    }

    #[test]
    fn test_monthly_fixed_costs_respects_toggles() {
        let month = Month::new(2024, 5);
        let inputs = FixedCostInputs {
            budget_by_month: BTreeMap::from([(month, dec!(1000))]),
            depreciation_by_month: BTreeMap::from([(month, dec!(250))]),
            loan_interest_by_month: BTreeMap::from([(month, dec!(50))]),
            one_time_asset_costs: dec!(1200),
        };

        let mut config = BreakEvenConfig::default();
        // Twelve-month timeline spreads the 1,200 purchase at 100/month.
        assert_eq!(monthly_fixed_costs(&config, &inputs, month, 12), dec!(1400.00));

        config.fixed_costs.include_asset_purchases = false;
        config.fixed_costs.include_loan_interest = false;
        assert_eq!(monthly_fixed_costs(&config, &inputs, month, 12), dec!(1250.00));

        config.fixed_costs = FixedCostToggles {
            include_budget: false,
            include_depreciation: false,
            include_loan_interest: false,
            include_asset_purchases: false,
        };
        assert_eq!(monthly_fixed_costs(&config, &inputs, month, 12), dec!(0));
    }

    #[test]
    fn test_timeline_tracks_monthly_fixed_cost_changes() {
        let range = MonthRange {
            start: Month::new(2024, 1),
            end: Month::new(2024, 3),
        };
        let inputs = FixedCostInputs {
            budget_by_month: BTreeMap::from([
                (Month::new(2024, 1), dec!(3000)),
                (Month::new(2024, 2), dec!(3000)),
                // Depreciation schedule ends; only budget remains.
                (Month::new(2024, 3), dec!(3000)),
            ]),
            depreciation_by_month: BTreeMap::from([
                (Month::new(2024, 1), dec!(600)),
                (Month::new(2024, 2), dec!(300)),
            ]),
            ..Default::default()
        };

        let config = consumer_only(dec!(50), dec!(20));
        let output = compute_break_even_timeline(&config, &inputs, &range).unwrap();
        let points = &output.result;

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].fixed_costs, dec!(3600.00));
        assert_eq!(points[1].fixed_costs, dec!(3300.00));
        assert_eq!(points[2].fixed_costs, dec!(3000.00));
        // 3600/30 = 120, 3300/30 = 110, 3000/30 = 100 units.
        assert_eq!(points[0].consumer_units_needed, dec!(120));
        assert_eq!(points[1].consumer_units_needed, dec!(110));
        assert_eq!(points[2].consumer_units_needed, dec!(100));
        // Required revenue is the per-month target progress is judged by.
        assert_eq!(points[2].required_revenue, dec!(5000.00));
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_invalid_months_warn_in_timeline_envelope() {
        let range = MonthRange {
            start: Month::new(2024, 1),
            end: Month::new(2024, 1),
        };
        let inputs = FixedCostInputs {
            budget_by_month: BTreeMap::from([(Month::new(2024, 1), dec!(100))]),
            ..Default::default()
        };
        let config = BreakEvenConfig::default();

        let output = compute_break_even_timeline(&config, &inputs, &range).unwrap();
        assert!(!output.result[0].is_valid);
        assert!(!output.warnings.is_empty());
    }
}
