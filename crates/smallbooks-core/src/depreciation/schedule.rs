//! Fixed-asset depreciation schedules.
//!
//! Month-by-month schedules under straight-line or double-declining-balance,
//! capped so book value never drops below salvage. Schedules are recomputed
//! on every read; a structurally non-depreciable asset yields an empty
//! schedule instead of an error.

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ledger::{DepreciationMethod, FixedAsset};
use crate::types::{round_cents, with_metadata, ComputationOutput, Money, Month};
use crate::EngineResult;

/// A monthly charge below one cent ends a declining-balance schedule.
const CHARGE_EPSILON: Decimal = dec!(0.01);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationSchedule {
    /// Depreciation charge per calendar month, ascending.
    pub monthly: BTreeMap<Month, Money>,
    pub total: Money,
}

/// Full schedule with the computation envelope. Defensive empty schedules
/// (method `none`, zero life, salvage at or above cost) carry a warning
/// instead of failing — such configurations are rejected at the input
/// validation boundary, not here.
pub fn compute_depreciation_schedule(
    asset: &FixedAsset,
) -> EngineResult<ComputationOutput<DepreciationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let monthly = monthly_depreciation(asset);
    if monthly.is_empty() && asset.is_depreciable && asset.method != DepreciationMethod::None {
        warnings.push(format!(
            "Asset '{}' is flagged depreciable but produced an empty schedule \
             (check useful life and salvage value)",
            asset.name
        ));
    }

    let total = monthly
        .values()
        .fold(Decimal::ZERO, |acc, amount| round_cents(acc + amount));
    let schedule = DepreciationSchedule { monthly, total };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        match asset.method {
            DepreciationMethod::DoubleDeclining => "Double-Declining-Balance Depreciation",
            _ => "Straight-Line Depreciation",
        },
        asset,
        warnings,
        elapsed,
        schedule,
    ))
}

/// The raw month → charge mapping. Empty when the asset is not
/// depreciable, the method is `none`, the life is non-positive, or cost
/// does not exceed salvage. Depreciation begins the calendar month after
/// the effective start date.
pub fn monthly_depreciation(asset: &FixedAsset) -> BTreeMap<Month, Money> {
    let mut schedule = BTreeMap::new();

    if !asset.is_depreciable
        || asset.method == DepreciationMethod::None
        || asset.useful_life_months <= 0
        || asset.purchase_cost <= asset.salvage_value
    {
        return schedule;
    }

    let first_month = Month::from_date(asset.effective_start_date()).next();
    let life = asset.useful_life_months;

    match asset.method {
        DepreciationMethod::StraightLine => {
            let charge = round_cents(asset.depreciable_base() / Decimal::from(life));
            for i in 0..life {
                schedule.insert(first_month.plus_months(i), charge);
            }
        }
        DepreciationMethod::DoubleDeclining => {
            // Annual rate 2/(life/12), i.e. 2/life per month.
            let monthly_rate = dec!(2) / Decimal::from(life);
            let mut book_value = asset.purchase_cost;
            for i in 0..life {
                let mut charge = round_cents(book_value * monthly_rate);
                if book_value - charge < asset.salvage_value {
                    charge = round_cents(book_value - asset.salvage_value);
                }
                if charge < CHARGE_EPSILON {
                    // Fully depreciated ahead of the nominal life.
                    break;
                }
                schedule.insert(first_month.plus_months(i), charge);
                book_value = round_cents(book_value - charge);
            }
        }
        DepreciationMethod::None => unreachable!("guarded above"),
    }

    schedule
}

/// Cumulative depreciation scheduled in or before `as_of`.
pub fn accumulated_through(asset: &FixedAsset, as_of: Month) -> Money {
    monthly_depreciation(asset)
        .iter()
        .take_while(|(month, _)| **month <= as_of)
        .fold(Decimal::ZERO, |acc, (_, amount)| round_cents(acc + amount))
}

/// Book value as of `as_of`: cost before purchase-month depreciation
/// starts, floored at salvage by the schedule cap.
pub fn net_book_value(asset: &FixedAsset, as_of: Month) -> Money {
    round_cents(asset.purchase_cost - accumulated_through(asset, as_of))
}
