use napi::Result as NapiResult;
use napi_derive::napi;

use smallbooks_core::break_even::{BreakEvenConfig, FixedCostInputs};
use smallbooks_core::ledger::{FixedAsset, LedgerSnapshot, Loan};
use smallbooks_core::reconciliation::TaxMode;
use smallbooks_core::types::{Month, MonthRange};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let loan: Loan = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        smallbooks_core::amortization::compute_amortization_schedule(&loan)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn depreciation_schedule(input_json: String) -> NapiResult<String> {
    let asset: FixedAsset = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        smallbooks_core::depreciation::compute_depreciation_schedule(&asset)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Break-even
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct BreakEvenBindingInput {
    #[serde(flatten)]
    config: BreakEvenConfig,
    monthly_fixed_costs: rust_decimal::Decimal,
}

#[napi]
pub fn break_even(input_json: String) -> NapiResult<String> {
    let binding_input: BreakEvenBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::break_even::compute_break_even(
        &binding_input.config,
        binding_input.monthly_fixed_costs,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct ChartBindingInput {
    #[serde(flatten)]
    config: BreakEvenConfig,
    monthly_fixed_costs: rust_decimal::Decimal,
    timeline_months: i64,
}

#[napi]
pub fn break_even_chart(input_json: String) -> NapiResult<String> {
    let binding_input: ChartBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::break_even::compute_break_even_chart(
        &binding_input.config,
        binding_input.monthly_fixed_costs,
        binding_input.timeline_months,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct TimelineBindingInput {
    #[serde(flatten)]
    config: BreakEvenConfig,
    inputs: FixedCostInputs,
    range: MonthRange,
}

#[napi]
pub fn break_even_timeline(input_json: String) -> NapiResult<String> {
    let binding_input: TimelineBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::break_even::compute_break_even_timeline(
        &binding_input.config,
        &binding_input.inputs,
        &binding_input.range,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[napi]
pub fn pl_spreadsheet(input_json: String) -> NapiResult<String> {
    let snapshot: LedgerSnapshot = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        smallbooks_core::reconciliation::pl_spreadsheet(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn cash_flow_spreadsheet(input_json: String) -> NapiResult<String> {
    let snapshot: LedgerSnapshot = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::reconciliation::cash_flow_spreadsheet(&snapshot)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct StatementBindingInput {
    snapshot: LedgerSnapshot,
    as_of: Month,
    #[serde(default)]
    tax_mode: TaxMode,
}

#[napi]
pub fn balance_sheet(input_json: String) -> NapiResult<String> {
    let binding_input: StatementBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::reconciliation::balance_sheet_as_of(
        &binding_input.snapshot,
        binding_input.as_of,
        binding_input.tax_mode,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn monthly_pl(input_json: String) -> NapiResult<String> {
    let binding_input: StatementBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::reconciliation::monthly_pl(
        &binding_input.snapshot,
        binding_input.tax_mode,
        Some(binding_input.as_of),
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn retained_earnings(input_json: String) -> NapiResult<String> {
    let binding_input: StatementBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = smallbooks_core::reconciliation::retained_earnings_as_of(
        &binding_input.snapshot,
        binding_input.as_of,
        binding_input.tax_mode,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
