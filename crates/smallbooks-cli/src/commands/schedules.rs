use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use smallbooks_core::amortization;
use smallbooks_core::depreciation;
use smallbooks_core::ledger::{DepreciationMethod, FixedAsset, Loan};

use crate::input;

/// Arguments for loan amortization
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AmortizeArgs {
    /// Path to a JSON loan definition (skips and payment overrides go here)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate as a percentage (e.g. 6.5 for 6.5%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Payments per year
    #[arg(long, default_value = "12")]
    pub payments_per_year: u32,

    /// Origination date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// First payment date; defaults to one period after the start date
    #[arg(long)]
    pub first_payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum MethodArg {
    StraightLine,
    DoubleDeclining,
}

/// Arguments for fixed-asset depreciation
#[derive(Args)]
pub struct DepreciateArgs {
    /// Path to a JSON fixed-asset definition
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase cost
    #[arg(long)]
    pub cost: Option<Decimal>,

    /// Salvage value
    #[arg(long, default_value = "0")]
    pub salvage: Decimal,

    /// Useful life in months
    #[arg(long)]
    pub life_months: Option<i64>,

    /// Depreciation method
    #[arg(long, default_value = "straight-line")]
    pub method: MethodArg,

    /// Purchase date (YYYY-MM-DD)
    #[arg(long)]
    pub purchase_date: Option<NaiveDate>,

    /// Depreciation start date; defaults to the purchase date
    #[arg(long)]
    pub depreciation_start_date: Option<NaiveDate>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: Loan = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(loan) = input::stdin::read_stdin()? {
        loan
    } else {
        Loan {
            id: 0,
            name: "loan".into(),
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_pct: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
            payments_per_year: args.payments_per_year,
            start_date: args
                .start_date
                .ok_or("--start-date is required (or provide --input)")?,
            first_payment_date: args.first_payment_date,
            skipped_payments: Default::default(),
            payment_overrides: Default::default(),
        }
    };

    let result = amortization::compute_amortization_schedule(&loan)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_depreciate(args: DepreciateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let asset: FixedAsset = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(asset) = input::stdin::read_stdin()? {
        asset
    } else {
        FixedAsset {
            id: 0,
            name: "asset".into(),
            purchase_cost: args.cost.ok_or("--cost is required (or provide --input)")?,
            salvage_value: args.salvage,
            useful_life_months: args
                .life_months
                .ok_or("--life-months is required (or provide --input)")?,
            purchase_date: args
                .purchase_date
                .ok_or("--purchase-date is required (or provide --input)")?,
            depreciation_start_date: args.depreciation_start_date,
            method: match args.method {
                MethodArg::StraightLine => DepreciationMethod::StraightLine,
                MethodArg::DoubleDeclining => DepreciationMethod::DoubleDeclining,
            },
            is_depreciable: true,
        }
    };

    let result = depreciation::compute_depreciation_schedule(&asset)?;
    Ok(serde_json::to_value(result)?)
}
