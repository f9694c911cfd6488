use clap::{Args, ValueEnum};
use serde_json::Value;

use smallbooks_core::ledger::LedgerSnapshot;
use smallbooks_core::reconciliation::{
    self, balance_sheet_as_of, cash_flow_spreadsheet, pl_spreadsheet, retained_earnings_as_of,
};
use smallbooks_core::Month;

use crate::input;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum TaxArg {
    #[default]
    None,
    Corporate,
}

impl From<TaxArg> for reconciliation::TaxMode {
    fn from(arg: TaxArg) -> Self {
        match arg {
            TaxArg::None => reconciliation::TaxMode::None,
            TaxArg::Corporate => reconciliation::TaxMode::Corporate,
        }
    }
}

/// Arguments for the accrual P&L spreadsheet
#[derive(Args)]
pub struct PlArgs {
    /// Path to a JSON ledger snapshot (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the cash-basis spreadsheet
#[derive(Args)]
pub struct CashFlowArgs {
    /// Path to a JSON ledger snapshot (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the balance-sheet reconciliation
#[derive(Args)]
pub struct BalanceSheetArgs {
    /// Path to a JSON ledger snapshot (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Statement month (YYYY-MM)
    #[arg(long)]
    pub as_of: Month,

    /// Income-tax treatment
    #[arg(long, default_value = "none")]
    pub tax: TaxArg,
}

/// Arguments for retained earnings
#[derive(Args)]
pub struct RetainedEarningsArgs {
    /// Path to a JSON ledger snapshot (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Accumulate through this month (YYYY-MM)
    #[arg(long)]
    pub as_of: Month,

    /// Income-tax treatment
    #[arg(long, default_value = "none")]
    pub tax: TaxArg,
}

fn load_snapshot(input: &Option<String>) -> Result<LedgerSnapshot, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        return Ok(input::file::read_json(path)?);
    }
    if let Some(snapshot) = input::stdin::read_stdin()? {
        return Ok(snapshot);
    }
    Err("--input is required (or pipe a ledger snapshot on stdin)".into())
}

pub fn run_pl(args: PlArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.input)?;
    let result = pl_spreadsheet(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cash_flow(args: CashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.input)?;
    let result = cash_flow_spreadsheet(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_balance_sheet(args: BalanceSheetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.input)?;
    let result = balance_sheet_as_of(&snapshot, args.as_of, args.tax.into())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_retained_earnings(
    args: RetainedEarningsArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.input)?;
    let retained = retained_earnings_as_of(&snapshot, args.as_of, args.tax.into())?;
    Ok(serde_json::json!({
        "as_of": args.as_of,
        "retained_earnings": retained.to_string(),
    }))
}
