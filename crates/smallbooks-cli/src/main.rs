mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::break_even::{BreakEvenArgs, ChartArgs};
use commands::ledger::{BalanceSheetArgs, CashFlowArgs, PlArgs, RetainedEarningsArgs};
use commands::schedules::{AmortizeArgs, DepreciateArgs};

/// Small-business bookkeeping projections and reconciliation
#[derive(Parser)]
#[command(
    name = "sbk",
    version,
    about = "Small-business bookkeeping projections and reconciliation",
    long_about = "A CLI for small-business financial projections with decimal \
                  precision. Generates loan amortization and asset depreciation \
                  schedules, solves dual-channel break-even targets, and \
                  reconciles a transaction ledger into P&L, cash-flow, and \
                  balance-sheet statements."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a loan amortization schedule
    Amortize(AmortizeArgs),
    /// Generate a fixed-asset depreciation schedule
    Depreciate(DepreciateArgs),
    /// Solve break-even volume and revenue
    BreakEven(BreakEvenArgs),
    /// Produce cost-volume-profit chart points
    BreakEvenChart(ChartArgs),
    /// Build the accrual P&L spreadsheet from a ledger snapshot
    Pl(PlArgs),
    /// Build the cash-basis spreadsheet from a ledger snapshot
    CashFlow(CashFlowArgs),
    /// Reconcile a point-in-time balance sheet
    BalanceSheet(BalanceSheetArgs),
    /// Accumulate retained earnings through a month
    RetainedEarnings(RetainedEarningsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::schedules::run_amortize(args),
        Commands::Depreciate(args) => commands::schedules::run_depreciate(args),
        Commands::BreakEven(args) => commands::break_even::run_break_even(args),
        Commands::BreakEvenChart(args) => commands::break_even::run_chart(args),
        Commands::Pl(args) => commands::ledger::run_pl(args),
        Commands::CashFlow(args) => commands::ledger::run_cash_flow(args),
        Commands::BalanceSheet(args) => commands::ledger::run_balance_sheet(args),
        Commands::RetainedEarnings(args) => commands::ledger::run_retained_earnings(args),
        Commands::Version => {
            println!("sbk {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
