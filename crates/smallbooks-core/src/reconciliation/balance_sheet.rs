//! Point-in-time balance sheet reconciliation.
//!
//! Every line is re-derived from the snapshot at `as_of`: cash replays
//! settled transaction flows plus equity receipts and loan proceeds, the
//! working-capital lines window on accrual and cash keys, and the asset
//! and loan lines come from the computed schedules. The statement carries
//! its own imbalance so drift between the sides is reported, not hidden.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization;
use crate::depreciation;
use crate::ledger::{LedgerSnapshot, SourceType, Transaction, TransactionType};
use crate::reconciliation::pl::{monthly_pl, TaxMode};
use crate::types::{round_cents, with_metadata, ComputationOutput, Money, Month};
use crate::EngineResult;

/// Assets and liabilities-plus-equity may drift apart by at most a cent
/// before the statement carries a warning.
const IDENTITY_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset_id: i64,
    pub name: String,
    pub cost: Money,
    pub accumulated_depreciation: Money,
    pub net_book_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanBalance {
    pub loan_id: i64,
    pub name: String,
    /// Outstanding balance including any capitalized skip-period interest.
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetStatement {
    pub as_of: Month,

    // Assets
    pub cash: Money,
    pub accounts_receivable: Money,
    pub fixed_assets: Vec<AssetBalance>,
    pub total_assets: Money,

    // Liabilities
    pub accounts_payable: Money,
    pub sales_tax_payable: Money,
    pub income_tax_payable: Money,
    pub loans: Vec<LoanBalance>,
    pub total_liabilities: Money,

    // Equity
    pub common_stock: Money,
    pub additional_paid_in_capital: Money,
    pub retained_earnings: Money,
    pub total_equity: Money,

    /// `total_assets − (total_liabilities + total_equity)`; zero when the
    /// books reconcile.
    pub imbalance: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the balance sheet as of the end of `as_of`. A non-zero imbalance
/// beyond a cent adds a warning to the envelope rather than failing: the
/// statement is the diagnostic.
pub fn balance_sheet_as_of(
    snapshot: &LedgerSnapshot,
    as_of: Month,
    tax_mode: TaxMode,
) -> EngineResult<ComputationOutput<BalanceSheetStatement>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // One replay covers both equity accumulation and the tax accrual.
    let pl_rows = monthly_pl(snapshot, tax_mode, Some(as_of))?;
    let retained_earnings = pl_rows
        .iter()
        .fold(Decimal::ZERO, |acc, row| round_cents(acc + row.net_income));
    let income_tax_payable = pl_rows
        .iter()
        .fold(Decimal::ZERO, |acc, row| round_cents(acc + row.tax));

    let mut cash = transaction_cash(snapshot, as_of);
    cash = round_cents(cash + snapshot.equity.common_stock_as_of(as_of));
    cash = round_cents(cash + snapshot.equity.apic_as_of(as_of));

    let mut loans = Vec::with_capacity(snapshot.loans.len());
    for loan in &snapshot.loans {
        let output = amortization::compute_amortization_schedule(loan)?;
        warnings.extend(output.warnings);
        let schedule = output.result;

        if Month::from_date(loan.start_date) <= as_of {
            cash = round_cents(cash + loan.principal);
        }
        for (month, paid) in amortization::cash_paid_by_month(&schedule) {
            if month <= as_of {
                cash = round_cents(cash - paid);
            }
        }

        let balance = amortization::balance_as_of(loan, &schedule, as_of);
        if !balance.is_zero() {
            loans.push(LoanBalance {
                loan_id: loan.id,
                name: loan.name.clone(),
                balance,
            });
        }
    }

    let accounts_receivable = open_balance(snapshot, as_of, TransactionType::Receivable);
    let accounts_payable = open_balance(snapshot, as_of, TransactionType::Payable);
    let sales_tax_payable = sales_tax_payable(snapshot, as_of);

    let mut fixed_assets = Vec::new();
    for asset in &snapshot.fixed_assets {
        if Month::from_date(asset.purchase_date) > as_of {
            continue;
        }
        let accumulated = depreciation::accumulated_through(asset, as_of);
        fixed_assets.push(AssetBalance {
            asset_id: asset.id,
            name: asset.name.clone(),
            cost: asset.purchase_cost,
            accumulated_depreciation: accumulated,
            net_book_value: round_cents(asset.purchase_cost - accumulated),
        });
    }

    let net_fixed_assets = fixed_assets
        .iter()
        .fold(Decimal::ZERO, |acc, a| round_cents(acc + a.net_book_value));
    let total_assets = round_cents(cash + accounts_receivable + net_fixed_assets);

    let loan_total = loans
        .iter()
        .fold(Decimal::ZERO, |acc, l| round_cents(acc + l.balance));
    let total_liabilities = round_cents(
        accounts_payable + sales_tax_payable + income_tax_payable + loan_total,
    );

    let common_stock = snapshot.equity.common_stock_as_of(as_of);
    let additional_paid_in_capital = snapshot.equity.apic_as_of(as_of);
    let total_equity =
        round_cents(common_stock + additional_paid_in_capital + retained_earnings);

    let imbalance = round_cents(total_assets - total_liabilities - total_equity);
    if imbalance.abs() > IDENTITY_TOLERANCE {
        warnings.push(format!(
            "Balance sheet as of {as_of} is out of balance by {imbalance}; \
             assets {total_assets} vs liabilities+equity {}",
            round_cents(total_liabilities + total_equity)
        ));
    }

    let statement = BalanceSheetStatement {
        as_of,
        cash,
        accounts_receivable,
        fixed_assets,
        total_assets,
        accounts_payable,
        sales_tax_payable,
        income_tax_payable,
        loans,
        total_liabilities,
        common_stock,
        additional_paid_in_capital,
        retained_earnings,
        total_equity,
        imbalance,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Balance Sheet Reconciliation",
        snapshot,
        warnings,
        elapsed,
        statement,
    ))
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Loan- and investment-sourced rows are mirrored by the amortization
/// schedules and the equity config; counting them here would double the
/// flow. Asset-purchase payables are real obligations and stay in.
fn tracked(txn: &Transaction) -> bool {
    !matches!(
        txn.source_type,
        Some(SourceType::Loan) | Some(SourceType::Investment)
    )
}

/// Net cash from settled transactions with a payment month at or before
/// `as_of`: receivables add, payables subtract.
fn transaction_cash(snapshot: &LedgerSnapshot, as_of: Month) -> Money {
    let mut cash = Decimal::ZERO;
    for txn in snapshot.transactions.iter().filter(|t| tracked(t)) {
        let paid = match txn.month_paid {
            Some(month) if txn.is_settled() && month <= as_of => true,
            _ => false,
        };
        if !paid {
            continue;
        }
        cash = match txn.transaction_type {
            TransactionType::Receivable => round_cents(cash + txn.amount),
            TransactionType::Payable => round_cents(cash - txn.amount),
        };
    }
    cash
}

/// Open accrual balance at `as_of`: rows due by then and either still
/// pending or settled in a later month.
fn open_balance(
    snapshot: &LedgerSnapshot,
    as_of: Month,
    transaction_type: TransactionType,
) -> Money {
    snapshot
        .transactions
        .iter()
        .filter(|t| tracked(t) && t.transaction_type == transaction_type)
        .filter(|t| t.month_due <= as_of)
        .filter(|t| match t.month_paid {
            Some(month) => !t.is_settled() || month > as_of,
            None => true,
        })
        .fold(Decimal::ZERO, |acc, t| round_cents(acc + t.amount))
}

/// Sales tax collected on receivables due through `as_of`, net of
/// remittances accrued in sales-tax categories over the same window.
fn sales_tax_payable(snapshot: &LedgerSnapshot, as_of: Month) -> Money {
    let mut payable = Decimal::ZERO;
    for txn in snapshot.transactions.iter().filter(|t| tracked(t)) {
        if txn.month_due > as_of {
            continue;
        }
        match txn.transaction_type {
            TransactionType::Receivable => {
                payable = round_cents(payable + txn.sales_tax_portion());
            }
            TransactionType::Payable => {
                let is_remittance = snapshot
                    .category(txn.category_id)
                    .map(|c| c.is_sales_tax)
                    .unwrap_or(false);
                if is_remittance {
                    payable = round_cents(payable - txn.amount);
                }
            }
        }
    }
    payable
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
