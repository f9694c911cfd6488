//! Cash-basis monthly spreadsheet.
//!
//! The cash view keys on `month_paid` and only settled transactions count;
//! hidden and sales-tax categories reappear here because cash is cash.
//! Loan-sourced rows are dropped in favor of scheduled payment rows built
//! from the amortization engine, so an edited schedule and the cash view
//! can never disagree.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization;
use crate::ledger::{LedgerSnapshot, SourceType, TransactionType};
use crate::types::{round_cents, with_metadata, ComputationOutput, Money, Month};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One row of the cash spreadsheet. `category_id` is absent on the
/// synthetic loan-payment rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub name: String,
    pub cells: Vec<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSpreadsheet {
    pub months: Vec<Month>,
    pub inflows: Vec<CashFlowRow>,
    pub outflows: Vec<CashFlowRow>,
    /// Net cash movement per month column.
    pub net: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the month-by-category cash spreadsheet. Each category's cell is
/// the net settled movement for that month (receivables less payables),
/// with a cash-flow override replacing the computed value; loans appear as
/// one outflow row each, driven by their schedules.
pub fn cash_flow_spreadsheet(
    snapshot: &LedgerSnapshot,
) -> EngineResult<ComputationOutput<CashFlowSpreadsheet>> {
    let start = Instant::now();

    // (category, month_paid) net movement, settled rows only.
    let mut computed: BTreeMap<(i64, Month), Money> = BTreeMap::new();
    let mut month_set: BTreeSet<Month> = BTreeSet::new();
    let mut seen_payable: BTreeSet<i64> = BTreeSet::new();
    let mut seen_receivable: BTreeSet<i64> = BTreeSet::new();

    for txn in &snapshot.transactions {
        if matches!(txn.source_type, Some(SourceType::Loan)) {
            continue;
        }
        let month = match txn.month_paid {
            Some(month) if txn.is_settled() => month,
            _ => continue,
        };
        let cell = computed.entry((txn.category_id, month)).or_default();
        match txn.transaction_type {
            TransactionType::Receivable => {
                *cell = round_cents(*cell + txn.amount);
                seen_receivable.insert(txn.category_id);
            }
            TransactionType::Payable => {
                *cell = round_cents(*cell - txn.amount);
                seen_payable.insert(txn.category_id);
            }
        }
        month_set.insert(month);
    }

    let mut loan_rows: Vec<(String, BTreeMap<Month, Money>)> = Vec::new();
    for loan in &snapshot.loans {
        let schedule = amortization::compute_amortization_schedule(loan)?.result;
        let paid = amortization::cash_paid_by_month(&schedule);
        if paid.is_empty() {
            continue;
        }
        month_set.extend(paid.keys().copied());
        loan_rows.push((loan.name.clone(), paid));
    }

    month_set.extend(snapshot.cash_flow_overrides.active_months());
    let months: Vec<Month> = month_set.into_iter().collect();

    // Categories that only ever collect cash sit with the inflows; every
    // other category, hidden and sales-tax included, is an outflow row.
    let receivable_only = &seen_receivable - &seen_payable;
    let mut inflows = Vec::new();
    let mut outflows = Vec::new();

    for category in &snapshot.categories {
        let cells: Vec<Money> = months
            .iter()
            .map(|month| {
                let base = computed
                    .get(&(category.id, *month))
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                snapshot
                    .cash_flow_overrides
                    .get(category.id, *month)
                    .or_computed(base)
            })
            .collect();
        if cells.iter().all(|c| c.is_zero()) {
            continue;
        }
        let row = CashFlowRow {
            category_id: Some(category.id),
            name: category.name.clone(),
            cells,
        };
        let is_inflow = match category.default_type {
            Some(TransactionType::Receivable) => true,
            Some(TransactionType::Payable) => false,
            None => receivable_only.contains(&category.id),
        };
        if is_inflow {
            inflows.push(row);
        } else {
            outflows.push(row);
        }
    }

    for (name, paid) in loan_rows {
        let cells: Vec<Money> = months
            .iter()
            .map(|month| {
                paid.get(month)
                    .map(|amount| -amount)
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();
        outflows.push(CashFlowRow {
            category_id: None,
            name,
            cells,
        });
    }

    let net: Vec<Money> = (0..months.len())
        .map(|i| {
            inflows
                .iter()
                .chain(&outflows)
                .fold(Decimal::ZERO, |acc, row| round_cents(acc + row.cells[i]))
        })
        .collect();

    let spreadsheet = CashFlowSpreadsheet {
        months,
        inflows,
        outflows,
        net,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cash-Basis Monthly Spreadsheet",
        snapshot,
        Vec::new(),
        elapsed,
        spreadsheet,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
