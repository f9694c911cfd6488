//! The storage-boundary data model: a flat transaction log plus the
//! configuration objects the engines derive everything from.
//!
//! Nothing here is mutated by the engines; a [`LedgerSnapshot`] is handed
//! in fully materialized and every schedule is recomputed from scratch.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{round_cents, Money, Month, OverrideTable, Rate};

/// Reserved override row carrying the monthly income-tax override.
pub const TAX_OVERRIDE_CATEGORY_ID: i64 = -1;

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payable,
    Receivable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Received,
}

/// What generated a transaction, when it was not entered by hand.
/// Loan-, asset-, and investment-sourced rows are balance-sheet events:
/// they move cash and payables but never land in the P&L buckets, whose
/// figures come from the computed schedules instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    FixedAsset,
    Loan,
    Budget,
    Investment,
}

/// An immutable ledger fact. `month_due` is the accrual key, `month_paid`
/// the cash key; `month_paid` is set if and only if the status is not
/// pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub entry_date: NaiveDate,
    pub category_id: i64,
    pub amount: Money,
    /// Revenue before sales tax; revenue aggregation prefers this over
    /// `amount` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretax_amount: Option<Money>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_processed: Option<NaiveDate>,
    pub month_due: Month,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_paid: Option<Month>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
}

impl Transaction {
    pub fn is_settled(&self) -> bool {
        self.status != TransactionStatus::Pending
    }

    /// Amount recognized as revenue: the pretax figure when present, so
    /// sales tax collected stays out of the revenue line.
    pub fn revenue_amount(&self) -> Money {
        self.pretax_amount.unwrap_or(self.amount)
    }

    /// Sales tax collected on this row (zero without a pretax figure).
    pub fn sales_tax_portion(&self) -> Money {
        match self.pretax_amount {
            Some(pretax) => round_cents(self.amount - pretax),
            None => Decimal::ZERO,
        }
    }

    /// True when the row was generated by a loan, asset purchase, or
    /// investment and must stay out of the income statement.
    pub fn is_balance_sheet_event(&self) -> bool {
        matches!(
            self.source_type,
            Some(SourceType::Loan) | Some(SourceType::FixedAsset) | Some(SourceType::Investment)
        )
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A transaction category with structural flags. The flags are treated as
/// mutually exclusive by the UI, but nothing enforces that; the engines
/// tolerate any combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_cogs: bool,
    #[serde(default)]
    pub is_depreciation: bool,
    #[serde(default)]
    pub is_sales_tax: bool,
    /// True means the category is excluded from the P&L entirely.
    #[serde(default)]
    pub hidden_from_pl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
}

impl Category {
    /// Plain operating-expense category: none of the structural flags.
    pub fn is_plain_opex(&self) -> bool {
        !self.is_cogs && !self.is_depreciation && !self.is_sales_tax && !self.hidden_from_pl
    }
}

// ---------------------------------------------------------------------------
// Fixed assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    DoubleDeclining,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedAsset {
    pub id: i64,
    pub name: String,
    pub purchase_cost: Money,
    #[serde(default)]
    pub salvage_value: Money,
    #[serde(default)]
    pub useful_life_months: i64,
    pub purchase_date: NaiveDate,
    /// Defaults to the purchase date when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation_start_date: Option<NaiveDate>,
    pub method: DepreciationMethod,
    #[serde(default)]
    pub is_depreciable: bool,
}

impl FixedAsset {
    pub fn effective_start_date(&self) -> NaiveDate {
        self.depreciation_start_date.unwrap_or(self.purchase_date)
    }

    pub fn depreciable_base(&self) -> Money {
        self.purchase_cost - self.salvage_value
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

/// A loan plus its two sparse side-tables. Skip/override edits touch the
/// side-tables only; the schedule itself is always regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub name: String,
    pub principal: Money,
    /// Annual rate as a percentage, e.g. 6.5 for 6.5%.
    pub annual_rate_pct: Rate,
    pub term_months: u32,
    pub payments_per_year: u32,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub skipped_payments: BTreeSet<u32>,
    #[serde(default)]
    pub payment_overrides: BTreeMap<u32, Money>,
}

// ---------------------------------------------------------------------------
// Equity
// ---------------------------------------------------------------------------

/// Seed capital and APIC with expected/received date pairs. Only the
/// received dates gate recognition; expected dates belong to planning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityConfig {
    #[serde(default)]
    pub par_value: Money,
    #[serde(default)]
    pub share_count: Decimal,
    #[serde(default)]
    pub apic: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_expected_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_received_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apic_expected_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apic_received_date: Option<NaiveDate>,
}

impl EquityConfig {
    pub fn common_stock(&self) -> Money {
        round_cents(self.par_value * self.share_count)
    }

    /// Common stock recognized as of `as_of` (zero until received).
    pub fn common_stock_as_of(&self, as_of: Month) -> Money {
        match self.seed_received_date {
            Some(received) if Month::from_date(received) <= as_of => self.common_stock(),
            _ => Decimal::ZERO,
        }
    }

    pub fn apic_as_of(&self, as_of: Month) -> Money {
        match self.apic_received_date {
            Some(received) if Month::from_date(received) <= as_of => self.apic,
            _ => Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the engines read, materialized by the storage layer at call
/// time. The engines never write back; override edits go through the
/// storage layer's setters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub fixed_assets: Vec<FixedAsset>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub pl_overrides: OverrideTable,
    #[serde(default)]
    pub cash_flow_overrides: OverrideTable,
    #[serde(default)]
    pub equity: EquityConfig,
}

impl LedgerSnapshot {
    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_revenue_amount_prefers_pretax() {
        let mut txn = Transaction {
            entry_date: date(2024, 3, 1),
            category_id: 1,
            amount: dec!(107.00),
            pretax_amount: Some(dec!(100.00)),
            transaction_type: TransactionType::Receivable,
            status: TransactionStatus::Received,
            date_processed: None,
            month_due: Month::new(2024, 3),
            month_paid: Some(Month::new(2024, 3)),
            source_type: None,
            source_id: None,
        };
        assert_eq!(txn.revenue_amount(), dec!(100.00));
        assert_eq!(txn.sales_tax_portion(), dec!(7.00));

        txn.pretax_amount = None;
        assert_eq!(txn.revenue_amount(), dec!(107.00));
        assert_eq!(txn.sales_tax_portion(), dec!(0));
    }

    #[test]
    fn test_equity_recognition_gated_by_received_date() {
        let equity = EquityConfig {
            par_value: dec!(0.01),
            share_count: dec!(1000000),
            apic: dec!(40000),
            seed_received_date: Some(date(2024, 2, 15)),
            apic_received_date: None,
            ..Default::default()
        };

        assert_eq!(equity.common_stock(), dec!(10000.00));
        assert_eq!(equity.common_stock_as_of(Month::new(2024, 1)), dec!(0));
        assert_eq!(equity.common_stock_as_of(Month::new(2024, 2)), dec!(10000.00));
        // APIC never received, never recognized
        assert_eq!(equity.apic_as_of(Month::new(2030, 1)), dec!(0));
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let snapshot: LedgerSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.transactions.is_empty());
        assert!(snapshot.pl_overrides.is_empty());
        assert_eq!(snapshot.equity.common_stock(), dec!(0));
    }
}
