pub mod balance_sheet;
pub mod cash_flow;
pub mod pl;

pub use balance_sheet::{
    balance_sheet_as_of, AssetBalance, BalanceSheetStatement, LoanBalance,
};
pub use cash_flow::{cash_flow_spreadsheet, CashFlowRow, CashFlowSpreadsheet};
pub use pl::{
    monthly_pl, pl_spreadsheet, retained_earnings_as_of, total_depreciation_by_month,
    total_loan_interest_by_month, MonthlyPl, PlRow, PlSpreadsheet, TaxMode,
};
