pub mod error;
pub mod ledger;
pub mod types;

#[cfg(feature = "amortization")]
pub mod amortization;

#[cfg(feature = "depreciation")]
pub mod depreciation;

#[cfg(feature = "break_even")]
pub mod break_even;

#[cfg(feature = "reconciliation")]
pub mod reconciliation;

pub use error::EngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
