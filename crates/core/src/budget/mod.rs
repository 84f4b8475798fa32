//! Monthly category budgets: planned against actual spending or income.
//!
//! Actuals are converted into the budget currency through the
//! [`crate::currency::RateLookup`] seam. A missing rate never falls back to
//! a 1:1 conversion; the affected figure is reported as unavailable instead.

pub mod error;
pub mod service;
pub mod types;


pub use error::BudgetError;
pub use service::BudgetService;
pub use types::{
    ActualAmount, ActualEntry, BudgetLine, BudgetPeriod, BudgetSummary, CategoryKind,
    VarianceResult, VarianceStatus,
};
