//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod budget;
pub mod category;
pub mod exchange_rate;
pub mod settings;
pub mod transaction;
pub mod transfer;

pub use account::{
    AccountError, AccountRepository, CreateAccountInput, EnrichedAccount, UpdateAccountInput,
};
pub use budget::{
    BudgetError, BudgetPeriodReport, BudgetRepository, BudgetWithActual, CreateBudgetInput,
    UpdateBudgetInput,
};
pub use category::{
    CategoryError, CategoryNode, CategoryRepository, CreateCategoryInput, UpdateCategoryInput,
};
pub use exchange_rate::{ExchangeRateError, ExchangeRateRepository};
pub use settings::{SETTINGS_ROW_ID, SettingsError, SettingsRepository};
pub use transaction::{
    CreateTransactionInput, TransactionError, TransactionFilter, TransactionRepository,
    UpdateTransactionInput,
};
pub use transfer::{CreateTransferInput, TransferError, TransferRepository, UpdateTransferInput};
