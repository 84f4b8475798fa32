//! Error responses.
//!
//! Every failure a handler can hit is folded into [`AppError`] and rendered
//! as `{"error": CODE, "message": text}` with the matching status. Ledger and
//! currency failures keep their own code (`INSUFFICIENT_FUNDS`,
//! `EXCHANGE_RATE_NOT_FOUND`, ...) so clients can tell them apart.

use axum::{
    Json,
    extract::multipart::MultipartError,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coinpurse_core::currency::{CurrencyError, ImportError};
use coinpurse_core::ledger::LedgerError;
use coinpurse_db::repositories::{
    AccountError, BudgetError, CategoryError, ExchangeRateError, SettingsError, TransactionError,
    TransferError,
};
use coinpurse_shared::AppError;
use coinpurse_shared::types::MoneyError;
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

/// Handler error: an [`AppError`] that knows how to render itself.
#[derive(Debug)]
pub struct ApiError {
    /// Status class and message.
    pub error: AppError,
    /// Domain code rendered instead of the generic one.
    pub code: Option<&'static str>,
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 400 with `message`.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into()).into()
    }

    /// 404 with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into()).into()
    }

    fn coded(error: AppError, code: &'static str) -> Self {
        Self {
            error,
            code: Some(code),
        }
    }

    /// Code placed in the `"error"` field.
    pub fn code(&self) -> &'static str {
        self.code.unwrap_or_else(|| self.error.error_code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.error.is_server_error() {
            error!(error = %self.error, "Request failed");
            "An internal error occurred".to_string()
        } else {
            match &self.error {
                AppError::NotFound(m)
                | AppError::Validation(m)
                | AppError::BusinessRule(m)
                | AppError::Conflict(m)
                | AppError::Database(m)
                | AppError::Internal(m) => m.clone(),
            }
        };

        (
            status,
            Json(json!({
                "error": self.code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self { error, code: None }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        AppError::Database(err.to_string()).into()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        let error = match &err {
            e if e.is_not_found() => AppError::NotFound(message),
            LedgerError::InsufficientFunds { .. } | LedgerError::TransferValidation(_) => {
                AppError::Validation(message)
            }
            _ => AppError::BusinessRule(message),
        };
        Self::coded(error, err.error_code())
    }
}

impl From<CurrencyError> for ApiError {
    fn from(err: CurrencyError) -> Self {
        let message = err.to_string();
        let error = if err.is_rate_not_found() {
            AppError::NotFound(message)
        } else {
            AppError::BusinessRule(message)
        };
        Self::coded(error, err.error_code())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        Self::validation(format!("Rate import failed: {err}"))
    }
}

impl From<MoneyError> for ApiError {
    fn from(err: MoneyError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => Self::not_found(err.to_string()),
            AccountError::HasLedgerEntries { .. } => AppError::Conflict(err.to_string()).into(),
            AccountError::Database(e) => e.into(),
        }
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(_) | CategoryError::ParentNotFound(_) => {
                Self::not_found(err.to_string())
            }
            CategoryError::DepthExceeded { .. }
            | CategoryError::HasChildren(_)
            | CategoryError::SelfParent(_)
            | CategoryError::KindMismatch { .. } => Self::validation(err.to_string()),
            CategoryError::NotEmpty(_) => AppError::Conflict(err.to_string()).into(),
            CategoryError::Database(e) => e.into(),
        }
    }
}

impl From<BudgetError> for ApiError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::NotFound(_) | BudgetError::CategoryNotFound(_) => {
                Self::not_found(err.to_string())
            }
            BudgetError::Duplicate { .. } => {
                Self::coded(AppError::Conflict(err.to_string()), "BUDGET_ALREADY_EXISTS")
            }
            BudgetError::Rule(rule) => {
                Self::coded(AppError::Validation(rule.to_string()), rule.error_code())
            }
            BudgetError::Currency(e) => e.into(),
            BudgetError::Database(e) => e.into(),
        }
    }
}

impl From<ExchangeRateError> for ApiError {
    fn from(err: ExchangeRateError) -> Self {
        match err {
            ExchangeRateError::Currency(e) => e.into(),
            ExchangeRateError::Database(e) => e.into(),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Database(e) => e.into(),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Ledger(e) => e.into(),
            TransactionError::Database(e) => e.into(),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Ledger(e) => e.into(),
            TransferError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::validation(err.body_text())
    }
}
