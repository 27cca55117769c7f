use axum::http::StatusCode;

use crate::store::StoreError;

/// Failures a request can end in. `code()` is what the extension sees.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("missing title")]
    MissingTitle,
    #[error("missing content")]
    MissingContent,
    #[error("missing url")]
    MissingUrl,
    #[error("invalid url")]
    InvalidUrl,
    #[error("invalid reminder date/time")]
    InvalidReminderTime,
    #[error("reminder time is not in the future")]
    ReminderInPast,
    #[error("site is already bookmarked")]
    DuplicateDomain,
    #[error("no such item")]
    NotFound,
    #[error("invalid import document")]
    InvalidImport,
    #[error("no bookmarks to export")]
    NothingToExport,
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(err))
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Store(_) => "db_error",
            AppError::MissingTitle => "missing_title",
            AppError::MissingContent => "missing_content",
            AppError::MissingUrl => "missing_url",
            AppError::InvalidUrl => "invalid_url",
            AppError::InvalidReminderTime => "invalid_reminder_time",
            AppError::ReminderInPast => "reminder_in_past",
            AppError::DuplicateDomain => "duplicate_domain",
            AppError::NotFound => "not_found",
            AppError::InvalidImport => "invalid_import",
            AppError::NothingToExport => "nothing_to_export",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
