use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::password::HashingError;
use crate::users::dto::ApiResponse;

/// Failure kinds surfaced by a `UserDirectory` implementation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("email is already used")]
    Conflict,

    #[error("record not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DirectoryError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DirectoryError::Conflict
            }
            other => DirectoryError::Storage(other.to_string()),
        }
    }
}

/// Errors returned by the account lifecycle and profile services.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Internal(String),
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::Conflict(_) => StatusCode::CONFLICT,
            AccountError::NotFound(_) => StatusCode::NOT_FOUND,
            AccountError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn user_not_found() -> Self {
        AccountError::NotFound("User not found".into())
    }
}

impl From<HashingError> for AccountError {
    fn from(e: HashingError) -> Self {
        AccountError::Internal(e.to_string())
    }
}

/// Default translation; callers that give `NotFound` a different meaning map it themselves.
impl From<DirectoryError> for AccountError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Conflict => AccountError::Conflict("Email is already used".into()),
            DirectoryError::NotFound => AccountError::user_not_found(),
            DirectoryError::Storage(msg) => AccountError::Internal(msg),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::failure(self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_errors_map_to_statuses() {
        assert_eq!(
            AccountError::from(DirectoryError::Conflict).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AccountError::from(DirectoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AccountError::from(DirectoryError::Storage("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_is_classified_without_message_matching() {
        assert!(matches!(
            DirectoryError::from(sqlx::Error::RowNotFound),
            DirectoryError::NotFound
        ));
        assert!(matches!(
            DirectoryError::from(sqlx::Error::PoolTimedOut),
            DirectoryError::Storage(_)
        ));
    }
}
