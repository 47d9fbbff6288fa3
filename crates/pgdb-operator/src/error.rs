use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pgdb_core::{ErrorKind, ReconcileError};
use serde::Serialize;

/// HTTP-facing error returned by the hook endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    retryable: bool,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::UnprocessableEntity(_) => "invalid",
            ApiError::ServiceUnavailable(_) => "unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::ServiceUnavailable(_))
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::Permission => ApiError::Forbidden(message),
            ErrorKind::InvalidIdentifier | ErrorKind::InvalidDescriptor | ErrorKind::Encoding => {
                ApiError::UnprocessableEntity(message)
            }
            ErrorKind::Transient | ErrorKind::Generation => ApiError::ServiceUnavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.code(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgdb_core::{CredentialError, TenantErrorKind, TenantStateError, TenantStep};

    #[test]
    fn test_reconcile_errors_map_to_status_codes() {
        let conflict = ReconcileError::Conflict {
            namespace: "ns".into(),
            name: "creds".into(),
        };
        assert_eq!(ApiError::from(conflict).status_code(), StatusCode::CONFLICT);

        let denied = ReconcileError::TenantState(TenantStateError::new(
            TenantStep::Database,
            TenantErrorKind::Permission,
            "permission denied to create database",
        ));
        assert_eq!(ApiError::from(denied).status_code(), StatusCode::FORBIDDEN);

        let invalid = ReconcileError::TenantState(TenantStateError::new(
            TenantStep::Role,
            TenantErrorKind::InvalidIdentifier,
            "contains a double quote",
        ));
        assert_eq!(
            ApiError::from(invalid).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let race = ReconcileError::TenantState(TenantStateError::new(
            TenantStep::Role,
            TenantErrorKind::Duplicate,
            "role already exists",
        ));
        let err = ApiError::from(race);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());

        let entropy = ReconcileError::from(CredentialError::Entropy("no entropy".into()));
        assert_eq!(
            ApiError::from(entropy).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
