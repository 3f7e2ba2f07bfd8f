use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::DomainError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(message) => ApiError::BadRequest(message),
            DomainError::NotFound(message) => ApiError::NotFound(message),
            conflict @ DomainError::ScheduleConflict { .. } => {
                ApiError::Conflict(conflict.to_string())
            }
            DomainError::Scope(message) => ApiError::Forbidden(message.to_string()),
            early @ DomainError::TooEarly { .. } => ApiError::Forbidden(early.to_string()),
            closed @ DomainError::WindowClosed { .. } => ApiError::Forbidden(closed.to_string()),
            dup @ DomainError::AlreadySubmitted => ApiError::Conflict(dup.to_string()),
            DomainError::NoQuestions => {
                ApiError::Internal("Exam has no gradable questions".to_string())
            }
            DomainError::Storage(err) => ApiError::internal(err, "Storage operation failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::format_primitive;
    use time::macros::datetime;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(DomainError::Validation("bad".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::NotFound("gone".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(DomainError::Scope("denied").into()), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DomainError::AlreadySubmitted.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::NoQuestions.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn schedule_conflict_carries_the_conflicting_window() {
        let err = DomainError::ScheduleConflict {
            title: "Midterm".to_string(),
            start: format_primitive(datetime!(2026-03-02 10:00)),
            end: format_primitive(datetime!(2026-03-02 12:00)),
        };
        let api: ApiError = err.into();
        let ApiError::Conflict(detail) = api else { panic!("expected conflict") };
        assert!(detail.contains("Midterm"));
        assert!(detail.contains("2026-03-02T10:00:00Z"));
        assert!(detail.contains("2026-03-02T12:00:00Z"));
    }

    #[test]
    fn window_errors_carry_boundaries() {
        let early: ApiError = DomainError::TooEarly {
            opens_at: format_primitive(datetime!(2026-03-02 09:30)),
        }
        .into();
        let ApiError::Forbidden(detail) = early else { panic!("expected forbidden") };
        assert!(detail.contains("2026-03-02T09:30:00Z"));
    }
}
