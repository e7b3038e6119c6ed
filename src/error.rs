use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy surfaced at the HTTP boundary.
///
/// Everything a handler can fail with maps onto one of these; unexpected
/// errors collapse into `Internal` and never leak detail to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("Attendance has already been marked for this subject today.")]
    AlreadyMarked,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Google account not connected.")]
    GoogleNotConnected,
    #[error("calendar provider request failed")]
    External(anyhow::Error),
    #[error("internal error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::AlreadyMarked => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::GoogleNotConnected => StatusCode::BAD_REQUEST,
            ApiError::External(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Server Error".to_string()
            }
            ApiError::External(e) => {
                error!(error = %e, "calendar provider error");
                "Calendar provider request failed".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "success": false, "message": message }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Duplicate("User").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::AlreadyMarked.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("Subject").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Unauthenticated("Not authorized").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::GoogleNotConnected.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn already_marked_keeps_the_original_wording() {
        assert_eq!(
            ApiError::AlreadyMarked.to_string(),
            "Attendance has already been marked for this subject today."
        );
    }
}
