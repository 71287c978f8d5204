//! HTTP API over [`TabService`](crate::application::TabService).

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::application::AppError;
use crate::domain::LedgerError;

pub use routes::{ServerState, router, run_with_listener};

mod routes;
mod tabs;

pub enum ServerError {
    App(AppError),
    Rejection(JsonRejection),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn status_for_app_error(err: &AppError) -> StatusCode {
    match err {
        AppError::TabNotFound(_) => StatusCode::NOT_FOUND,
        AppError::Ledger(LedgerError::DuplicateParticipant(_)) => StatusCode::CONFLICT,
        AppError::Ledger(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::CorruptTab { .. } | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_app_error(err: AppError) -> String {
    match err {
        AppError::Storage(err) => {
            tracing::error!("storage error: {err:#}");
            "internal server error".to_string()
        }
        AppError::CorruptTab { .. } => "internal server error".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::App(err) => (status_for_app_error(&err), message_for_app_error(err)),
            ServerError::Rejection(rejection) => (rejection.status(), rejection.body_text()),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<AppError> for ServerError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::App(AppError::Ledger(value))
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Rejection(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_not_found_maps_to_404() {
        let res = ServerError::from(AppError::TabNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_participant_maps_to_409() {
        let res = ServerError::from(LedgerError::DuplicateParticipant("a".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_maps_to_422() {
        for err in [
            LedgerError::InvalidAmount("0".to_string()),
            LedgerError::NoInvolvedUsers,
            LedgerError::ParticipantNotFound("a".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn test_storage_maps_to_500() {
        let res = ServerError::from(AppError::Storage(anyhow::anyhow!("disk on fire"))).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
