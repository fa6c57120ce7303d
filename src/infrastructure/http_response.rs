// HTTP response utilities - error mapping for JSON handlers
use crate::application::report_editor::EditorError;
use crate::application::report_store::StoreError;
use crate::application::ticket_store::TicketError;
use crate::infrastructure::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by every handler, rendered as `{ "error": message }`.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn report_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("report {} not found", id))
    }

    pub fn ticket_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("ticket {} not found", id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(message) | ApiError::NotFound(message) => message,
            ApiError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                "internal error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateWidget(_) => ApiError::Validation(e.to_string()),
            StoreError::Storage(e) => e.into(),
        }
    }
}

impl From<EditorError> for ApiError {
    fn from(e: EditorError) -> Self {
        match e {
            EditorError::Validation(message) => ApiError::Validation(message),
            EditorError::ReportNotFound(_) | EditorError::WidgetNotFound(_) => ApiError::NotFound(e.to_string()),
            EditorError::NoActiveDraft => ApiError::Validation(e.to_string()),
            EditorError::Store(e) => e.into(),
        }
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::Validation(message) => ApiError::Validation(message),
            TicketError::NotFound(_) => ApiError::NotFound(e.to_string()),
            TicketError::Upload { .. } => ApiError::Validation(e.to_string()),
            TicketError::Storage(e) => e.into(),
        }
    }
}
