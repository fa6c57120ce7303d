// HTTP request handlers for support tickets
use crate::application::attachment_resolver::Upload;
use crate::domain::ticket::{Message, NewMessage, NewTicket, Ticket, TicketPatch};
use crate::infrastructure::attachments::MAX_UPLOAD_BYTES;
use crate::infrastructure::http_response::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

/// Request body limit for posting a message: one base64 encoded attachment
/// of the maximum upload size plus room for the rest of the JSON.
pub const MAX_MESSAGE_BODY_BYTES: usize = MAX_UPLOAD_BYTES.div_ceil(3) * 4 + 64 * 1024;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    pub name: String,
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    /// Base64 encoded file contents
    pub data: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(flatten)]
    pub message: NewMessage,
    #[serde(default)]
    pub attachments: Vec<UploadBody>,
}

impl UploadBody {
    fn decode(self) -> Result<Upload, ApiError> {
        let data = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ApiError::Validation(format!("attachment {} is not valid base64: {}", self.name, e)))?;
        Ok(Upload {
            name: self.name,
            content_type: self.content_type,
            data,
        })
    }
}

pub async fn list_tickets(State(state): State<Arc<AppState>>) -> Json<Vec<Ticket>> {
    Json(state.tickets.lock().await.list().to_vec())
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewTicket>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state.tickets.lock().await.create(new)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Ticket>, ApiError> {
    let tickets = state.tickets.lock().await;
    tickets
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::ticket_not_found(&id))
}

pub async fn update_ticket(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<TicketPatch>,
) -> Result<Json<Ticket>, ApiError> {
    let mut tickets = state.tickets.lock().await;
    if !tickets.update(&id, patch)? {
        return Err(ApiError::ticket_not_found(&id));
    }
    tickets
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::ticket_not_found(&id))
}

pub async fn delete_ticket(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    if state.tickets.lock().await.delete(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ticket_not_found(&id))
    }
}

/// Post a message; attachments are stored first and the message is committed once
pub async fn post_message(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let uploads = request
        .attachments
        .into_iter()
        .map(UploadBody::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let mut tickets = state.tickets.lock().await;
    let message = tickets
        .add_message_with_uploads(state.attachments.as_ref(), &id, request.message, &uploads)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
