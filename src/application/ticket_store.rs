// Ticket store - support tickets and their message threads
use crate::application::attachment_resolver::{AttachmentResolver, Upload};
use crate::application::clock::Clock;
use crate::domain::ticket::{Attachment, Message, NewMessage, NewTicket, Ticket, TicketPatch};
use crate::infrastructure::storage::{load_namespace, save_namespace, KeyValueStorage, StorageError};
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub const TICKET_STORAGE_KEY: &str = "ticket-storage";

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("{0}")]
    Validation(String),
    #[error("ticket {0} not found")]
    NotFound(String),
    #[error("upload {name} failed: {source}")]
    Upload {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
struct TicketState {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

#[derive(Serialize)]
struct TicketStateRef<'a> {
    tickets: &'a [Ticket],
}

pub struct TicketStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    tickets: Vec<Ticket>,
}

impl TicketStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let state: TicketState = load_namespace(storage.as_ref(), TICKET_STORAGE_KEY)?.unwrap_or_default();
        tracing::info!("Loaded {} tickets from {}", state.tickets.len(), TICKET_STORAGE_KEY);

        Ok(Self {
            storage,
            clock,
            tickets: state.tickets,
        })
    }

    pub fn create(&mut self, new: NewTicket) -> Result<Ticket, TicketError> {
        if new.title.trim().is_empty() {
            return Err(TicketError::Validation("Please enter a ticket title".to_string()));
        }

        let now = self.clock.now();
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            kind: new.kind,
            created_at: now,
            updated_at: now,
            created_by: new.created_by,
            assigned_to: new.assigned_to,
            company_id: new.company_id,
            project_id: new.project_id,
            datalogger_id: new.datalogger_id,
            messages: Vec::new(),
        };

        self.tickets.push(ticket.clone());
        if let Err(e) = self.persist() {
            self.tickets.pop();
            return Err(e.into());
        }

        tracing::info!("Opened ticket {} ({})", ticket.id, ticket.title);
        Ok(ticket)
    }

    /// Merge `patch` into the ticket with `id`. Returns `false` when no ticket matched.
    pub fn update(&mut self, id: &str, patch: TicketPatch) -> Result<bool, TicketError> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };

        let previous = self.tickets[idx].clone();
        let updated_at = self.next_timestamp(previous.updated_at);
        let ticket = &mut self.tickets[idx];
        patch.apply_to(ticket);
        ticket.updated_at = updated_at;

        if let Err(e) = self.persist() {
            self.tickets[idx] = previous;
            return Err(e.into());
        }
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, TicketError> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };

        let removed = self.tickets.remove(idx);
        if let Err(e) = self.persist() {
            self.tickets.insert(idx, removed);
            return Err(e.into());
        }

        tracing::info!("Deleted ticket {}", id);
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Append a message with already stored attachments and refresh `updated_at`.
    pub fn add_message(
        &mut self,
        ticket_id: &str,
        message: NewMessage,
        attachments: Vec<Attachment>,
    ) -> Result<Message, TicketError> {
        let idx = self
            .position(ticket_id)
            .ok_or_else(|| TicketError::NotFound(ticket_id.to_string()))?;

        let previous_updated_at = self.tickets[idx].updated_at;
        let created_at = self.next_timestamp(previous_updated_at);
        let message = Message {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            content: message.content,
            attachments,
            created_at,
            user_id: message.user_id,
            user_name: message.user_name,
            user_role: message.user_role,
        };

        let ticket = &mut self.tickets[idx];
        ticket.messages.push(message.clone());
        ticket.updated_at = created_at;

        if let Err(e) = self.persist() {
            let ticket = &mut self.tickets[idx];
            ticket.messages.pop();
            ticket.updated_at = previous_updated_at;
            return Err(e.into());
        }

        tracing::debug!(
            "Added message {} to ticket {} with {} attachments",
            message.id,
            ticket_id,
            message.attachments.len()
        );
        Ok(message)
    }

    /// Resolve every upload, then commit the message once. Nothing is
    /// written when the ticket is unknown or any upload fails.
    pub async fn add_message_with_uploads(
        &mut self,
        resolver: &dyn AttachmentResolver,
        ticket_id: &str,
        message: NewMessage,
        uploads: &[Upload],
    ) -> Result<Message, TicketError> {
        if self.get(ticket_id).is_none() {
            return Err(TicketError::NotFound(ticket_id.to_string()));
        }

        let attachments = resolve_uploads(resolver, ticket_id, uploads).await?;
        self.add_message(ticket_id, message, attachments)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tickets.iter().position(|t| t.id == id)
    }

    fn persist(&self) -> Result<(), StorageError> {
        let state = TicketStateRef { tickets: &self.tickets };
        save_namespace(self.storage.as_ref(), TICKET_STORAGE_KEY, &state)
    }

    fn next_timestamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }
}

/// Resolve all uploads concurrently; the first failure aborts the batch.
pub async fn resolve_uploads(
    resolver: &dyn AttachmentResolver,
    ticket_id: &str,
    uploads: &[Upload],
) -> Result<Vec<Attachment>, TicketError> {
    let pending = uploads.iter().map(|upload| async move {
        resolver
            .resolve(ticket_id, upload)
            .await
            .map_err(|source| TicketError::Upload {
                name: upload.name.clone(),
                source,
            })
    });

    try_join_all(pending).await
}
