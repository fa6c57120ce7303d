// Resolver trait for ticket message uploads
use crate::domain::ticket::Attachment;
use async_trait::async_trait;

/// A file attached to a message before it has been stored anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait AttachmentResolver: Send + Sync {
    /// Store the upload and describe where it ended up
    async fn resolve(&self, ticket_id: &str, upload: &Upload) -> anyhow::Result<Attachment>;
}
