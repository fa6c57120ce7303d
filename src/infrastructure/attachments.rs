// Local disk attachment storage
use crate::application::attachment_resolver::{AttachmentResolver, Upload};
use crate::application::clock::Clock;
use crate::domain::ticket::Attachment;
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Writes uploads to `<root>/<ticket>/<uuid>-<name>`.
pub struct LocalAttachmentResolver {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl LocalAttachmentResolver {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }
}

/// Keep only the final path component and characters safe in a file name.
fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl AttachmentResolver for LocalAttachmentResolver {
    async fn resolve(&self, ticket_id: &str, upload: &Upload) -> anyhow::Result<Attachment> {
        if upload.data.len() > MAX_UPLOAD_BYTES {
            anyhow::bail!("{} is {} bytes, limit is {}", upload.name, upload.data.len(), MAX_UPLOAD_BYTES);
        }

        let id = Uuid::new_v4().to_string();
        let ticket_dir = sanitize_name(ticket_id);
        let file_name = format!("{}-{}", id, sanitize_name(&upload.name));
        let dir = self.root.join(&ticket_dir);

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        tracing::debug!("Stored attachment {} ({} bytes)", path.display(), upload.data.len());

        Ok(Attachment {
            id,
            name: upload.name.clone(),
            url: format!("/attachments/{}/{}", ticket_dir, file_name),
            content_type: upload.content_type.clone(),
            size: upload.data.len() as u64,
            uploaded_at: self.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::SystemClock;

    fn upload(name: &str, data: Vec<u8>) -> Upload {
        Upload {
            name: name.to_string(),
            content_type: "text/plain".to_string(),
            data,
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name("foto sensor.png"), "foto_sensor.png");
        assert_eq!(sanitize_name(".."), "upload");
    }

    #[tokio::test]
    async fn test_resolve_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LocalAttachmentResolver::new(dir.path(), Arc::new(SystemClock));

        let attachment = resolver.resolve("ticket-1", &upload("log.txt", b"hello".to_vec())).await.unwrap();

        assert_eq!(attachment.name, "log.txt");
        assert_eq!(attachment.size, 5);
        let file_name = attachment.url.rsplit('/').next().unwrap();
        let stored = std::fs::read(dir.path().join("ticket-1").join(file_name)).unwrap();
        assert_eq!(stored, b"hello");
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LocalAttachmentResolver::new(dir.path(), Arc::new(SystemClock));

        let result = resolver
            .resolve("ticket-1", &upload("big.bin", vec![0; MAX_UPLOAD_BYTES + 1]))
            .await;
        assert!(result.is_err());
    }
}
