//! Binary attachment inputs for a dispatch.

use std::path::PathBuf;

use relay_core::DispatchError;

/// Where an attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    /// Bytes already in memory (e.g. decoded from an inbound request).
    Bytes(Vec<u8>),
    /// A file read at build time. The read can fail.
    Path(PathBuf),
}

/// One binary attachment with its declared MIME type.
#[derive(Debug, Clone)]
pub struct Attachment {
    mime_type: String,
    source: AttachmentSource,
}

impl Attachment {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source: AttachmentSource::Bytes(bytes),
        }
    }

    pub fn from_path(mime_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source: AttachmentSource::Path(path.into()),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Fetch the attachment bytes.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DispatchError> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(bytes.clone()),
            AttachmentSource::Path(path) => tokio::fs::read(path).await.map_err(|err| {
                DispatchError::AttachmentRead {
                    path: path.display().to_string(),
                    detail: err.to_string(),
                }
            }),
        }
    }
}
