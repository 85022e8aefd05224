//! Contract of the object storage service used for media attachments.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Caller-supplied metadata stored alongside an uploaded object.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    /// MIME type, e.g. `image/jpeg`. Also drives the generated file
    /// extension on the client side.
    pub content_type: Option<String>,
}

impl UploadMetadata {
    pub fn image_jpeg() -> Self {
        Self {
            content_type: Some("image/jpeg".to_string()),
        }
    }
}

/// Lifecycle notifications for one in-flight upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Transfer progress. `transferred <= total`.
    Progress { transferred: u64, total: u64 },
    /// Terminal success. `url` is the resolved retrieval URL.
    Done { url: String },
    /// Terminal failure (transfer or URL resolution).
    Failed { reason: String },
}

/// Observes the progress and outcome of one upload.
pub type UploadObserver = Arc<dyn Fn(UploadEvent) + Send + Sync>;

/// Accepts `(path, bytes, metadata)` and reports the upload lifecycle to
/// the observer: zero or more `Progress` events, then exactly one `Done`
/// or `Failed`.
pub trait ObjectStore: Send + Sync {
    fn upload(
        &self,
        path: &str,
        data: Bytes,
        metadata: UploadMetadata,
        observer: UploadObserver,
    ) -> Result<()>;
}
