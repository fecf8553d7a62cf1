pub mod upload;

use async_trait::async_trait;

use crate::composer::Attachment;
use crate::error::UploadError;
use crate::state::Turn;

pub use upload::{UploadClient, MAX_PAYLOAD_BYTES, REQUEST_TIMEOUT, UPLOAD_PATH};

/// Everything one turn sends to the assistant service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: Option<Attachment>,
    /// Conversation before this turn's user message
    pub history: Vec<Turn>,
    pub prompt: String,
}

impl UploadRequest {
    pub fn history_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.history)
    }
}

/// The remote assistant, seen as one request in, one complete reply out
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: UploadRequest) -> Result<String, UploadError>;
}
