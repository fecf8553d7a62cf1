//! In-progress user input for the next turn

use std::path::Path;

use anyhow::{anyhow, Result};

/// Extensions the file picker advertises ("CSV or image")
const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// A file attached to the next turn. Sent as-is, never rendered in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    bytes: Vec<u8>,
    mime: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = detect_mime(&name, &bytes);
        Self { name, bytes, mime }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Not a file path: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(file = %name, size = bytes.len(), "attachment loaded");
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<u8>, String) {
        (self.name, self.bytes, self.mime)
    }
}

/// Sniff images by magic bytes, fall back to the extension for everything else.
fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.mime_type().to_string();
        }
    }

    let mime = match extension_of(name).as_deref() {
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    };
    mime.to_string()
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Type filter applied by the file picker. The transport itself never checks.
pub fn is_accepted_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(extension_of)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Snapshot of the composer taken when a submission is accepted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInput {
    pub text: Option<String>,
    pub file: Option<Attachment>,
}

impl PendingInput {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.file.is_none()
    }
}

/// Holds the draft text and the optional attachment. No validation happens here.
#[derive(Debug, Clone, Default)]
pub struct TurnComposer {
    draft_text: Option<String>,
    attached_file: Option<Attachment>,
}

impl TurnComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty string clears the draft.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.draft_text = if text.is_empty() { None } else { Some(text) };
    }

    pub fn set_file(&mut self, file: Option<Attachment>) {
        self.attached_file = file;
    }

    pub fn text(&self) -> &str {
        self.draft_text.as_deref().unwrap_or_default()
    }

    pub fn file(&self) -> Option<&Attachment> {
        self.attached_file.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.draft_text.is_none() && self.attached_file.is_none()
    }

    pub fn snapshot_and_clear(&mut self) -> PendingInput {
        PendingInput {
            text: self.draft_text.take(),
            file: self.attached_file.take(),
        }
    }
}
