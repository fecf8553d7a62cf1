pub mod ai;
pub mod composer;
pub mod config;
pub mod controller;
pub mod error;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use ai::{ChatBackend, UploadClient, UploadRequest};
pub use composer::{is_accepted_path, Attachment, PendingInput, TurnComposer};
pub use config::Config;
pub use controller::SubmissionController;
pub use error::{SubmitError, UploadError};
pub use state::{Role, SubmissionState, Turn};
pub use transcript::Transcript;
