use thiserror::Error;

/// User-visible outcome of a failed submission. The `Display` text is what the
/// front end shows in its error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Neither text nor a file was provided
    #[error("Please enter a message.")]
    EmptyTurn,

    #[error("A request is already in progress.")]
    InFlight,

    #[error("Request timed out. Please try again with a smaller file or message.")]
    Timeout,

    /// Any other network or server failure. The detail goes to the log only.
    #[error("Error communicating with server.")]
    Communication(String),
}

impl SubmitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SubmitError::Timeout)
    }
}

/// Failure of the upload transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("request timed out")]
    Timeout,

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: usize },

    #[error("server returned status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Timeout
        } else {
            UploadError::Transport(err.to_string())
        }
    }
}

impl From<UploadError> for SubmitError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Timeout => SubmitError::Timeout,
            other => SubmitError::Communication(other.to_string()),
        }
    }
}
