//! Submission controller: the only place that mutates the transcript.
//!
//! One submission moves `Idle -> Validating -> Sending -> Idle`. Validation
//! failures return to idle without touching the transcript. Once sending
//! begins the user turn is appended right away and stays there whatever the
//! outcome; only a successful reply adds the assistant turn.

use std::sync::Arc;

use crate::ai::{ChatBackend, UploadRequest};
use crate::composer::{Attachment, TurnComposer};
use crate::error::{SubmitError, UploadError};
use crate::state::{SubmissionState, Turn};
use crate::transcript::Transcript;

pub struct SubmissionController {
    backend: Arc<dyn ChatBackend>,
    transcript: Transcript,
    composer: TurnComposer,
    state: SubmissionState,
}

impl SubmissionController {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            transcript: Transcript::new(),
            composer: TurnComposer::new(),
            state: SubmissionState::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn composer(&self) -> &TurnComposer {
        &self.composer
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn in_flight(&self) -> bool {
        self.state.in_flight
    }

    pub fn last_error(&self) -> Option<&SubmitError> {
        self.state.last_error.as_ref()
    }

    /// Handle for running a request away from the controller (e.g. on a spawned task)
    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.composer.set_text(text);
    }

    pub fn set_file(&mut self, file: Option<Attachment>) {
        self.composer.set_file(file);
    }

    pub fn dismiss_error(&mut self) {
        self.state.last_error = None;
    }

    /// Validate and build one submission, then wait for its outcome.
    pub async fn submit(&mut self) -> Result<(), SubmitError> {
        let request = self.begin_submit()?;
        let outcome = self.backend.send(request).await;
        self.complete_submit(outcome)
    }

    /// First half of a submission: validation, optimistic append and request
    /// construction. The caller must hand the request's outcome to
    /// [`complete_submit`](Self::complete_submit).
    pub fn begin_submit(&mut self) -> Result<UploadRequest, SubmitError> {
        if self.state.in_flight {
            tracing::debug!("submission rejected, another one is in flight");
            return Err(SubmitError::InFlight);
        }

        if self.composer.is_empty() {
            self.state.last_error = Some(SubmitError::EmptyTurn);
            return Err(SubmitError::EmptyTurn);
        }

        self.state.in_flight = true;
        self.state.last_error = None;

        let pending = self.composer.snapshot_and_clear();
        let prompt = pending.text.unwrap_or_default();
        // History is taken before this turn's user message goes in
        let history = self.transcript.snapshot();
        self.transcript.append(Turn::user(prompt.clone()));

        tracing::info!(
            history_len = history.len(),
            prompt_len = prompt.len(),
            file = pending.file.as_ref().map(|f| f.name()),
            "submission started"
        );

        Ok(UploadRequest {
            file: pending.file,
            history,
            prompt,
        })
    }

    /// Second half of a submission: record the reply or the error.
    pub fn complete_submit(&mut self, outcome: Result<String, UploadError>) -> Result<(), SubmitError> {
        if !self.state.in_flight {
            tracing::warn!("ignoring completion with no submission in flight");
            return Ok(());
        }
        self.state.in_flight = false;

        match outcome {
            Ok(reply) => {
                tracing::info!(reply_len = reply.len(), "submission succeeded");
                self.transcript.append(Turn::assistant(reply));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "submission failed");
                let err = SubmitError::from(err);
                self.state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
