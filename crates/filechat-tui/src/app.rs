use std::path::PathBuf;

use filechat_core::{is_accepted_path, Attachment, SubmissionController, SubmitError, UploadError};
use tokio::task::JoinHandle;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    /// Typing the path of a file to attach
    Attaching,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub endpoint: String,

    // Conversation, draft and submission state all live here
    pub controller: SubmissionController,
    pub submit_task: Option<JoinHandle<Result<String, UploadError>>>,

    // Draft editing (the text itself is in the composer)
    pub cursor: usize,
    pub path_input: String,
    /// Problems picking a file; submission errors live in the controller
    pub notice: Option<String>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub animation_frame: u8,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

impl App {
    pub fn new(controller: SubmissionController, endpoint: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            endpoint,
            controller,
            submit_task: None,
            cursor: 0,
            path_input: String::new(),
            notice: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
        }
    }

    pub fn draft(&self) -> &str {
        self.controller.composer().text()
    }

    fn edit_draft(&mut self, edit: impl FnOnce(&mut String, usize) -> usize) {
        let mut text = self.draft().to_string();
        let cursor = self.cursor.min(text.chars().count());
        self.cursor = edit(&mut text, cursor);
        self.controller.set_text(text);
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit_draft(|text, cursor| {
            let idx = char_to_byte_index(text, cursor);
            text.insert(idx, c);
            cursor + 1
        });
    }

    pub fn insert_str(&mut self, s: &str) {
        // The input box is one line, so line breaks and tabs become spaces
        let s: String = s
            .replace("\r\n", " ")
            .chars()
            .filter_map(|c| match c {
                '\n' | '\r' | '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();
        self.edit_draft(|text, cursor| {
            let idx = char_to_byte_index(text, cursor);
            text.insert_str(idx, &s);
            cursor + s.chars().count()
        });
    }

    pub fn backspace(&mut self) {
        self.edit_draft(|text, cursor| {
            if cursor == 0 {
                return 0;
            }
            let idx = char_to_byte_index(text, cursor - 1);
            text.remove(idx);
            cursor - 1
        });
    }

    pub fn delete(&mut self) {
        self.edit_draft(|text, cursor| {
            if cursor < text.chars().count() {
                let idx = char_to_byte_index(text, cursor);
                text.remove(idx);
            }
            cursor
        });
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft().chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft().chars().count();
    }

    /// Accept the draft and run the request on a background task
    pub fn start_submission(&mut self) {
        match self.controller.begin_submit() {
            Ok(request) => {
                let backend = self.controller.backend();
                self.submit_task = Some(tokio::spawn(async move { backend.send(request).await }));
                self.cursor = 0;
                self.notice = None;
                self.scroll_to_bottom();
            }
            Err(SubmitError::InFlight) => {}
            Err(err) => tracing::debug!(error = %err, "submission not started"),
        }
    }

    /// Hand a finished request back to the controller
    pub async fn poll_submission(&mut self) {
        let finished = self.submit_task.as_ref().is_some_and(|t| t.is_finished());
        if !finished {
            return;
        }
        if let Some(task) = self.submit_task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(UploadError::Transport(err.to_string())),
            };
            // Failures end up in the controller's error slot
            let _ = self.controller.complete_submit(outcome);
            self.scroll_to_bottom();
        }
    }

    pub fn abort_submission(&mut self) {
        if let Some(task) = self.submit_task.take() {
            task.abort();
        }
    }

    pub fn begin_attach(&mut self) {
        self.path_input.clear();
        self.notice = None;
        self.input_mode = InputMode::Attaching;
    }

    pub async fn attach_from_input(&mut self) {
        let raw = self.path_input.trim();
        if raw.is_empty() {
            self.input_mode = InputMode::Normal;
            return;
        }
        let path = expand_home(raw);

        if !is_accepted_path(&path) {
            self.notice = Some("Only CSV or image files can be attached.".to_string());
            return;
        }

        match Attachment::from_path(&path).await {
            Ok(attachment) => {
                self.controller.set_file(Some(attachment));
                self.notice = None;
                self.path_input.clear();
                self.input_mode = InputMode::Normal;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "attachment failed");
                self.notice = Some(format!("Could not read {}: {}", path.display(), err));
            }
        }
    }

    pub fn remove_attachment(&mut self) {
        self.controller.set_file(None);
    }

    pub fn dismiss_messages(&mut self) {
        self.notice = None;
        self.controller.dismiss_error();
    }

    pub fn tick_animation(&mut self) {
        if self.controller.in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    /// Scroll so the newest turn (or the processing indicator) is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        // Fall back to a typical width before the first render
        let width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let lines = ui::transcript_lines(
            self.controller.transcript().turns(),
            self.controller.in_flight(),
            self.animation_frame,
            width as usize,
        );
        // Count rows the way the chat pane wraps them
        let total = ui::chat_paragraph(lines).line_count(width);
        let visible = if self.chat_height > 0 { self.chat_height as usize } else { 20 };
        total.saturating_sub(visible).min(u16::MAX as usize) as u16
    }
}
