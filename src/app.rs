use ratatui::layout::Rect;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::session::ChatSession;
use crate::webhook::{ExchangeError, WebhookClient};

/// Prompts offered on the welcome panel before the first message
pub const SUGGESTIONS: [&str; 3] = [
    "I need help with my order",
    "How do I reset my password?",
    "Request a refund",
];

/// Maximum number of input lines shown before the box scrolls
pub const MAX_INPUT_LINES: u16 = 4;

pub struct App {
    pub should_quit: bool,

    // Conversation and the outstanding request, if any
    pub session: ChatSession,
    pub client: WebhookClient,
    pub exchange_task: Option<JoinHandle<Result<Value, ExchangeError>>>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_max_scroll: u16, // updated during render
    pub chat_height: u16,
    pub follow_bottom: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing indicator

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub suggestion_areas: Vec<Rect>,
}

impl App {
    pub fn new(client: WebhookClient) -> Self {
        Self {
            should_quit: false,

            session: ChatSession::new(),
            client,
            exchange_task: None,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_height: 0,
            follow_bottom: true,

            animation_frame: 0,

            chat_area: None,
            suggestion_areas: Vec::new(),
        }
    }

    /// Send the input buffer on a background task, if the session accepts it
    pub fn send_message(&mut self) {
        let Some(message) = self.session.submit(&mut self.input) else {
            return;
        };
        self.input_cursor = 0;
        self.follow_bottom = true;

        info!(endpoint = %self.client.endpoint(), "sending message");
        let client = self.client.clone();
        self.exchange_task = Some(tokio::spawn(async move {
            client.send(&message).await
        }));
    }

    /// Apply the exchange result once its task has finished
    pub async fn poll_exchange(&mut self) {
        let finished = self
            .exchange_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.exchange_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "exchange task failed");
                    Err(ExchangeError::from(e))
                }
            };
            self.session.complete(result);
            self.follow_bottom = true;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.session.is_pending()
    }

    /// Whether the welcome panel with suggestions is showing
    pub fn show_welcome(&self) -> bool {
        self.session.conversation().is_empty() && !self.is_pending()
    }

    /// Put a suggestion into the input box without sending it
    pub fn apply_suggestion(&mut self, idx: usize) {
        if let Some(text) = SUGGESTIONS.get(idx) {
            self.input = text.to_string();
            self.input_cursor = self.input.chars().count();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing. The box is read-only while a request is pending.

    pub fn insert_str(&mut self, text: &str) {
        if self.is_pending() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        // Normalize pasted CRLF so cursor math stays in chars
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.input.insert_str(byte_pos, &text);
        self.input_cursor += text.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        if self.is_pending() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_pending() || self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_pending() {
            return;
        }
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    /// Cursor position as (line, column), both in chars
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.input.chars().take(self.input_cursor).collect();
        let line = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line, col)
    }

    // Chat scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
        if self.chat_scroll >= self.chat_max_scroll {
            self.follow_bottom = true;
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
