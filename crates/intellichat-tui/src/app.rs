use std::sync::Arc;

use intellichat_core::{FetchError, ReplyFetcher, TurnController, TurnOutcome};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::tui::{self, AppEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown,
    Online,
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub controller: TurnController,
    fetcher: Arc<dyn ReplyFetcher>,
    events: UnboundedSender<AppEvent>,

    // Backend
    pub server_url: String,
    pub backend_status: BackendStatus,

    // Ask box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(
        fetcher: Arc<dyn ReplyFetcher>,
        server_url: impl Into<String>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let mut controller = TurnController::new();
        controller.initialize();

        Self {
            should_quit: false,
            controller,
            fetcher,
            events,

            server_url: server_url.into(),
            backend_status: BackendStatus::Unknown,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,
        }
    }

    /// Submit the ask box contents as a new turn.
    ///
    /// The fetch runs on a background task and reports back as
    /// [`AppEvent::Reply`]. Returns false when the controller refused the input.
    pub fn submit_input(&mut self) -> bool {
        let Some(pending) = self.controller.begin_turn(&self.input) else {
            return false;
        };

        self.input.clear();
        self.cursor = 0;
        self.animation_frame = 0;
        self.scroll_to_bottom();

        let fetcher = Arc::clone(&self.fetcher);
        let events = self.events.clone();
        tokio::spawn(async move {
            let message = pending.into_message();
            // A panicking fetcher still produces an outcome
            let outcome = tui::contain_panics(fetcher.fetch_reply(&message))
                .await
                .unwrap_or_else(|panic| Err(FetchError::TaskFailed(panic)));
            if events.send(AppEvent::Reply(outcome)).is_err() {
                debug!("event loop closed before reply arrived");
            }
        });

        true
    }

    pub fn finish_turn(&mut self, outcome: TurnOutcome) {
        if self.controller.complete_turn(outcome).is_some() {
            self.scroll_to_bottom();
        }
    }

    pub fn set_backend_status(&mut self, online: bool) {
        self.backend_status = if online {
            BackendStatus::Online
        } else {
            BackendStatus::Offline
        };
        info!(server = %self.server_url, online, "backend health probed");
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.controller.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn page_size(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    /// Scroll so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    /// Estimate rendered line count of the transcript at the current width
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.controller.transcript() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "IntelliChat:")
            for line in msg.content().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 {
                    1
                } else {
                    char_count.div_ceil(wrap_width)
                };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.controller.is_typing() {
            total_lines = total_lines.saturating_add(2); // Label + "Thinking..."
        }

        total_lines
    }
}
