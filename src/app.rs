use ratatui::layout::Rect;

use crate::api::ApiClient;
use crate::chat::{ChatOutcome, ChatPanel, Route};
use crate::config::Config;
use crate::document::{Coords, Document};
use crate::toolbar::{EditMode, Toolbar};
use crate::tui::{AppEvent, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Editor,
    Chat,
}

/// Fallback wrap width before the first render has measured the editor.
const DEFAULT_EDITOR_WIDTH: u16 = 80;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Components
    pub document: Document,
    pub toolbar: Toolbar,
    pub chat: ChatPanel,

    // Editor view state
    pub editor_scroll: u16,
    pub drag_anchor: Option<usize>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub editor_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub toolbar_buttons: Vec<(EditMode, Rect)>,
    pub chat_width: u16,
    pub chat_height: u16,

    // Backends
    pub config: Config,
    pub api: ApiClient,
    events: EventSender,
}

impl App {
    pub fn new(config: Config, api: ApiClient, events: EventSender) -> Self {
        let toolbar = Toolbar::new(config.toolbar_offset);
        Self {
            should_quit: false,
            focus: FocusPane::Editor,

            document: Document::default(),
            toolbar,
            chat: ChatPanel::new(),

            editor_scroll: 0,
            drag_anchor: None,

            animation_frame: 0,

            editor_area: None,
            chat_area: None,
            toolbar_buttons: Vec::new(),
            chat_width: 0,
            chat_height: 0,

            config,
            api,
            events,
        }
    }

    pub fn editor_width(&self) -> u16 {
        self
            .editor_area
            .map(|r| r.width)
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_EDITOR_WIDTH)
    }

    /// Screen position of a document offset, honoring scroll and the editor's origin.
    pub fn screen_coords(&self, pos: usize) -> Coords {
        let local = self.document.coords_at_pos(pos, self.editor_width());
        let (ox, oy) = self.editor_area.map(|r| (r.x as i32, r.y as i32)).unwrap_or((0, 0));
        Coords::new(local.x + ox, local.y - self.editor_scroll as i32 + oy)
    }

    /// Document offset under a screen cell inside the editor.
    pub fn pos_at_screen(&self, column: u16, row: u16) -> usize {
        let (ox, oy) = self.editor_area.map(|r| (r.x as i32, r.y as i32)).unwrap_or((0, 0));
        let local = Coords::new(
            column as i32 - ox,
            row as i32 - oy + self.editor_scroll as i32,
        );
        self.document.pos_at_coords(local, self.editor_width())
    }

    /// Must run after anything that may have moved the cursor or selection.
    pub fn after_editor_change(&mut self) {
        self.ensure_cursor_visible();
        self.sync_toolbar();
    }

    pub fn sync_toolbar(&mut self) {
        let range = self.document.selection();
        let start = self.screen_coords(range.from);
        let end = self.screen_coords(range.to);
        self.toolbar.on_selection_change(range, start, end);
    }

    pub fn ensure_cursor_visible(&mut self) {
        let height = self.editor_area.map(|r| r.height).unwrap_or(0);
        if height == 0 {
            return;
        }
        let row = self
            .document
            .coords_at_pos(self.document.cursor(), self.editor_width())
            .y
            .max(0) as u16;

        if row < self.editor_scroll {
            self.editor_scroll = row;
        } else if row >= self.editor_scroll + height {
            self.editor_scroll = row + 1 - height;
        }
    }

    pub fn scroll_editor(&mut self, delta: i32) {
        let rows = self.document.visual_lines(self.editor_width()).len() as i32;
        let height = self.editor_area.map(|r| r.height as i32).unwrap_or(1);
        let max = (rows - height).max(0);
        self.editor_scroll = (self.editor_scroll as i32 + delta).clamp(0, max) as u16;
        self.sync_toolbar();
    }

    // Chat

    /// Logs the input line and fires one request for it. The reply comes back
    /// as [`AppEvent::Chat`].
    pub fn send_chat(&mut self) {
        let Some(outgoing) = self.chat.submit() else {
            return;
        };
        self.scroll_chat_to_bottom();
        log::info!("Sending {:?} message", outgoing.route);

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = match outgoing.route {
                Route::Search => match api.search(&outgoing.text).await {
                    Ok(result) => ChatOutcome::SearchResult(result),
                    Err(e) => {
                        log::error!("Search request failed: {}", e);
                        ChatOutcome::Failed
                    }
                },
                Route::Chat => match api.chat(&outgoing.text).await {
                    Ok(reply) => ChatOutcome::Reply(reply),
                    Err(e) => {
                        log::error!("Chat request failed: {}", e);
                        ChatOutcome::Failed
                    }
                },
            };
            let _ = events.send(AppEvent::Chat(outcome));
        });
    }

    pub fn on_chat_outcome(&mut self, outcome: ChatOutcome) {
        if let Some(text) = self.chat.receive(outcome) {
            if self.config.insert_search_results {
                self.document.insert_paragraph(&text);
                self.after_editor_change();
            }
        }
        self.scroll_chat_to_bottom();
    }

    /// Puts the latest AI answer into the document at the cursor.
    pub fn insert_last_reply(&mut self) -> bool {
        let Some(text) = self.chat.last_ai_reply().map(|m| m.text.clone()) else {
            return false;
        };
        self.document.insert_paragraph(&text);
        self.after_editor_change();
        true
    }

    // Toolbar

    pub fn request_ai_edit(&mut self, mode: EditMode) {
        let Some(pending) = self.toolbar.request_edit(mode, &self.document) else {
            return;
        };

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let text = match api.chat(&pending.prompt).await {
                Ok(reply) => Some(reply),
                Err(e) => {
                    log::error!("AI edit #{} failed: {}", pending.id, e);
                    None
                }
            };
            let _ = events.send(AppEvent::Suggestion { id: pending.id, text });
        });
    }

    pub fn on_suggestion(&mut self, id: u64, text: Option<String>) {
        self.toolbar.on_suggestion(id, text);
    }

    pub fn confirm_suggestion(&mut self) {
        if self.toolbar.confirm(&mut self.document) {
            self.after_editor_change();
        }
    }

    pub fn cancel_suggestion(&mut self) {
        self.toolbar.cancel();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.in_flight() > 0 || self.toolbar.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 38 };

        let mut total_lines: usize = 0;
        for msg in self.chat.messages() {
            // Sender line plus the blank line after the message
            total_lines = total_lines.saturating_add(2);
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
        }
        if self.chat.in_flight() > 0 {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.chat_height > 0 { self.chat_height as usize } else { 20 };
        let scroll = total_lines.saturating_sub(visible_height);
        self.chat.scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
    }
}
