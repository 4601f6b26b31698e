//! Floating toolbar that follows the editor selection and proposes AI rewrites.
//!
//! ```text
//! Hidden <-> Visible -> AwaitingAi -> ModalOpen -> Hidden
//! ```
//!
//! An in-flight request is never cancelled. Its response opens the modal even
//! if the selection moved in the meantime; confirming replaces the range that
//! was selected when the request went out.

use crate::document::{Coords, Document, SelectionRange};

/// Distance between the selection's top edge and the anchor, in pixels.
pub const ANCHOR_OFFSET_PX: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Improve,
    Shorten,
    Lengthen,
    Table,
}

impl EditMode {
    pub fn all() -> [EditMode; 4] {
        [EditMode::Improve, EditMode::Shorten, EditMode::Lengthen, EditMode::Table]
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditMode::Improve => "Edit with AI",
            EditMode::Shorten => "Shorten",
            EditMode::Lengthen => "Lengthen",
            EditMode::Table => "Convert to Table",
        }
    }

    pub fn prompt(&self, selected: &str) -> String {
        match self {
            EditMode::Improve => format!("Please improve this text: \"{}\"", selected),
            EditMode::Shorten => format!("Shorten this text but keep the meaning: \"{}\"", selected),
            EditMode::Lengthen => format!("Expand and elaborate on this text: \"{}\"", selected),
            EditMode::Table => format!("Convert this text into a simple markdown table: \"{}\"", selected),
        }
    }
}

/// Anchor point centered over the selection, `offset` above its top edge.
pub fn anchor_above(start: Coords, end: Coords, offset: i32) -> Coords {
    Coords::new((start.x + end.x) / 2, start.y.min(end.y) - offset)
}

/// An AI rewrite that has been sent and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub id: u64,
    pub mode: EditMode,
    pub original: String,
    pub range: SelectionRange,
    /// Document revision when `range` was captured.
    pub revision: usize,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarState {
    Hidden,
    Visible {
        coords: Coords,
    },
    AwaitingAi {
        coords: Coords,
        pending: PendingEdit,
    },
    ModalOpen {
        coords: Coords,
        original: String,
        suggestion: String,
        range: SelectionRange,
        revision: usize,
        failed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Toolbar {
    state: ToolbarState,
    offset: i32,
    next_id: u64,
}

impl Default for Toolbar {
    fn default() -> Self {
        Self::new(ANCHOR_OFFSET_PX)
    }
}

impl Toolbar {
    pub fn new(offset: i32) -> Self {
        Self {
            state: ToolbarState::Hidden,
            offset,
            next_id: 0,
        }
    }

    pub fn state(&self) -> &ToolbarState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.state, ToolbarState::Hidden)
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self.state, ToolbarState::ModalOpen { .. })
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, ToolbarState::AwaitingAi { .. })
    }

    pub fn coords(&self) -> Option<Coords> {
        match &self.state {
            ToolbarState::Hidden => None,
            ToolbarState::Visible { coords }
            | ToolbarState::AwaitingAi { coords, .. }
            | ToolbarState::ModalOpen { coords, .. } => Some(*coords),
        }
    }

    /// Called on every selection change with the screen coordinates of the
    /// selection's endpoints.
    pub fn on_selection_change(&mut self, range: SelectionRange, start: Coords, end: Coords) {
        let anchor = anchor_above(start, end, self.offset);
        if let ToolbarState::AwaitingAi { coords, .. } = &mut self.state {
            if !range.is_empty() {
                *coords = anchor;
            }
            return;
        }
        if self.is_modal_open() {
            return;
        }

        self.state = if range.is_empty() {
            ToolbarState::Hidden
        } else {
            ToolbarState::Visible { coords: anchor }
        };
    }

    /// Starts a rewrite of the current selection. Returns the request to send,
    /// or `None` when the toolbar is not showing or nothing is selected.
    pub fn request_edit(&mut self, mode: EditMode, doc: &Document) -> Option<PendingEdit> {
        let coords = match self.state {
            ToolbarState::Visible { coords } => coords,
            _ => return None,
        };

        let range = doc.selection();
        let original = doc.selected_text();
        if range.is_empty() || original.is_empty() {
            return None;
        }

        self.next_id += 1;
        let pending = PendingEdit {
            id: self.next_id,
            mode,
            prompt: mode.prompt(&original),
            original,
            range,
            revision: doc.revision(),
        };
        log::debug!("AI edit #{} ({:?}) over {:?}", pending.id, mode, range);

        self.state = ToolbarState::AwaitingAi {
            coords,
            pending: pending.clone(),
        };
        Some(pending)
    }

    /// Delivers the answer for request `id`. `None` means the call failed; the
    /// modal then offers the original text back.
    pub fn on_suggestion(&mut self, id: u64, suggestion: Option<String>) {
        let ToolbarState::AwaitingAi { coords, pending } = &self.state else {
            log::debug!("Dropping suggestion #{}: no request in flight", id);
            return;
        };
        if pending.id != id {
            log::debug!("Dropping suggestion #{}: waiting on #{}", id, pending.id);
            return;
        }

        let failed = suggestion.is_none();
        self.state = ToolbarState::ModalOpen {
            coords: *coords,
            original: pending.original.clone(),
            suggestion: suggestion.unwrap_or_else(|| pending.original.clone()),
            range: pending.range,
            revision: pending.revision,
            failed,
        };
    }

    /// Replaces the captured range with the suggestion and closes the modal.
    /// Edits made while the request was in flight shift the range along. A
    /// failed request, or a range that was itself edited meanwhile, just
    /// closes the modal and leaves the document alone.
    pub fn confirm(&mut self, doc: &mut Document) -> bool {
        let ToolbarState::ModalOpen { suggestion, range, revision, failed, .. } = &self.state else {
            return false;
        };

        let target = if *failed { None } else { doc.track_range(*range, *revision) };
        let applied = match target {
            Some(target) => {
                doc.replace_range(target, suggestion);
                true
            }
            None => {
                if !*failed {
                    log::warn!("Selection changed under the AI edit; not applying it");
                }
                false
            }
        };

        self.state = ToolbarState::Hidden;
        applied
    }

    pub fn cancel(&mut self) -> bool {
        if self.is_modal_open() {
            self.state = ToolbarState::Hidden;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(text: &str, from: usize, to: usize) -> Document {
        let mut doc = Document::new(text);
        doc.set_selection(SelectionRange::new(from, to));
        doc
    }

    fn show(toolbar: &mut Toolbar, doc: &Document) {
        toolbar.on_selection_change(doc.selection(), Coords::new(100, 220), Coords::new(300, 200));
    }

    #[test]
    fn test_anchor_is_midpoint_above_top_edge() {
        let anchor = anchor_above(Coords::new(100, 220), Coords::new(300, 200), ANCHOR_OFFSET_PX);
        assert_eq!(anchor, Coords::new(200, 160));
    }

    #[test]
    fn test_selection_toggles_visibility() {
        let mut toolbar = Toolbar::default();
        toolbar.on_selection_change(SelectionRange::new(2, 5), Coords::new(10, 50), Coords::new(30, 50));
        assert_eq!(toolbar.state(), &ToolbarState::Visible { coords: Coords::new(20, 10) });

        toolbar.on_selection_change(SelectionRange::new(4, 4), Coords::new(30, 50), Coords::new(30, 50));
        assert_eq!(toolbar.state(), &ToolbarState::Hidden);
        assert_eq!(toolbar.coords(), None);
    }

    #[test]
    fn test_request_requires_visible_toolbar() {
        let doc = selected("hello world", 0, 5);
        let mut toolbar = Toolbar::default();
        assert!(toolbar.request_edit(EditMode::Improve, &doc).is_none());
    }

    #[test]
    fn test_prompt_wraps_selection() {
        let doc = selected("first\nsecond", 0, 12);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);

        let pending = toolbar.request_edit(EditMode::Shorten, &doc).unwrap();
        assert_eq!(pending.original, "first second");
        assert_eq!(pending.prompt, "Shorten this text but keep the meaning: \"first second\"");
        assert!(toolbar.is_awaiting());
    }

    #[test]
    fn test_confirm_replaces_original_range() {
        let mut doc = selected("The quick brown fox", 4, 9);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);

        let pending = toolbar.request_edit(EditMode::Improve, &doc).unwrap();
        toolbar.on_suggestion(pending.id, Some("speedy".to_string()));
        assert!(toolbar.is_modal_open());

        assert!(toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "The speedy brown fox");
        assert_eq!(toolbar.state(), &ToolbarState::Hidden);
    }

    #[test]
    fn test_cancel_leaves_document_unchanged() {
        let mut doc = selected("The quick brown fox", 4, 9);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);

        let pending = toolbar.request_edit(EditMode::Lengthen, &doc).unwrap();
        toolbar.on_suggestion(pending.id, Some("very very quick".to_string()));
        assert!(toolbar.cancel());

        assert_eq!(doc.text(), "The quick brown fox");
        assert!(!toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "The quick brown fox");
    }

    #[test]
    fn test_stale_response_still_opens_modal() {
        let mut doc = selected("The quick brown fox", 4, 9);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Improve, &doc).unwrap();

        // Selection moves while the request is in flight
        doc.set_selection(SelectionRange::new(10, 15));
        toolbar.on_selection_change(doc.selection(), Coords::new(0, 100), Coords::new(50, 100));
        assert!(toolbar.is_awaiting());
        assert_eq!(toolbar.coords(), Some(Coords::new(25, 60)));

        toolbar.on_suggestion(pending.id, Some("slow".to_string()));
        toolbar.confirm(&mut doc);
        assert_eq!(doc.text(), "The slow brown fox");
    }

    #[test]
    fn test_failure_offers_original_back() {
        let mut doc = selected("keep me", 0, 4);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Table, &doc).unwrap();

        toolbar.on_suggestion(pending.id, None);
        match toolbar.state() {
            ToolbarState::ModalOpen { suggestion, failed, .. } => {
                assert_eq!(suggestion, "keep");
                assert!(*failed);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(!toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "keep me");
        assert_eq!(toolbar.state(), &ToolbarState::Hidden);
    }

    #[test]
    fn test_failed_edit_across_paragraphs_keeps_breaks() {
        let mut doc = selected("first\nsecond", 0, 12);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Improve, &doc).unwrap();

        toolbar.on_suggestion(pending.id, None);
        assert!(!toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "first\nsecond");
        assert!(!toolbar.is_visible());
    }

    #[test]
    fn test_typing_before_selection_while_awaiting() {
        let mut doc = selected("The quick brown fox", 4, 9);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Improve, &doc).unwrap();

        doc.set_selection(SelectionRange::new(0, 0));
        doc.insert_content("XX");
        toolbar.on_suggestion(pending.id, Some("slow".to_string()));

        assert!(toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "XXThe slow brown fox");
    }

    #[test]
    fn test_editing_inside_selection_while_awaiting_drops_suggestion() {
        let mut doc = selected("The quick brown fox", 4, 9);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Shorten, &doc).unwrap();

        doc.set_selection(SelectionRange::new(5, 7));
        doc.backspace();
        toolbar.on_suggestion(pending.id, Some("fast".to_string()));

        assert!(!toolbar.confirm(&mut doc));
        assert_eq!(doc.text(), "The qck brown fox");
        assert_eq!(toolbar.state(), &ToolbarState::Hidden);
    }

    #[test]
    fn test_mismatched_suggestion_is_dropped() {
        let doc = selected("abc", 0, 3);
        let mut toolbar = Toolbar::default();
        show(&mut toolbar, &doc);
        let pending = toolbar.request_edit(EditMode::Improve, &doc).unwrap();

        toolbar.on_suggestion(pending.id + 1, Some("nope".to_string()));
        assert!(toolbar.is_awaiting());
    }

    #[test]
    fn test_edit_mode_prompts() {
        assert_eq!(EditMode::Improve.prompt("x"), "Please improve this text: \"x\"");
        assert_eq!(EditMode::Lengthen.prompt("x"), "Expand and elaborate on this text: \"x\"");
        assert_eq!(
            EditMode::Table.prompt("x"),
            "Convert this text into a simple markdown table: \"x\""
        );
        assert_eq!(EditMode::all().len(), 4);
    }
}
