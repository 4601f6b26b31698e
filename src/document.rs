//! Flat text model behind the editing surface.
//!
//! Positions are char offsets into the document. Paragraphs are separated by
//! `\n`. Visual layout hard-wraps each paragraph at a column width measured in
//! terminal display cells.

use unicode_width::UnicodeWidthChar;

pub const INITIAL_CONTENT: &str = "Start writing here...";

/// Convert a character index to a byte index for UTF-8 safe string operations
pub(crate) fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

impl SelectionRange {
    /// Builds a range from two endpoints in either order.
    pub fn new(a: usize, b: usize) -> Self {
        Self { from: a.min(b), to: a.max(b) }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
}

impl Coords {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One wrapped row of a paragraph. `end` is exclusive and never covers the
/// paragraph's trailing `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// One `replace_range` call: `removed` chars at `from` became `inserted` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Change {
    from: usize,
    removed: usize,
    inserted: usize,
}

#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    cursor: usize,
    anchor: Option<usize>,
    changes: Vec<Change>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(INITIAL_CONTENT)
    }
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
            anchor: None,
            changes: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Counts edits so far. Pair with [`Document::track_range`].
    pub fn revision(&self) -> usize {
        self.changes.len()
    }

    /// Follows `range` through every edit made after `since`. Edits before
    /// the range shift it, edits after it leave it alone. Returns `None` once
    /// an edit has touched the range itself.
    pub fn track_range(&self, range: SelectionRange, since: usize) -> Option<SelectionRange> {
        let mut range = range;
        for change in self.changes.iter().skip(since) {
            let change_end = change.from + change.removed;
            if change_end <= range.from {
                range.from = range.from - change.removed + change.inserted;
                range.to = range.to - change.removed + change.inserted;
            } else if change.from >= range.to {
                continue;
            } else {
                return None;
            }
        }
        Some(range)
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text.chars().nth(pos)
    }

    // Selection

    pub fn selection(&self) -> SelectionRange {
        match self.anchor {
            Some(anchor) => SelectionRange::new(anchor, self.cursor),
            None => SelectionRange::new(self.cursor, self.cursor),
        }
    }

    pub fn set_selection(&mut self, range: SelectionRange) {
        let len = self.len_chars();
        let from = range.from.min(len);
        let to = range.to.min(len);
        self.anchor = if from == to { None } else { Some(from) };
        self.cursor = to;
    }

    pub fn select_all(&mut self) {
        self.set_selection(SelectionRange::new(0, self.len_chars()));
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// Text in `range`, with `block_separator` standing in for paragraph breaks.
    pub fn text_between(&self, range: SelectionRange, block_separator: &str) -> String {
        self
            .text
            .chars()
            .skip(range.from)
            .take(range.to.saturating_sub(range.from))
            .map(|c| if c == '\n' { block_separator.to_string() } else { c.to_string() })
            .collect()
    }

    pub fn selected_text(&self) -> String {
        self.text_between(self.selection(), " ")
    }

    // Editing

    /// Replaces `range` (clamped to the document) with `content`, leaving the
    /// cursor after the inserted text.
    pub fn replace_range(&mut self, range: SelectionRange, content: &str) {
        let len = self.len_chars();
        let from = range.from.min(len);
        let to = range.to.min(len).max(from);

        let start = char_to_byte_index(&self.text, from);
        let end = char_to_byte_index(&self.text, to);
        self.text.replace_range(start..end, content);

        let inserted = content.chars().count();
        self.changes.push(Change { from, removed: to - from, inserted });
        self.cursor = from + inserted;
        self.anchor = None;
    }

    /// Inserts at the cursor, replacing any selection.
    pub fn insert_content(&mut self, content: &str) {
        self.replace_range(self.selection(), content);
    }

    /// Inserts `content` as a paragraph of its own at the cursor.
    pub fn insert_paragraph(&mut self, content: &str) {
        let range = self.selection();
        let mut block = String::new();
        if range.from > 0 && self.char_at(range.from - 1) != Some('\n') {
            block.push('\n');
        }
        block.push_str(content);
        if range.to < self.len_chars() && self.char_at(range.to) != Some('\n') {
            block.push('\n');
        }
        self.replace_range(range, &block);
    }

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_content(c.encode_utf8(&mut buf));
    }

    pub fn backspace(&mut self) {
        let range = self.selection();
        if !range.is_empty() {
            self.replace_range(range, "");
        } else if self.cursor > 0 {
            self.replace_range(SelectionRange::new(self.cursor - 1, self.cursor), "");
        }
    }

    pub fn delete(&mut self) {
        let range = self.selection();
        if !range.is_empty() {
            self.replace_range(range, "");
        } else if self.cursor < self.len_chars() {
            self.replace_range(SelectionRange::new(self.cursor, self.cursor + 1), "");
        }
    }

    // Cursor movement

    fn move_to(&mut self, pos: usize, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
        self.cursor = pos.min(self.len_chars());
        if self.anchor == Some(self.cursor) {
            self.anchor = None;
        }
    }

    pub fn move_left(&mut self, extend: bool) {
        let range = self.selection();
        if !extend && !range.is_empty() {
            self.move_to(range.from, false);
        } else {
            self.move_to(self.cursor.saturating_sub(1), extend);
        }
    }

    pub fn move_right(&mut self, extend: bool) {
        let range = self.selection();
        if !extend && !range.is_empty() {
            self.move_to(range.to, false);
        } else {
            self.move_to(self.cursor + 1, extend);
        }
    }

    pub fn move_home(&mut self, extend: bool) {
        let line_start = self
            .text
            .chars()
            .take(self.cursor)
            .collect::<Vec<_>>()
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.move_to(line_start, extend);
    }

    pub fn move_end(&mut self, extend: bool) {
        let line_end = self
            .text
            .chars()
            .skip(self.cursor)
            .position(|c| c == '\n')
            .map(|i| self.cursor + i)
            .unwrap_or_else(|| self.len_chars());
        self.move_to(line_end, extend);
    }

    pub fn move_up(&mut self, extend: bool, width: u16) {
        let here = self.coords_at_pos(self.cursor, width);
        if here.y == 0 {
            self.move_to(0, extend);
        } else {
            let target = self.pos_at_coords(Coords::new(here.x, here.y - 1), width);
            self.move_to(target, extend);
        }
    }

    pub fn move_down(&mut self, extend: bool, width: u16) {
        let here = self.coords_at_pos(self.cursor, width);
        let rows = self.visual_lines(width).len() as i32;
        if here.y + 1 >= rows {
            self.move_to(self.len_chars(), extend);
        } else {
            let target = self.pos_at_coords(Coords::new(here.x, here.y + 1), width);
            self.move_to(target, extend);
        }
    }

    // Layout

    pub fn visual_lines(&self, width: u16) -> Vec<VisualLine> {
        let width = width.max(1) as usize;
        let mut lines = Vec::new();
        let mut pos = 0;

        for paragraph in self.text.split('\n') {
            let mut row_start = pos;
            let mut row_text = String::new();
            let mut row_width = 0;

            for c in paragraph.chars() {
                let w = c.width().unwrap_or(0);
                if row_width + w > width && !row_text.is_empty() {
                    lines.push(VisualLine {
                        start: row_start,
                        end: pos,
                        text: std::mem::take(&mut row_text),
                    });
                    row_start = pos;
                    row_width = 0;
                }
                row_text.push(c);
                row_width += w;
                pos += 1;
            }

            lines.push(VisualLine { start: row_start, end: pos, text: row_text });
            pos += 1; // paragraph break
        }

        lines
    }

    /// Visual `(column, row)` of a position after wrapping at `width`.
    pub fn coords_at_pos(&self, pos: usize, width: u16) -> Coords {
        let pos = pos.min(self.len_chars());
        let lines = self.visual_lines(width);
        let row = lines.iter().rposition(|l| l.start <= pos).unwrap_or(0);
        let line = &lines[row];
        let col: usize = line
            .text
            .chars()
            .take(pos - line.start)
            .map(|c| c.width().unwrap_or(0))
            .sum();
        Coords::new(col as i32, row as i32)
    }

    /// Inverse of [`Document::coords_at_pos`], clamping out-of-range coordinates.
    pub fn pos_at_coords(&self, coords: Coords, width: u16) -> usize {
        let lines = self.visual_lines(width);
        let row = coords.y.clamp(0, lines.len() as i32 - 1) as usize;
        let line = &lines[row];
        // A wrapped row's end is the next row's start; stop one short of it.
        let wrapped = lines.get(row + 1).is_some_and(|next| next.start == line.end);
        let max = if wrapped { line.end.saturating_sub(1).max(line.start) } else { line.end };

        let mut col = 0i32;
        let mut pos = line.start;
        for c in line.text.chars() {
            let w = c.width().unwrap_or(0) as i32;
            if col + w > coords.x {
                break;
            }
            col += w;
            pos += 1;
        }
        pos.min(max)
    }
}
