use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane};
use crate::document::{char_to_byte_index, SelectionRange};
use crate::toolbar::EditMode;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.sync_toolbar(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Chat(outcome) => app.on_chat_outcome(outcome),
        AppEvent::Suggestion { id, text } => app.on_suggestion(id, text),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.should_quit = true;
        return;
    }

    // The suggestion modal swallows everything else
    if app.toolbar.is_modal_open() {
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => app.confirm_suggestion(),
            KeyCode::Esc | KeyCode::Char('n') => app.cancel_suggestion(),
            _ => {}
        }
        return;
    }

    if key.code == KeyCode::Tab {
        app.focus = match app.focus {
            FocusPane::Editor => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Editor,
        };
        return;
    }

    match app.focus {
        FocusPane::Editor => handle_editor_key(app, key),
        FocusPane::Chat => handle_chat_key(app, key),
    }
}

/// Alt+key shortcuts for the toolbar buttons.
fn toolbar_shortcut(key: &KeyEvent) -> Option<EditMode> {
    if !key.modifiers.contains(KeyModifiers::ALT) {
        return None;
    }
    match key.code {
        KeyCode::Char('1') | KeyCode::Char('e') => Some(EditMode::Improve),
        KeyCode::Char('2') | KeyCode::Char('s') => Some(EditMode::Shorten),
        KeyCode::Char('3') | KeyCode::Char('l') => Some(EditMode::Lengthen),
        KeyCode::Char('4') | KeyCode::Char('t') => Some(EditMode::Table),
        _ => None,
    }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
    if let Some(mode) = toolbar_shortcut(&key) {
        app.request_ai_edit(mode);
        return;
    }

    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('p') {
        app.insert_last_reply();
        return;
    }

    let width = app.editor_width();
    let doc = &mut app.document;
    match key.code {
        KeyCode::Char('a') if ctrl => doc.select_all(),
        KeyCode::Left => doc.move_left(shift),
        KeyCode::Right => doc.move_right(shift),
        KeyCode::Up => doc.move_up(shift, width),
        KeyCode::Down => doc.move_down(shift, width),
        KeyCode::Home => doc.move_home(shift),
        KeyCode::End => doc.move_end(shift),
        KeyCode::Backspace => doc.backspace(),
        KeyCode::Delete => doc.delete(),
        KeyCode::Enter => doc.insert_char('\n'),
        KeyCode::Esc => doc.clear_selection(),
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => doc.insert_char(c),
        _ => return,
    }

    app.after_editor_change();
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.focus = FocusPane::Editor;
            return;
        }
        KeyCode::Enter => {
            app.send_chat();
            return;
        }
        _ => {}
    }

    let chat = &mut app.chat;
    match key.code {
        KeyCode::Backspace => {
            if chat.cursor > 0 {
                chat.cursor -= 1;
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if chat.cursor < chat.input.chars().count() {
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Left => chat.cursor = chat.cursor.saturating_sub(1),
        KeyCode::Right => {
            let char_count = chat.input.chars().count();
            chat.cursor = (chat.cursor + 1).min(char_count);
        }
        KeyCode::Home => chat.cursor = 0,
        KeyCode::End => chat.cursor = chat.input.chars().count(),
        KeyCode::Up | KeyCode::PageUp => chat.scroll = chat.scroll.saturating_sub(3),
        KeyCode::Down | KeyCode::PageDown => chat.scroll = chat.scroll.saturating_add(3),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
            chat.input.insert(byte_pos, c);
            chat.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_editor = app.editor_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.toolbar.is_modal_open() {
                return;
            }
            let button = app
                .toolbar_buttons
                .iter()
                .find(|(_, rect)| point_in_rect(x, y, *rect))
                .map(|(mode, _)| *mode);
            if let Some(mode) = button {
                app.request_ai_edit(mode);
            } else if in_editor {
                app.focus = FocusPane::Editor;
                let pos = app.pos_at_screen(x, y);
                app.drag_anchor = Some(pos);
                app.document.set_selection(SelectionRange::new(pos, pos));
                app.after_editor_change();
            } else if in_chat {
                app.focus = FocusPane::Chat;
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(anchor) = app.drag_anchor {
                let pos = app.pos_at_screen(x, y);
                app.document.set_selection(SelectionRange::new(anchor, pos));
                app.after_editor_change();
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.drag_anchor = None,
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat.scroll = app.chat.scroll.saturating_add(3);
            } else if in_editor {
                app.scroll_editor(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat.scroll = app.chat.scroll.saturating_sub(3);
            } else if in_editor {
                app.scroll_editor(-3);
            }
        }
        _ => {}
    }
}
