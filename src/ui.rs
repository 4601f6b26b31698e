use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, FocusPane};
use crate::chat::{MessageKind, Sender};
use crate::document::VisualLine;
use crate::toolbar::{EditMode, ToolbarState};

const CHAT_PANEL_WIDTH: u16 = 40;

/// Render `**bold**` runs in an AI reply. An unclosed `**` stays literal.
fn styled_reply_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    // An odd number of parts means every marker found its partner
    let balanced = parts.len() % 2 == 1;

    let mut spans = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if !balanced && i == parts.len() - 1 {
            spans.push(Span::raw(format!("**{}", part)));
        } else if part.is_empty() {
            continue;
        } else if i % 2 == 1 {
            spans.push(Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD)));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [editor_area, chat_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(CHAT_PANEL_WIDTH.min(body_area.width / 2)),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_editor(app, frame, editor_area);
    render_chat(app, frame, chat_area);
    render_footer(app, frame, footer_area);

    app.toolbar_buttons.clear();
    if app.toolbar.is_modal_open() {
        render_suggestion_modal(app, frame, area);
    } else if app.toolbar.is_visible() {
        render_toolbar(app, frame, editor_area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" draftpad ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(app.api.base_url().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.toolbar.is_modal_open() {
        (" REVIEW ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else {
        match app.focus {
            FocusPane::Editor => (" EDIT ", Style::default().bg(Color::Blue).fg(Color::White)),
            FocusPane::Chat => (" CHAT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        }
    };

    let pairs: &[(&str, &str)] = if app.toolbar.is_modal_open() {
        &[(" Enter ", " accept "), (" Esc ", " discard ")]
    } else {
        match app.focus {
            FocusPane::Editor if app.toolbar.is_visible() => &[
                (" Alt+1-4 ", " AI edit "),
                (" Esc ", " deselect "),
                (" Tab ", " chat "),
                (" ^Q ", " quit "),
            ],
            FocusPane::Editor => &[
                (" Shift+arrows ", " select "),
                (" ^A ", " all "),
                (" ^P ", " paste reply "),
                (" Tab ", " chat "),
                (" ^Q ", " quit "),
            ],
            FocusPane::Chat => &[
                (" Enter ", " send "),
                (" Up/Down ", " scroll "),
                (" Esc ", " editor "),
                (" ^Q ", " quit "),
            ],
        }
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Splits one wrapped row into plain and highlighted spans.
fn editor_row(line: &VisualLine, from: usize, to: usize) -> Line<'static> {
    if from >= to || to <= line.start || from >= line.end {
        return Line::from(line.text.clone());
    }

    let selected = Style::default().add_modifier(Modifier::REVERSED);
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_selected = false;

    for (i, c) in line.text.chars().enumerate() {
        let pos = line.start + i;
        let in_selection = pos >= from && pos < to;
        if in_selection != run_selected && !run.is_empty() {
            let text = std::mem::take(&mut run);
            spans.push(if run_selected { Span::styled(text, selected) } else { Span::raw(text) });
        }
        run_selected = in_selection;
        run.push(c);
    }
    if !run.is_empty() {
        spans.push(if run_selected { Span::styled(run, selected) } else { Span::raw(run) });
    }

    Line::from(spans)
}

fn render_editor(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Editor;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Document ");

    let inner = block.inner(area);
    let width_changed = app.editor_area.map(|r| r.width) != Some(inner.width);
    app.editor_area = Some(inner);
    if width_changed {
        // Wrapping moved, so the toolbar anchor did too
        app.after_editor_change();
    }

    let selection = app.document.selection();
    let rows = app.document.visual_lines(inner.width);
    let total_rows = rows.len() as u16;

    let lines: Vec<Line> = rows
        .iter()
        .skip(app.editor_scroll as usize)
        .take(inner.height as usize)
        .map(|row| editor_row(row, selection.from, selection.to))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if total_rows > inner.height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));
        let mut scrollbar_state = ScrollbarState::new(total_rows as usize)
            .position(app.editor_scroll as usize);
        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }

    if focused && !app.toolbar.is_modal_open() {
        let cursor = app.screen_coords(app.document.cursor());
        let visible = cursor.x >= inner.x as i32
            && cursor.x < inner.right() as i32
            && cursor.y >= inner.y as i32
            && cursor.y < inner.bottom() as i32;
        if visible {
            frame.set_cursor_position((cursor.x as u16, cursor.y as u16));
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [log_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(area);
    app.chat_height = log_area.height.saturating_sub(2);
    app.chat_width = log_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let log_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" AI Chat ");

    let log_text = if app.chat.messages().is_empty() && app.chat.in_flight() == 0 {
        Text::from(Span::styled(
            "Ask anything. Messages mentioning \"search\" or \"find\" go to web search.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.chat.messages() {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Sender::Ai => {
                    let color = match msg.kind {
                        Some(MessageKind::Chat) => Color::Green,
                        Some(MessageKind::Search) => Color::Yellow,
                        None => Color::Red,
                    };
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.text.lines() {
                        lines.push(styled_reply_line(line).fg(color));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.chat.in_flight() > 0 {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let log = Paragraph::new(log_text)
        .block(log_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat.scroll, 0));
    frame.render_widget(log, log_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }))
        .title(" Message ");

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat.cursor;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if focused && !app.toolbar.is_modal_open() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

/// Places a `width` x `height` box whose bottom-center sits on the anchor,
/// kept inside `bounds`.
fn toolbar_rect(anchor_x: i32, anchor_y: i32, width: u16, height: u16, bounds: Rect) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);

    let max_x = bounds.right() as i32 - width as i32;
    let max_y = bounds.bottom() as i32 - height as i32;
    let x = (anchor_x - width as i32 / 2).clamp(bounds.x as i32, max_x.max(bounds.x as i32));
    let y = (anchor_y - height as i32 + 1).clamp(bounds.y as i32, max_y.max(bounds.y as i32));

    Rect::new(x as u16, y as u16, width, height)
}

fn render_toolbar(app: &mut App, frame: &mut Frame, bounds: Rect) {
    let Some(anchor) = app.toolbar.coords() else {
        return;
    };

    let awaiting = app.toolbar.is_awaiting();
    let labels: Vec<(EditMode, String)> = EditMode::all()
        .into_iter()
        .map(|mode| (mode, format!(" {} ", mode.label())))
        .collect();

    let content_width: u16 = if awaiting {
        12
    } else {
        let buttons: usize = labels.iter().map(|(_, l)| l.width()).sum();
        (buttons + labels.len() - 1) as u16
    };

    let rect = toolbar_rect(anchor.x, anchor.y, content_width + 2, 3, bounds);
    frame.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    if awaiting {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let thinking = Paragraph::new(format!(" Thinking{}", dots))
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
        frame.render_widget(thinking, inner);
        return;
    }

    let button_style = Style::default().fg(Color::White).bg(Color::Magenta);
    let mut x = inner.x;
    for (i, (mode, label)) in labels.iter().enumerate() {
        if i > 0 {
            x = x.saturating_add(1);
        }
        let w = (label.width() as u16).min(inner.right().saturating_sub(x));
        if w == 0 {
            break;
        }
        let button = Rect::new(x, inner.y, w, 1);
        frame.render_widget(Paragraph::new(label.as_str()).style(button_style), button);
        app.toolbar_buttons.push((*mode, button));
        x = x.saturating_add(w);
    }
}

fn render_suggestion_modal(app: &App, frame: &mut Frame, area: Rect) {
    let ToolbarState::ModalOpen { original, suggestion, failed, .. } = app.toolbar.state() else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 18.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if *failed { Color::Red } else { Color::Magenta }))
        .title(" AI Suggestion ")
        .title_bottom(Line::from(" Enter confirm · Esc cancel ").centered());

    let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(Span::styled("Original:", heading))];
    for line in original.lines() {
        lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::DarkGray))));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Suggestion:", heading)));
    for line in suggestion.lines() {
        lines.push(styled_reply_line(line));
    }
    if *failed {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "The AI request failed. Confirming keeps the original text.",
            Style::default().fg(Color::Red),
        )));
    }

    let body = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(body, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::Config;
    use crate::document::{Document, SelectionRange};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(Config::new(), ApiClient::new("http://127.0.0.1:1"), tx)
    }

    fn draw(app: &mut App, width: u16, height: u16) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
    }

    #[test]
    fn test_bold_markers() {
        let line = styled_reply_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let unclosed = styled_reply_line("a **b");
        let text: String = unclosed.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn test_editor_row_highlights_selection() {
        let row = VisualLine { start: 10, end: 15, text: "hello".to_string() };
        let line = editor_row(&row, 11, 13);
        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["h", "el", "lo"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::REVERSED));

        let untouched = editor_row(&row, 0, 5);
        assert_eq!(untouched.spans.len(), 1);
    }

    #[test]
    fn test_toolbar_rect_clamps_to_bounds() {
        let bounds = Rect::new(1, 2, 50, 20);
        assert_eq!(toolbar_rect(25, 10, 20, 3, bounds), Rect::new(15, 8, 20, 3));
        assert_eq!(toolbar_rect(0, 0, 20, 3, bounds), Rect::new(1, 2, 20, 3));
        assert_eq!(toolbar_rect(100, 100, 20, 3, bounds), Rect::new(31, 19, 20, 3));
    }

    #[test]
    fn test_render_records_hit_areas() {
        let mut app = app();
        draw(&mut app, 120, 30);

        let editor = app.editor_area.unwrap();
        assert_eq!(editor.x, 1);
        assert_eq!(editor.y, 2);
        assert!(app.chat_area.is_some());
        assert!(app.toolbar_buttons.is_empty());
    }

    #[test]
    fn test_toolbar_buttons_follow_selection() {
        let mut app = app();
        draw(&mut app, 120, 30);

        app.document = Document::new("one\ntwo\nthree four five");
        app.document.set_selection(SelectionRange::new(8, 13));
        app.after_editor_change();
        draw(&mut app, 120, 30);

        let modes: Vec<EditMode> = app.toolbar_buttons.iter().map(|(m, _)| *m).collect();
        assert_eq!(modes, EditMode::all().to_vec());
        // Selection starts on screen row 4; the toolbar sits just above it
        let row = app.toolbar_buttons[0].1.y;
        assert!(row < 4);

        app.document.clear_selection();
        app.after_editor_change();
        draw(&mut app, 120, 30);
        assert!(app.toolbar_buttons.is_empty());
    }
}
