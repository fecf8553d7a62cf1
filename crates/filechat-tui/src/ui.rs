use filechat_core::{Attachment, Role, Turn};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::markdown::render_markdown;

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Cyan),
        Role::Assistant => Style::default().fg(Color::Yellow),
    }
}

/// Lines for the whole conversation.
///
/// Pure function of the turns: shows a placeholder when there is nothing to
/// show, and a transient processing indicator after the last turn while a
/// request is in flight.
pub fn transcript_lines(
    turns: &[Turn],
    in_flight: bool,
    animation_frame: u8,
    width: usize,
) -> Vec<Line<'static>> {
    if turns.is_empty() && !in_flight {
        return vec![Line::from(Span::styled(
            "No messages yet",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for turn in turns {
        let style = role_style(turn.role);
        lines.push(Line::from(Span::styled(
            turn.role.label(),
            style.add_modifier(Modifier::BOLD),
        )));
        lines.extend(render_markdown(&turn.content, width, Style::default()));
        lines.push(Line::default());
    }

    if in_flight {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(animation_frame as usize % 3 + 1);
        lines.push(Line::from(Span::styled(
            format!("Processing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// The chat pane's wrapping, shared with the scroll limit calculation
pub fn chat_paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn attachment_line(file: Option<&Attachment>) -> Line<'static> {
    match file {
        Some(file) => Line::from(vec![
            Span::raw(" \u{1f4ce} "),
            Span::styled(file.name().to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!(" ({}, {})", file.mime(), format_size(file.len())),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled("  x: remove", Style::default().fg(Color::Red)),
        ]),
        None => Line::from(Span::styled(
            " a: Upload CSV or image",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, attach_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    frame.render_widget(
        Paragraph::new(attachment_line(app.controller.composer().file())),
        attach_area,
    );
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let header = Line::from(vec![
        Span::styled(
            " AI Chatbot ",
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", app.endpoint), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store inner size (minus borders) for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let lines = transcript_lines(
        app.controller.transcript().turns(),
        app.controller.in_flight(),
        app.animation_frame,
        app.chat_width as usize,
    );

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let chat = chat_paragraph(lines)
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, text, cursor_pos, active) = match app.input_mode {
        InputMode::Attaching => (
            " Attach CSV or image: path (Enter to attach, Esc to cancel) ",
            app.path_input.as_str(),
            app.path_input.chars().count(),
            true,
        ),
        InputMode::Editing => (
            if app.controller.in_flight() {
                " Message (Processing...) "
            } else {
                " Message (Enter to send, Esc to stop editing) "
            },
            app.draft(),
            app.cursor,
            true,
        ),
        InputMode::Normal => (" Message (i to type) ", app.draft(), app.cursor, false),
    };

    let border_color = if active { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if active {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(err) = app.controller.last_error() {
        Line::from(Span::styled(
            format!(" {}  (e: dismiss)", err),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(format!(" {}", notice), Style::default().fg(Color::Yellow)))
    } else {
        let hints = match app.input_mode {
            InputMode::Normal => " i: type  a: attach  x: remove file  j/k: scroll  q: quit",
            InputMode::Editing => " Enter: send  Esc: done  Ctrl-C: quit",
            InputMode::Attaching => " Enter: attach  Esc: cancel",
        };
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
    };
    frame.render_widget(Paragraph::new(line), area);
}
