use crate::app::App;
use crate::chat_message::render_message;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn draw_chat(f: &mut Frame<'_>, area: Rect, app: &mut App) {
    // Split chat area into messages, status line and input
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(1),    // Messages
                Constraint::Length(1), // Status
                Constraint::Length(3), // Input
            ]
            .as_ref(),
        )
        .split(area);

    draw_messages(f, chunks[0], app);
    app.status.render(f, chunks[1]);
    draw_input(f, chunks[2], app);
}

fn draw_messages(f: &mut Frame<'_>, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Chat ")
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = Vec::new();
    for (idx, message) in app.session.messages().iter().enumerate() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.extend(render_message(
            message,
            app.session.visible_content(idx),
            app.session.is_in_progress(idx),
            inner.width,
        ));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No messages yet. Type below and press Enter.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    // Stick to the newest message unless the user has scrolled away from it.
    let total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_scroll = total_lines.saturating_sub(inner.height);
    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    f.render_widget(Paragraph::new(lines).scroll((app.chat_scroll, 0)), inner);
}

fn draw_input(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Message ")
        .border_style(Style::default().fg(Color::LightYellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text_width = u16::try_from(app.input.width()).unwrap_or(u16::MAX);
    let visible_width = inner.width.saturating_sub(1);
    let scroll_offset = text_width.saturating_sub(visible_width);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::White))
        .scroll((0, scroll_offset));
    f.render_widget(input, inner);

    let cursor_x = inner.x + text_width - scroll_offset;
    f.set_cursor_position((cursor_x, inner.y));
}
