use crate::models::{ChatMessage, MessageStatus, Role};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use textwrap::wrap;

const CARET: &str = "▌";

/// Renders one conversation entry as a boxed block of lines.
///
/// `content` is what should be visible right now, which for the entry
/// being typed is only a prefix of the reply. `typing` adds a caret after it.
pub fn render_message(
    message: &ChatMessage,
    content: &str,
    typing: bool,
    width: u16,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let style = base_style(message);
    let indent = indent(message.role);

    render_header(&mut lines, message, style, indent);
    render_content(&mut lines, content, width, style, indent);
    if typing {
        match lines.last_mut() {
            Some(last) if !content.is_empty() => {
                last.spans.push(Span::styled(CARET, Style::default().fg(Color::Gray)));
            }
            _ => lines.push(Line::from(vec![
                Span::styled(indent, style),
                Span::styled("│ ", style),
                Span::styled(CARET, Style::default().fg(Color::Gray)),
            ])),
        }
    }
    lines.push(Line::from(vec![
        Span::styled(indent, style),
        Span::styled("╰─", style),
    ]));

    lines
}

fn indent(role: Role) -> &'static str {
    match role {
        Role::User => "  ",
        Role::Bot => "",
    }
}

fn base_style(message: &ChatMessage) -> Style {
    let style = Style::default().fg(match message.role {
        Role::User => Color::Rgb(255, 223, 128),
        Role::Bot => Color::Rgb(144, 238, 144),
    });

    match message.status {
        MessageStatus::Failed => style.fg(Color::Red).add_modifier(Modifier::DIM),
        MessageStatus::Sent => style,
    }
}

fn render_header(lines: &mut Vec<Line<'static>>, message: &ChatMessage, style: Style, indent: &'static str) {
    let timestamp = message.timestamp.format("%H:%M").to_string();
    let mut spans = vec![
        Span::styled(indent, style),
        Span::styled("┌─", style),
        Span::styled(format!("{} ", message.role.label()), style.add_modifier(Modifier::BOLD)),
        Span::styled(timestamp, style.add_modifier(Modifier::DIM)),
    ];
    if message.status == MessageStatus::Failed {
        spans.push(Span::styled(" ✗ not sent", style));
    }
    lines.push(Line::from(spans));
}

fn render_content(
    lines: &mut Vec<Line<'static>>,
    content: &str,
    width: u16,
    style: Style,
    indent: &'static str,
) {
    let mut in_code_block = false;
    let mut code_buffer = String::new();
    let mut text_buffer = String::new();

    for line in content.lines() {
        if line.trim().starts_with("```") {
            flush_text_buffer(lines, &text_buffer, width, style, indent);
            flush_code_buffer(lines, &code_buffer, style, indent);
            text_buffer.clear();
            code_buffer.clear();
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            code_buffer.push_str(line);
            code_buffer.push('\n');
        } else {
            text_buffer.push_str(line);
            text_buffer.push('\n');
        }
    }

    flush_text_buffer(lines, &text_buffer, width, style, indent);
    flush_code_buffer(lines, &code_buffer, style, indent);
}

fn flush_text_buffer(
    lines: &mut Vec<Line<'static>>,
    buffer: &str,
    width: u16,
    style: Style,
    indent: &'static str,
) {
    if buffer.is_empty() {
        return;
    }

    let wrap_width = (width as usize).saturating_sub(indent.len() + 3).max(1);
    for paragraph in buffer.lines() {
        let wrapped = wrap(paragraph, wrap_width);
        if wrapped.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(indent, style),
                Span::styled("│ ", style),
            ]));
        }
        for wrapped_line in wrapped {
            lines.push(Line::from(vec![
                Span::styled(indent, style),
                Span::styled("│ ", style),
                Span::styled(wrapped_line.into_owned(), style),
            ]));
        }
    }
}

fn flush_code_buffer(lines: &mut Vec<Line<'static>>, buffer: &str, style: Style, indent: &'static str) {
    if buffer.is_empty() {
        return;
    }

    let code_style = Style::default()
        .fg(Color::Rgb(209, 154, 102))
        .add_modifier(Modifier::BOLD);

    for code_line in buffer.lines() {
        lines.push(Line::from(vec![
            Span::styled(indent, style),
            Span::styled("│ ", style),
            Span::styled("▎", Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {}", code_line), code_style),
        ]));
    }
}
