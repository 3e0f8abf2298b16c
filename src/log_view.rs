use crate::constants::MAX_LOG_ENTRIES;
use chrono::Local;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::collections::VecDeque;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

const BULLET: &str = "• ";

/// Activity panel shown next to the conversation.
#[derive(Debug, Default)]
pub struct LogView {
    pub entries: VecDeque<String>,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: impl Into<String>) {
        let stamped = format!("{} {}", Local::now().format("%H:%M:%S"), entry.into());
        self.entries.push_back(stamped);
        while self.entries.len() > MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// Renders the newest entries that fit, pinned to the bottom. Entries
    /// are wrapped up front so the scroll offset counts screen rows.
    pub fn render(&self, f: &mut Frame, area: Rect) {
        let text_width = (area.width as usize).saturating_sub(BULLET.width()).max(1);
        let mut log_lines = Vec::new();
        for entry in &self.entries {
            for (i, row) in wrap(entry, text_width).into_iter().enumerate() {
                let lead = if i == 0 { BULLET } else { "  " };
                log_lines.push(Line::from(vec![
                    Span::styled(lead, Style::default().fg(Color::DarkGray)),
                    Span::raw(row.into_owned()),
                ]));
            }
        }

        let total = u16::try_from(log_lines.len()).unwrap_or(u16::MAX);
        let scroll = total.saturating_sub(area.height);

        let logs_para = Paragraph::new(log_lines)
            .style(Style::default().fg(Color::DarkGray))
            .scroll((scroll, 0));
        f.render_widget(logs_para, area);
    }
}
