use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    Disconnected { reason: String },
    Offline,
}

impl ConnectionStatus {
    fn label(&self) -> String {
        match self {
            ConnectionStatus::Connecting => "connecting…".to_string(),
            ConnectionStatus::Connected => "connected".to_string(),
            ConnectionStatus::Reconnecting { attempt, delay } => format!(
                "connection lost, retry #{} in {:.1}s",
                attempt,
                delay.as_secs_f32()
            ),
            ConnectionStatus::Disconnected { reason } => format!("disconnected: {}", reason),
            ConnectionStatus::Offline => "offline, restart to reconnect".to_string(),
        }
    }

    fn color(&self) -> Color {
        match self {
            ConnectionStatus::Connected => Color::Green,
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting { .. } => Color::Yellow,
            ConnectionStatus::Disconnected { .. } | ConnectionStatus::Offline => Color::Red,
        }
    }
}

#[derive(Debug)]
pub struct StatusIndicator {
    connection: ConnectionStatus,
    typing: bool,
    notice: Option<String>,
    spinner_idx: usize,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self {
            connection: ConnectionStatus::Connecting,
            typing: false,
            notice: None,
            spinner_idx: 0,
        }
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    /// One-off message, e.g. a failed send. Cleared by the next send.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn update_spinner(&mut self) {
        self.spinner_idx = self.spinner_idx.wrapping_add(1);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let spinner_frames = ["◐", "◓", "◑", "◒"];
        let spinner = if self.typing {
            spinner_frames[self.spinner_idx % spinner_frames.len()]
        } else {
            " "
        };

        let mut spans = vec![
            Span::styled("● ", Style::default().fg(self.connection.color())),
            Span::styled(
                self.connection.label(),
                Style::default().fg(self.connection.color()),
            ),
        ];
        if self.typing {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(spinner, Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                " bot is typing",
                Style::default().fg(Color::DarkGray),
            ));
        }
        if let Some(notice) = &self.notice {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                notice.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }

        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(ratatui::layout::Alignment::Left),
            Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(1),
                width: area.width,
                height: 1.min(area.height),
            },
        );
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_surface_connection_loss() {
        let status = ConnectionStatus::Reconnecting {
            attempt: 2,
            delay: Duration::from_millis(1500),
        };
        assert_eq!(status.label(), "connection lost, retry #2 in 1.5s");
        assert_eq!(status.color(), Color::Yellow);
        assert_eq!(ConnectionStatus::Offline.color(), Color::Red);
    }

    #[test]
    fn test_notice_lifecycle() {
        let mut status = StatusIndicator::new();
        assert_eq!(status.connection(), &ConnectionStatus::Connecting);
        status.set_notice("send failed");
        assert_eq!(status.notice(), Some("send failed"));
        status.clear_notice();
        assert_eq!(status.notice(), None);
    }
}
