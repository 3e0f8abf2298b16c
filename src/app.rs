use crate::chat::{ChatSession, RevealProgress};
use crate::config::Config;
use crate::events::AppEvent;
use crate::log_view::LogView;
use crate::models::MessageStatus;
use crate::socket::{BotReply, Outbound, TransportEvent};
use crate::status_indicator::{ConnectionStatus, StatusIndicator};
use crate::typewriter::RevealTimer;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Chat,
    QuitConfirm,
    Quit,
}

/// All UI state. Only ever touched from the UI task.
pub struct App {
    pub state: AppState,
    pub session: ChatSession,
    pub input: String,
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub status: StatusIndicator,
    pub logs: LogView,
    reveal: RevealTimer,
    reveal_period: Duration,
    outbound: Box<dyn Outbound>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &Config,
        outbound: Box<dyn Outbound>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> App {
        App {
            state: AppState::Chat,
            session: ChatSession::new(),
            input: String::new(),
            chat_scroll: 0,
            follow_tail: true,
            status: StatusIndicator::new(),
            logs: LogView::new(),
            reveal: RevealTimer::new(),
            reveal_period: Duration::from_millis(config.typing_speed_ms),
            outbound,
            events,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.state == AppState::Quit
    }

    /// Sends the input field to the backend.
    ///
    /// Whitespace-only input is ignored. The trimmed text is transmitted
    /// while the entry keeps the text exactly as typed. Sends made while
    /// still connecting are queued by the client. A refused send still
    /// records the entry, marked as not sent.
    pub fn send_message(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.input);

        let status = match self.outbound.send_message(content.trim()) {
            Ok(()) => {
                self.status.clear_notice();
                MessageStatus::Sent
            }
            Err(e) => {
                warn!("failed to send message: {}", e);
                self.status.set_notice(format!("Not sent: {}", e));
                self.logs.add(format!("Send failed: {}", e));
                MessageStatus::Failed
            }
        };

        self.session.push_user(content, status);
        self.follow_tail = true;
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => {
                self.status.set_connection(ConnectionStatus::Connecting);
                self.logs.add("Connecting to server...");
            }
            TransportEvent::Connected { sid } => {
                self.status.set_connection(ConnectionStatus::Connected);
                self.status.clear_notice();
                match sid {
                    Some(sid) => self.logs.add(format!("Connected (session {})", sid)),
                    None => self.logs.add("Connected"),
                }
            }
            TransportEvent::BotResponse(reply) => self.receive_bot_reply(reply),
            TransportEvent::Disconnected { reason } => {
                self.logs.add(format!("Connection lost: {}", reason));
                self.status
                    .set_connection(ConnectionStatus::Disconnected { reason });
            }
            TransportEvent::Reconnecting { attempt, delay } => {
                self.logs.add(format!(
                    "Reconnecting in {}ms (attempt {})",
                    delay.as_millis(),
                    attempt
                ));
                self.status
                    .set_connection(ConnectionStatus::Reconnecting { attempt, delay });
            }
            TransportEvent::GaveUp {
                attempts,
                undelivered,
            } => {
                self.logs
                    .add(format!("Gave up reconnecting after {} attempts", attempts));
                if undelivered > 0 {
                    warn!("{} queued messages were never delivered", undelivered);
                    self.status
                        .set_notice(format!("{} message(s) never delivered", undelivered));
                }
                self.status.set_connection(ConnectionStatus::Offline);
            }
        }
    }

    fn receive_bot_reply(&mut self, reply: BotReply) {
        info!("bot reply received ({} chars)", reply.text.chars().count());
        if let Some(aux) = &reply.aux {
            debug!("bot reply auxiliary value: {}", aux);
            self.logs.add(format!("Reply carried: {}", aux));
        }

        if self.session.begin_bot_reply(&reply.text) {
            self.reveal.restart(self.reveal_period, self.events.clone());
            self.status.set_typing(true);
        } else {
            self.reveal.cancel();
            self.status.set_typing(false);
        }
        self.follow_tail = true;
    }

    /// Advances the reveal. Ticks from a superseded or cancelled timer are
    /// ignored.
    pub fn handle_reveal_tick(&mut self, generation: u64) {
        if !self.reveal.is_current(generation) {
            return;
        }
        match self.session.advance() {
            RevealProgress::Revealing => {}
            RevealProgress::Completed | RevealProgress::Idle => {
                self.reveal.cancel();
                self.status.set_typing(false);
            }
        }
    }

    pub fn reveal_generation(&self) -> u64 {
        self.reveal.generation()
    }

    pub fn on_tick(&mut self) {
        self.status.update_spinner();
    }

    pub fn scroll_up(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }
}
