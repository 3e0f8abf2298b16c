// src/chat.rs

use crate::models::{ChatMessage, MessageStatus, Role};
use crate::typewriter::Typewriter;

/// Outcome of a single reveal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealProgress {
    /// Nothing is being typed.
    Idle,
    /// A character was revealed and more remain.
    Revealing,
    /// The reply is fully shown and has been written into the store.
    Completed,
}

/// Ordered conversation plus the reply currently being typed out.
///
/// The list is append-only except for the bot placeholder, which is
/// overwritten when its reveal completes. At most one entry is in progress
/// at a time.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    typewriter: Typewriter,
    // Index of the placeholder being typed. User entries sent mid-reveal
    // may follow it, so it is not always the last element.
    pending: Option<usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typewriter.is_active()
    }

    pub fn push_user(&mut self, content: impl Into<String>, status: MessageStatus) {
        self.messages.push(ChatMessage::user(content, status));
    }

    /// Appends a placeholder for `text` and starts typing it out.
    ///
    /// A reply that arrives while another is still being typed finalizes the
    /// earlier one first, so no placeholder is left empty behind the new
    /// one. Returns whether a reveal was started; an empty reply leaves its
    /// placeholder empty.
    pub fn begin_bot_reply(&mut self, text: &str) -> bool {
        if self.typewriter.is_active() {
            self.reconcile();
        }
        self.messages.push(ChatMessage::placeholder());
        let started = self.typewriter.start(text);
        if started {
            self.pending = Some(self.messages.len() - 1);
        }
        started
    }

    /// Advances the reveal by one character and reconciles on completion.
    pub fn advance(&mut self) -> RevealProgress {
        if !self.typewriter.is_active() {
            return RevealProgress::Idle;
        }
        self.typewriter.tick();
        if self.typewriter.is_complete() {
            self.reconcile();
            RevealProgress::Completed
        } else {
            RevealProgress::Revealing
        }
    }

    /// Text to show for the entry at `index`: the typed-out prefix for the
    /// in-progress placeholder, the stored content otherwise.
    pub fn visible_content(&self, index: usize) -> &str {
        let Some(msg) = self.messages.get(index) else {
            return "";
        };
        if self.is_in_progress(index) {
            self.typewriter.displayed()
        } else {
            &msg.content
        }
    }

    pub fn is_in_progress(&self, index: usize) -> bool {
        self.typewriter.is_active() && self.pending == Some(index)
    }

    /// Writes the full reply into its placeholder and ends the reveal.
    fn reconcile(&mut self) {
        if let Some(entry) = self.pending.take().and_then(|i| self.messages.get_mut(i)) {
            if entry.role == Role::Bot {
                entry.content = self.typewriter.target().to_string();
            }
        }
        self.typewriter.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_out(session: &mut ChatSession) -> Vec<String> {
        let mut frames = Vec::new();
        let index = session.pending.unwrap_or(0);
        loop {
            let progress = session.advance();
            frames.push(session.visible_content(index).to_string());
            if progress != RevealProgress::Revealing {
                break;
            }
        }
        frames
    }

    #[test]
    fn test_bot_reply_reveals_then_reconciles() {
        let mut session = ChatSession::new();
        assert!(session.begin_bot_reply("hi there"));

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "");
        assert_eq!(session.visible_content(0), "");
        assert!(session.is_typing());

        let frames = type_out(&mut session);
        assert_eq!(frames[0], "h");
        assert_eq!(frames[1], "hi");
        assert_eq!(frames.last().map(String::as_str), Some("hi there"));
        assert_eq!(frames.len(), "hi there".len());

        let last = &session.messages()[0];
        assert_eq!(last.role, Role::Bot);
        assert_eq!(last.content, "hi there");
        assert!(!session.is_typing());
        assert_eq!(session.advance(), RevealProgress::Idle);
    }

    #[test]
    fn test_placeholder_stays_empty_until_complete() {
        let mut session = ChatSession::new();
        session.push_user("hello", MessageStatus::Sent);
        session.begin_bot_reply("abc");

        assert_eq!(session.advance(), RevealProgress::Revealing);
        assert_eq!(session.advance(), RevealProgress::Revealing);
        assert_eq!(session.messages()[1].content, "");
        assert_eq!(session.visible_content(1), "ab");
        assert_eq!(session.visible_content(0), "hello");

        assert_eq!(session.advance(), RevealProgress::Completed);
        assert_eq!(session.messages()[1].content, "abc");
    }

    #[test]
    fn test_empty_reply_starts_nothing() {
        let mut session = ChatSession::new();
        assert!(!session.begin_bot_reply(""));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "");
        assert!(!session.is_typing());
        assert_eq!(session.advance(), RevealProgress::Idle);
    }

    #[test]
    fn test_second_reply_finalizes_first() {
        let mut session = ChatSession::new();
        session.begin_bot_reply("first");
        session.advance();
        session.advance();

        session.begin_bot_reply("second");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].content, "first");
        assert_eq!(session.visible_content(1), "");
        assert!(!session.is_in_progress(0));
        assert!(session.is_in_progress(1));

        type_out(&mut session);
        assert_eq!(session.messages()[1].content, "second");
    }

    #[test]
    fn test_user_message_mid_reveal_does_not_take_reply() {
        let mut session = ChatSession::new();
        session.begin_bot_reply("reply");
        session.advance();
        session.push_user("interjection", MessageStatus::Sent);

        assert_eq!(session.visible_content(0), "r");
        assert_eq!(session.visible_content(1), "interjection");
        type_out(&mut session);

        assert_eq!(session.messages()[0].content, "reply");
        assert_eq!(session.messages()[1].content, "interjection");
        assert_eq!(session.messages()[1].role, Role::User);
    }

    #[test]
    fn test_user_entries_keep_original_text() {
        let mut session = ChatSession::new();
        session.push_user("  spaced out  ", MessageStatus::Failed);
        let msg = &session.messages()[0];
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "  spaced out  ");
        assert_eq!(msg.status, MessageStatus::Failed);
        assert_eq!(session.visible_content(7), "");
    }
}
