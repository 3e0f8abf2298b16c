// src/models.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "Bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Bot => "bot",
        })
    }
}

/// Delivery state of an entry. Bot entries are always `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Sent,
    Failed,
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub status: MessageStatus,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Local::now(),
            status,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
            timestamp: Local::now(),
            status: MessageStatus::Sent,
        }
    }

    /// Empty bot entry that is filled in once its reply has been typed out.
    pub fn placeholder() -> Self {
        Self::bot(String::new())
    }
}
