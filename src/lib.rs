// src/lib.rs

pub mod app;
pub mod chat;
pub mod chat_message;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod key_handlers;
pub mod log_view;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod socket;
pub mod status_indicator;
pub mod typewriter;
pub mod ui;
