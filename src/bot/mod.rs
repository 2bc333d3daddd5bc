//! Telegram front end: commands, dialogues and replies.

pub mod commands;
pub mod dialogue;
pub mod fanout;
pub mod handlers;
pub mod parse;
pub mod render;
pub mod telegram;

pub use commands::{AdminCommand, Command};
pub use handlers::BotState;
pub use telegram::TelegramClient;
