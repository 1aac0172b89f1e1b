//! Conversation flow.
//!
//! [`FlowEngine`] owns the per-user state machine: creating lists, adding
//! channels from forwarded posts, picking a list, storing a draft and
//! confirming the broadcast. It talks to Telegram and storage only through
//! the `BotApi`, `StateStore` and `ListStore` seams.

mod callback;
mod command;
mod engine;
mod error;
mod keyboards;
mod lists;
mod locks;
mod send;
mod update;


pub use command::Command;
pub use engine::FlowEngine;
pub use update::{ForwardedChat, IncomingCallback, IncomingMessage, Sender};
