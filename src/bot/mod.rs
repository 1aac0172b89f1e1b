//! Bot module - Telegram plumbing around the flow engine.

pub mod dispatcher;
mod runtime;
pub mod transport;
mod webhook;

pub use dispatcher::{build_dispatcher, AppState};
pub use runtime::run;
pub use transport::TelegramApi;
