//! Database models.

pub mod list_message;
pub mod transmission_list;
pub mod user;
pub mod user_state;

pub use list_message::{MessageStatus, NewMessage, TransmissionListMessage};
pub use transmission_list::{ChannelKind, NewChannel, TransmissionList, TransmissionListChannel};
pub use user::BotUser;
pub use user_state::{FlowState, UserState};
