//! Permission checks.
//!
//! Two questions are asked of Telegram:
//!
//! - can the bot post in a target channel (admin + "Post Messages")?
//! - is a user subscribed to the admin channel that gates the bot?
//!
//! Both fail closed: any API error answers "no".
//!
//! ## Usage
//!
//! ```rust,ignore
//! let perms = Permissions::new(api, bot_id, &cache);
//!
//! if !perms.is_channel_member(config.admin_channel_id, user_id).await {
//!     // deny
//! }
//!
//! let rights = perms.check_bot_permissions(chat_id).await;
//! if rights.is_admin && rights.can_post {
//!     // ...
//! }
//! ```

mod checker;

pub use checker::Permissions;
