//! Cache module - Named, typed caches backed by Moka.
//!
//! The bot keeps two hot paths in memory:
//! - user records (skip redundant upserts on every update)
//! - conversation states (read on every update, written on every transition)
//!
//! Membership checks also use a short-lived cache for positive results.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let states = registry.get_or_create::<i64, UserState>("user_states", CacheConfig::session_data());
//! states.insert(user_id, state);
//! let state = states.get(&user_id);
//! ```

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
