//! Database module exports.

pub mod models;
mod mongo;
mod repository;
pub mod store;
mod users;

pub use mongo::Database;
pub use repository::{ListRepository, StateRepository};
pub use store::{AddChannel, ListStore, StateStore};
pub use users::UserRepo;
