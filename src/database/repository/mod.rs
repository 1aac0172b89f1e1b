//! MongoDB implementations of the storage traits.

mod list_repository;
mod state_repository;

pub use list_repository::ListRepository;
pub use state_repository::StateRepository;
