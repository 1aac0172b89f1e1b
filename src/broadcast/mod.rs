//! Broadcast of a stored message to every channel of a list.
//!
//! The dispatcher copies the canonical storage-channel message into each
//! member channel with bounded parallelism, counts per-channel outcomes and
//! records the aggregated status on the message row.

mod dispatcher;

pub use dispatcher::BroadcastDispatcher;
