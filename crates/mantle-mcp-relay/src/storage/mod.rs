//! SQLite shared store for the relay.
//!
//! Holds expiring message records and the per-channel queues that let a
//! worker hand a message to a subscriber living in another process.

mod db;
mod models;
mod queries;
mod store;

#[cfg(test)]
mod tests;

pub use db::{DatabaseError, RelayDatabase};
pub use models::*;
pub use store::SqliteStore;
