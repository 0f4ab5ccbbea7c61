//! SQLite database for the relay shared store.

pub use mantle_mcp_core::db::DatabaseError;

mantle_mcp_core::define_database!(RelayDatabase, "Relay database migrations complete");
