//! `mantle-mcp` session bridge.
//!
//! Serves MCP over SSE from workers that do not share memory. A client opens
//! a long-lived event stream on one worker and posts calls that may land on
//! any worker; calls and replies travel between them over named channels,
//! backed by an optional shared `SQLite` store.

pub mod bridge;
pub mod channel;
pub mod engine;
pub mod server;
pub mod session;
pub mod storage;
pub mod tools;
