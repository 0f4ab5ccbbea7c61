//! Sessions: one long-lived task per open SSE stream.

mod lifecycle;
mod log;
mod table;
mod transport;


pub use lifecycle::{CloseReason, Lifecycle, SessionState, Transition};
pub use log::{LogLevel, SessionLog};
pub use table::{SessionHandle, SessionTable};
pub use transport::{OpenSession, SessionTransport, TransportSettings};
