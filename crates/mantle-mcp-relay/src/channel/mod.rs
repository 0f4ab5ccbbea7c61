//! Channels: the in-process registry and its cross-worker extension.
//!
//! A channel is a named bus. Requests for a session travel on
//! `requests:{sessionId}`; the single reply to a call travels on
//! `responses:{sessionId}:{requestId}`.

mod names;
mod registry;
mod relay;
mod store;

pub use names::{message_key, request_channel, response_channel};
pub use registry::{ChannelRegistry, Subscription};
pub use relay::{Delivery, DurableRelay, RelayError, RelaySettings, RelaySubscription};
pub use store::{SharedStore, StoreError};
