//! Bridge between short-lived call handlers and the session task.
//!
//! A call handler turns an HTTP request into a [`CorrelatedCall`], publishes
//! it on the session's request channel and waits for the matching
//! [`CorrelatedReply`]. The session task rebuilds a [`SyntheticRequest`] from
//! the call and feeds it to its protocol engine.

mod correlator;
mod synthetic;
mod types;

pub use correlator::{Correlator, CorrelatorError, new_correlation_id};
pub use synthetic::{BuildError, OnceBody, SyntheticRequest};
pub use types::{CorrelatedCall, CorrelatedReply, InboundCall};
