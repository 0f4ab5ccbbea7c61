//! Request/response correlation across the relay.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{CorrelatedCall, CorrelatedReply, InboundCall};
use crate::channel::{DurableRelay, RelayError, request_channel, response_channel};

/// Errors from correlating a call with its reply.
#[derive(Debug, thiserror::Error)]
pub enum CorrelatorError {
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Failed to publish call: {0}")]
    Publish(#[from] RelayError),

    #[error("Malformed reply: {0}")]
    MalformedReply(#[source] serde_json::Error),

    #[error("Failed to encode call: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Response channel closed")]
    ChannelClosed,
}

/// Fresh correlation id (UUID v4).
pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sends calls to sessions and waits, bounded, for their replies.
#[derive(Clone)]
pub struct Correlator {
    relay: DurableRelay,
    timeout: Duration,
}

impl Correlator {
    pub const fn new(relay: DurableRelay, timeout: Duration) -> Self {
        Self { relay, timeout }
    }

    /// Deliver `call` to session `session_id` and return its reply.
    ///
    /// The response subscription exists before the call is published, so a
    /// fast reply cannot be missed. It is dropped on every exit path; a reply
    /// arriving later finds no listener and expires in the store.
    ///
    /// The timeout covers publishing as well as waiting, so a slow store
    /// cannot stretch the call past its deadline.
    pub async fn call(
        &self,
        session_id: &str,
        call: InboundCall,
    ) -> Result<CorrelatedReply, CorrelatorError> {
        let request_id = new_correlation_id();
        let reply_channel = response_channel(session_id, &request_id);
        let mut replies = self.relay.subscribe(&reply_channel);

        let call = CorrelatedCall::new(request_id.clone(), session_id.to_string(), call);
        let payload = serde_json::to_string(&call).map_err(CorrelatorError::Encode)?;
        let exchange = async {
            let delivery = self
                .relay
                .publish(&request_channel(session_id), &payload)
                .await?;
            debug!(
                session_id,
                request_id = %request_id,
                local = delivery.local,
                queued = delivery.queued,
                "Call published"
            );
            Ok::<_, CorrelatorError>(replies.recv().await)
        };

        let Ok(received) = tokio::time::timeout(self.timeout, exchange).await else {
            info!(session_id, request_id = %request_id, "Call timed out");
            return Err(CorrelatorError::Timeout(self.timeout));
        };
        let received = received?;
        replies.unsubscribe();

        let raw = received.ok_or(CorrelatorError::ChannelClosed)?;
        serde_json::from_str(&raw).map_err(|e| {
            warn!(session_id, request_id = %request_id, error = %e, "Malformed reply");
            CorrelatorError::MalformedReply(e)
        })
    }
}
