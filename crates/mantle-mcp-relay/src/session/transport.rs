//! Session transport: owns one session's stream and drives its engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::lifecycle::{CloseReason, Lifecycle, SessionState};
use super::log::SessionLog;
use super::table::{SessionHandle, SessionTable};
use crate::bridge::{CorrelatedCall, CorrelatedReply, SyntheticRequest};
use crate::channel::{DurableRelay, RelaySubscription, request_channel, response_channel};
use crate::engine::{EngineError, EngineFactory, OutboundSink, ProtocolEngine, SseFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Hard bound on a session's lifetime.
    pub max_duration: Duration,
    pub log_flush_interval: Duration,
    /// Frames buffered for a slow client before engine writes wait.
    pub outbound_buffer: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(795),
            log_flush_interval: Duration::from_millis(100),
            outbound_buffer: 64,
        }
    }
}

/// A freshly opened session. Dropping `events` disconnects it.
pub struct OpenSession {
    pub session_id: String,
    pub events: ReceiverStream<SseFrame>,
    pub lifecycle: Arc<Lifecycle>,
}

/// Opens sessions and runs one task per open session.
#[derive(Clone)]
pub struct SessionTransport {
    relay: DurableRelay,
    engines: Arc<dyn EngineFactory>,
    sessions: SessionTable,
    settings: TransportSettings,
    shutdown: CancellationToken,
}

impl SessionTransport {
    pub fn new(relay: DurableRelay, engines: Arc<dyn EngineFactory>, settings: TransportSettings) -> Self {
        Self {
            relay,
            engines,
            sessions: SessionTable::new(),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    pub const fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub const fn relay(&self) -> &DurableRelay {
        &self.relay
    }

    /// Close all sessions and wait up to `grace` for their teardown.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();
        let handles = self.sessions.handles().await;
        let all_closed = async {
            for handle in &handles {
                handle.lifecycle.wait_closed().await;
            }
        };
        if tokio::time::timeout(grace, all_closed).await.is_err() {
            warn!(
                remaining = self.sessions.active_count().await,
                "Sessions still open after shutdown grace period"
            );
        }
    }

    /// Open a session: create its engine, listen on its request channel,
    /// announce it to the engine and start its task.
    pub async fn open(&self) -> Result<OpenSession, EngineError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.settings.outbound_buffer.max(1));
        let close = CancellationToken::new();
        let sink = OutboundSink::new(tx, close);
        let engine = self.engines.create(&session_id, sink.clone());
        let lifecycle = Arc::new(Lifecycle::new(self.settings.max_duration));
        let log = Arc::new(SessionLog::new(session_id.clone()));

        // Subscribe before the client learns the session id.
        let inbound = self.relay.subscribe(&request_channel(&session_id));
        engine.connect().await?;

        let cancel = self.shutdown.child_token();
        let handle = Arc::new(SessionHandle::new(session_id.clone(), Arc::clone(&lifecycle)));
        self.sessions.register(handle).await;
        log.info("Session opened");

        let driver = SessionDriver {
            session_id: session_id.clone(),
            engine,
            sink,
            inbound,
            relay: self.relay.clone(),
            lifecycle: Arc::clone(&lifecycle),
            log,
            cancel,
            sessions: self.sessions.clone(),
            flush_interval: self.settings.log_flush_interval,
        };
        tokio::spawn(driver.run());

        Ok(OpenSession {
            session_id,
            events: ReceiverStream::new(rx),
            lifecycle,
        })
    }
}

/// The task that lives as long as one session.
struct SessionDriver {
    session_id: String,
    engine: Arc<dyn ProtocolEngine>,
    sink: OutboundSink,
    inbound: RelaySubscription,
    relay: DurableRelay,
    lifecycle: Arc<Lifecycle>,
    log: Arc<SessionLog>,
    cancel: CancellationToken,
    sessions: SessionTable,
    flush_interval: Duration,
}

impl SessionDriver {
    async fn run(mut self) {
        let mut flush = tokio::time::interval(self.flush_interval.max(Duration::from_millis(1)));
        flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep_until(self.lifecycle.deadline());
        tokio::pin!(deadline);

        let reason = loop {
            tokio::select! {
                () = &mut deadline => break CloseReason::MaxDuration,
                () = self.sink.closed() => break CloseReason::ClientDisconnected,
                () = self.sink.close_requested() => break CloseReason::EngineClosed,
                () = self.cancel.cancelled() => break CloseReason::Shutdown,
                message = self.inbound.recv() => match message {
                    Some(raw) => self.dispatch(&raw),
                    None => break CloseReason::ChannelClosed,
                },
                _ = flush.tick() => {
                    self.log.flush();
                }
            }
        };
        self.teardown(reason).await;
    }

    /// Hand one relayed call to the engine on a detached task.
    fn dispatch(&self, raw: &str) {
        let call: CorrelatedCall = match serde_json::from_str(raw) {
            Ok(call) => call,
            Err(e) => {
                self.log.warn(format!("Dropping malformed inbound message: {e}"));
                return;
            }
        };
        if call.session_id != self.session_id {
            self.log.warn(format!(
                "Dropping call {} addressed to session {}",
                call.request_id, call.session_id
            ));
            return;
        }
        self.log.debug(format!("Call {} {} {}", call.request_id, call.method, call.url));

        let reply_channel = response_channel(&self.session_id, &call.request_id);
        let request = SyntheticRequest::from_call(&call);
        let engine = Arc::clone(&self.engine);
        let relay = self.relay.clone();
        let log = Arc::clone(&self.log);
        let lifecycle = Arc::clone(&self.lifecycle);
        let request_id = call.request_id;

        tokio::spawn(async move {
            let reply = match request {
                Ok(request) => {
                    // Nested task: a panicking engine still produces a reply.
                    match tokio::spawn(async move { engine.handle(request).await }).await {
                        Ok(Ok(reply)) => reply,
                        Ok(Err(e)) => {
                            log.warn(format!("Engine failed on call {request_id}: {e}"));
                            CorrelatedReply::internal_error()
                        }
                        Err(e) => {
                            log.error(format!("Engine task for call {request_id} aborted: {e}"));
                            CorrelatedReply::internal_error()
                        }
                    }
                }
                Err(e) => {
                    log.warn(format!("Rejected call {request_id}: {e}"));
                    CorrelatedReply::new(400, format!("Bad request: {e}"))
                }
            };
            publish_reply(&relay, &reply_channel, &reply, &log).await;
            flush_if_closing(&log, &lifecycle);
        });
    }

    /// Runs once per session.
    async fn teardown(mut self, reason: CloseReason) {
        if !self.lifecycle.begin_close(reason) {
            return;
        }
        self.log.info(format!("Session closing: {reason}"));
        self.inbound.unsubscribe();
        self.engine.disconnect().await;
        self.sink.end();
        self.sessions.unregister(&self.session_id).await;
        self.log.flush();
        self.lifecycle.finish_close();
        info!(session_id = %self.session_id, reason = %reason, "Session closed");
    }
}

/// Calls can outlive their session. Lines they log after teardown's last
/// flush have no flush tick left, so they go out immediately.
pub(super) fn flush_if_closing(log: &SessionLog, lifecycle: &Lifecycle) {
    if lifecycle.state() != SessionState::Active {
        log.flush();
    }
}

async fn publish_reply(relay: &DurableRelay, channel: &str, reply: &CorrelatedReply, log: &SessionLog) {
    let payload = match serde_json::to_string(reply) {
        Ok(payload) => payload,
        Err(e) => {
            log.error(format!("Failed to encode reply: {e}"));
            return;
        }
    };
    match relay.publish(channel, &payload).await {
        Ok(delivery) if delivery.local == 0 && !delivery.queued => {
            // Waiter already gone on a store-less relay.
            debug!(channel, "Reply had no listener, discarded");
        }
        Ok(_) => {}
        Err(e) => log.warn(format!("Failed to publish reply on {channel}: {e}")),
    }
}
