//! Session lifecycle: `Active -> Closing -> Closed`.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

/// Why a session left `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    MaxDuration,
    ClientDisconnected,
    EngineClosed,
    /// The inbound request subscription ended.
    ChannelClosed,
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MaxDuration => "max duration reached",
            Self::ClientDisconnected => "client disconnected",
            Self::EngineClosed => "engine closed",
            Self::ChannelClosed => "request channel closed",
            Self::Shutdown => "server shutdown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub at: Instant,
}

struct Record {
    reason: Option<CloseReason>,
    history: Vec<Transition>,
}

/// State machine of one session. Transitions only move forward and each
/// happens at most once.
pub struct Lifecycle {
    state: watch::Sender<SessionState>,
    record: Mutex<Record>,
    opened_at: Instant,
    deadline: Instant,
}

impl Lifecycle {
    pub fn new(max_duration: Duration) -> Self {
        let opened_at = Instant::now();
        Self {
            state: watch::Sender::new(SessionState::Active),
            record: Mutex::new(Record {
                reason: None,
                history: Vec::new(),
            }),
            opened_at,
            deadline: opened_at + max_duration,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn reason(&self) -> Option<CloseReason> {
        self.record.lock().reason
    }

    pub const fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn history(&self) -> Vec<Transition> {
        self.record.lock().history.clone()
    }

    fn advance(&self, from: SessionState, to: SessionState, reason: Option<CloseReason>) -> bool {
        let mut record = self.record.lock();
        if *self.state.borrow() != from {
            return false;
        }
        if reason.is_some() {
            record.reason = reason;
        }
        record.history.push(Transition {
            from,
            to,
            at: Instant::now(),
        });
        self.state.send_replace(to);
        true
    }

    /// `Active -> Closing`. Returns `false` if the session already left
    /// `Active`, so only the first caller runs teardown.
    pub fn begin_close(&self, reason: CloseReason) -> bool {
        self.advance(SessionState::Active, SessionState::Closing, Some(reason))
    }

    /// `Closing -> Closed`.
    pub fn finish_close(&self) -> bool {
        self.advance(SessionState::Closing, SessionState::Closed, None)
    }

    pub async fn wait_closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a dropped sender.
        let _ = rx.wait_for(|s| *s == SessionState::Closed).await;
    }
}
