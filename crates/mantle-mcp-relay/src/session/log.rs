//! Buffered per-session log, flushed into `tracing` on an interval.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Lines kept before the oldest are dropped.
const MAX_PENDING: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Default)]
struct Buffer {
    lines: VecDeque<(LogLevel, String)>,
    dropped: usize,
}

/// Log lines for one session. Writing never blocks on the subscriber;
/// lines reach `tracing` at the next flush.
pub struct SessionLog {
    session_id: String,
    buffer: Mutex<Buffer>,
}

impl SessionLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            buffer: Mutex::new(Buffer::default()),
        }
    }

    pub fn log(&self, level: LogLevel, line: impl Into<String>) {
        let mut buffer = self.buffer.lock();
        if buffer.lines.len() >= MAX_PENDING {
            buffer.lines.pop_front();
            buffer.dropped += 1;
        }
        buffer.lines.push_back((level, line.into()));
    }

    pub fn debug(&self, line: impl Into<String>) {
        self.log(LogLevel::Debug, line);
    }

    pub fn info(&self, line: impl Into<String>) {
        self.log(LogLevel::Info, line);
    }

    pub fn warn(&self, line: impl Into<String>) {
        self.log(LogLevel::Warn, line);
    }

    pub fn error(&self, line: impl Into<String>) {
        self.log(LogLevel::Error, line);
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().lines.len()
    }

    /// Emit buffered lines. Returns how many were written.
    pub fn flush(&self) -> usize {
        let Buffer { lines, dropped } = std::mem::take(&mut *self.buffer.lock());
        let session_id = self.session_id.as_str();
        if dropped > 0 {
            warn!(session_id, dropped, "Session log overflowed");
        }
        for (level, line) in &lines {
            match level {
                LogLevel::Debug => debug!(session_id, "{line}"),
                LogLevel::Info => info!(session_id, "{line}"),
                LogLevel::Warn => warn!(session_id, "{line}"),
                LogLevel::Error => error!(session_id, "{line}"),
            }
        }
        lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_drains_buffer() {
        let log = SessionLog::new("s1");
        log.info("opened");
        log.warn("slow");
        assert_eq!(log.pending(), 2);
        assert_eq!(log.flush(), 2);
        assert_eq!(log.pending(), 0);
        assert_eq!(log.flush(), 0);
    }

    #[test]
    fn overflow_drops_oldest() {
        let log = SessionLog::new("s1");
        for i in 0..=MAX_PENDING {
            log.debug(format!("line {i}"));
        }
        assert_eq!(log.pending(), MAX_PENDING);
        assert_eq!(log.buffer.lock().lines[0].1, "line 1");
    }
}
