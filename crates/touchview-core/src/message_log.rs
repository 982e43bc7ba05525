//! Process-wide message log.
//!
//! Text posted while no sink is attached is buffered; attaching a sink
//! flushes the buffer into it and later messages are written through
//! immediately. Every message is also mirrored into the `log` facade.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Message gravity, from chatter to hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Trace,
    Info,
    Warning,
    Alarm,
    Fail,
}

impl Severity {
    fn log_level(&self) -> log::Level {
        match self {
            Severity::Trace => log::Level::Trace,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Alarm | Severity::Fail => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Trace => "trace",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alarm => "alarm",
            Severity::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Where messages end up once a view is attached.
pub trait MessageSink: Send {
    fn write(&mut self, severity: Severity, text: &str);
}

impl<F> MessageSink for F
where
    F: FnMut(Severity, &str) + Send,
{
    fn write(&mut self, severity: Severity, text: &str) {
        self(severity, text)
    }
}

/// A message that arrived before any sink was attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// How serious the message is.
    pub severity: Severity,
    /// The message itself.
    pub text: String,
}

#[derive(Default)]
struct LogState {
    sink: Option<Box<dyn MessageSink>>,
    buffer: Vec<LogEntry>,
    /// Thread writing into the sink; the sink is taken out meanwhile.
    writer: Option<ThreadId>,
    /// Posted by the sink itself while writing, held for the next flush.
    deferred: Vec<LogEntry>,
    /// Bumped on every attach and detach.
    generation: u64,
}

/// Buffer-or-forward message log guarded by one mutex.
///
/// The sink is written to with the mutex released, so a sink may post back
/// into the log.
#[derive(Default)]
pub struct MessageLog {
    state: Mutex<LogState>,
}

impl fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MessageLog")
            .field("attached", &state.sink.is_some())
            .field("buffered", &state.buffer.len())
            .finish()
    }
}

static GLOBAL: Lazy<MessageLog> = Lazy::new(MessageLog::new);

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static MessageLog {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a message at the given severity.
    pub fn post(&self, severity: Severity, text: &str) {
        log::log!(target: "touchview::messages", severity.log_level(), "{}", text);

        let entry = LogEntry {
            severity,
            text: text.to_string(),
        };
        let mut state = self.lock();
        if state.writer == Some(thread::current().id()) {
            state.deferred.push(entry);
            return;
        }
        state.buffer.push(entry);
        if state.writer.is_none() && state.sink.is_some() {
            self.flush(state);
        }
    }

    /// Attach a sink, flushing everything buffered so far into it in order.
    /// A previously attached sink is replaced and returned; one that is busy
    /// writing on another thread is dropped once it finishes instead.
    pub fn attach(&self, sink: Box<dyn MessageSink>) -> Option<Box<dyn MessageSink>> {
        let mut state = self.lock();
        state.generation += 1;
        let previous = state.sink.replace(sink);
        if state.writer.is_none() {
            self.flush(state);
        }
        previous
    }

    /// Detach the current sink; later messages are buffered again.
    /// Returns `None` when the sink is busy writing on another thread, in
    /// which case it is dropped once it finishes.
    pub fn detach(&self) -> Option<Box<dyn MessageSink>> {
        let mut state = self.lock();
        state.generation += 1;
        state.sink.take()
    }

    /// Write the buffer into the sink with the lock released, until nothing
    /// is left or the sink was swapped out underneath.
    fn flush<'a>(&'a self, mut state: MutexGuard<'a, LogState>) {
        let Some(mut sink) = state.sink.take() else {
            return;
        };
        let generation = state.generation;
        state.writer = Some(thread::current().id());

        let mut healthy = true;
        while healthy && !state.buffer.is_empty() && state.generation == generation {
            let entries = std::mem::take(&mut state.buffer);
            drop(state);
            healthy = panic::catch_unwind(AssertUnwindSafe(|| {
                for entry in &entries {
                    sink.write(entry.severity, &entry.text);
                }
            }))
            .is_ok();
            state = self.lock();
        }

        state.writer = None;
        let deferred = std::mem::take(&mut state.deferred);
        state.buffer.extend(deferred);
        if !healthy {
            log::error!("Message sink panicked and was detached");
        } else if state.generation == generation {
            state.sink = Some(sink);
        } else if state.sink.is_some() {
            self.flush(state);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Remove and return everything buffered while detached.
    pub fn take_buffered(&self) -> Vec<LogEntry> {
        std::mem::take(&mut self.lock().buffer)
    }
}

// ── Process-wide shorthands ──────────────────────────────────────────

pub fn post(text: &str) {
    MessageLog::global().post(Severity::Info, text);
}

pub fn post_with(severity: Severity, text: &str) {
    MessageLog::global().post(severity, text);
}

pub fn attach(sink: Box<dyn MessageSink>) -> Option<Box<dyn MessageSink>> {
    MessageLog::global().attach(sink)
}

pub fn detach() -> Option<Box<dyn MessageSink>> {
    MessageLog::global().detach()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn capture() -> (Arc<Mutex<Vec<String>>>, Box<dyn MessageSink>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let sink: Box<dyn MessageSink> = Box::new(move |severity: Severity, text: &str| {
            sink_lines.lock().unwrap().push(format!("{}: {}", severity, text));
        });
        (lines, sink)
    }

    #[test]
    fn test_buffers_until_attached() {
        let log = MessageLog::new();
        log.post(Severity::Info, "first");
        log.post(Severity::Warning, "second");
        assert_eq!(log.buffered_len(), 2);

        let (lines, sink) = capture();
        assert!(log.attach(sink).is_none());
        assert_eq!(log.buffered_len(), 0);
        assert_eq!(*lines.lock().unwrap(), vec!["info: first", "warning: second"]);

        log.post(Severity::Fail, "third");
        assert_eq!(lines.lock().unwrap().len(), 3);
        assert_eq!(log.buffered_len(), 0);
    }

    #[test]
    fn test_sink_may_post_back_into_the_log() {
        static LOG: Lazy<MessageLog> = Lazy::new(MessageLog::new);
        let (lines, mut inner) = capture();
        LOG.attach(Box::new(move |severity: Severity, text: &str| {
            inner.write(severity, text);
            if !text.starts_with("echo") {
                LOG.post(Severity::Trace, &format!("echo {}", text));
            }
        }));

        LOG.post(Severity::Info, "hello");
        assert_eq!(*lines.lock().unwrap(), vec!["info: hello"]);
        assert_eq!(LOG.buffered_len(), 1);

        // The echo goes out ahead of the next message.
        LOG.post(Severity::Info, "again");
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["info: hello", "trace: echo hello", "info: again"]
        );
        assert!(LOG.is_attached());
    }

    #[test]
    fn test_panicking_sink_is_dropped() {
        let log = MessageLog::new();
        log.attach(Box::new(|_: Severity, _: &str| panic!("sink broke")));
        log.post(Severity::Info, "lost");
        assert!(!log.is_attached());

        log.post(Severity::Info, "kept");
        assert_eq!(log.take_buffered().len(), 1);
    }

    #[test]
    fn test_detach_resumes_buffering() {
        let log = MessageLog::new();
        let (lines, sink) = capture();
        log.attach(sink);
        log.post(Severity::Info, "shown");
        assert!(log.detach().is_some());
        assert!(!log.is_attached());

        log.post(Severity::Info, "held");
        assert_eq!(lines.lock().unwrap().len(), 1);
        let held = log.take_buffered();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].text, "held");
    }
}
