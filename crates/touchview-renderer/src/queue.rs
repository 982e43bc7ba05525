use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use touchview_core::{CommandSink, ViewerCommand};

/// An arbitrary closure run on the render thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Where the render thread currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderState {
    Idle,
    Draining,
    Drawing,
    Paused,
    Destroyed,
}

/// Work items, executed strictly in post order.
pub(crate) enum Job {
    Command(ViewerCommand),
    Task(Task),
    SurfaceCreated,
    Pause,
    Resume,
    Destroy,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Command(command) => f.debug_tuple("Command").field(command).finish(),
            Job::Task(_) => f.write_str("Task"),
            Job::SurfaceCreated => f.write_str("SurfaceCreated"),
            Job::Pause => f.write_str("Pause"),
            Job::Resume => f.write_str("Resume"),
            Job::Destroy => f.write_str("Destroy"),
        }
    }
}

/// What the render thread should do next.
#[derive(Debug)]
pub(crate) enum Work {
    Jobs(VecDeque<Job>),
    Draw,
}

#[derive(Debug)]
struct QueueState {
    jobs: VecDeque<Job>,
    redraw_pending: bool,
    closed: bool,
    phase: RenderState,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_redraw(&self) {
        let mut state = self.lock();
        if !state.closed && !state.redraw_pending {
            state.redraw_pending = true;
            self.wake.notify_one();
        }
    }
}

/// Producer side of the render thread's FIFO.
///
/// Cheap to clone and safe to use from any thread. Posting takes the lock
/// only long enough to append; after shutdown posts are dropped.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    shared: Arc<Shared>,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    redraw_pending: false,
                    closed: false,
                    phase: RenderState::Idle,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    pub(crate) fn push(&self, job: Job) -> bool {
        let mut state = self.shared.lock();
        if state.closed {
            log::trace!("Dropping {:?} posted after shutdown", job);
            return false;
        }
        state.jobs.push_back(job);
        self.shared.wake.notify_one();
        true
    }

    /// Append the destroy marker and refuse everything after it.
    pub(crate) fn close(&self) {
        let mut state = self.shared.lock();
        if !state.closed {
            state.jobs.push_back(Job::Destroy);
            state.closed = true;
            self.shared.wake.notify_one();
        }
    }

    /// Run `task` on the render thread after everything posted before it.
    pub fn run<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Job::Task(Box::new(task)))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn state(&self) -> RenderState {
        self.shared.lock().phase
    }

    /// A handle the render thread keeps to re-arm drawing without keeping
    /// the queue alive.
    pub fn redraw_signal(&self) -> RedrawSignal {
        RedrawSignal {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The consuming end, handed to the render thread at spawn.
    pub(crate) fn receiver(&self) -> WorkReceiver {
        WorkReceiver {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl CommandSink for CommandQueue {
    fn post(&self, command: ViewerCommand) {
        self.push(Job::Command(command));
    }

    fn request_redraw(&self) {
        self.shared.request_redraw();
    }
}

/// Weak redraw trigger held by the render thread.
#[derive(Debug, Clone)]
pub struct RedrawSignal {
    shared: Weak<Shared>,
}

impl RedrawSignal {
    pub fn request(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.request_redraw();
        }
    }
}

/// Consumer side of the FIFO, owned by the render thread.
#[derive(Debug)]
pub(crate) struct WorkReceiver {
    shared: Arc<Shared>,
}

impl WorkReceiver {
    /// Block until there is something to do.
    ///
    /// Pending jobs always go first and are handed over as a whole batch so
    /// producers never wait on job execution. A redraw is only handed out
    /// when the queue is empty and `can_draw` holds; otherwise it stays
    /// pending, collapsed into a single request.
    pub(crate) fn next_work(&self, paused: bool, can_draw: bool) -> Work {
        let mut state = self.shared.lock();
        loop {
            if !state.jobs.is_empty() {
                state.phase = RenderState::Draining;
                return Work::Jobs(std::mem::take(&mut state.jobs));
            }
            if state.redraw_pending && can_draw {
                state.redraw_pending = false;
                state.phase = RenderState::Drawing;
                return Work::Draw;
            }
            state.phase = if paused {
                RenderState::Paused
            } else {
                RenderState::Idle
            };
            state = self
                .shared
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn set_state(&self, phase: RenderState) {
        self.shared.lock().phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(receiver: &WorkReceiver) -> Vec<String> {
        match receiver.next_work(false, false) {
            Work::Jobs(jobs) => jobs.iter().map(|job| format!("{:?}", job)).collect(),
            Work::Draw => panic!("draw handed out while drawing is not allowed"),
        }
    }

    #[test]
    fn test_jobs_before_draw() {
        let queue = CommandQueue::new();
        let receiver = queue.receiver();
        queue.request_redraw();
        queue.post(ViewerCommand::FitAll);

        assert!(matches!(receiver.next_work(false, true), Work::Jobs(_)));
        assert_eq!(queue.state(), RenderState::Draining);
        assert!(matches!(receiver.next_work(false, true), Work::Draw));
        assert_eq!(queue.state(), RenderState::Drawing);
    }

    #[test]
    fn test_redraw_requests_coalesce() {
        let queue = CommandQueue::new();
        for _ in 0..10 {
            queue.request_redraw();
        }
        assert!(matches!(queue.receiver().next_work(false, true), Work::Draw));
        assert!(!queue.shared.lock().redraw_pending);
    }

    #[test]
    fn test_close_appends_marker_and_drops_later_posts() {
        let queue = CommandQueue::new();
        queue.post(ViewerCommand::FitAll);
        queue.close();
        queue.post(ViewerCommand::Select { x: 1.0, y: 1.0 });
        assert!(!queue.run(|| {}));
        queue.request_redraw();

        assert_eq!(drain(&queue.receiver()), vec!["Command(FitAll)", "Destroy"]);
        assert!(queue.is_closed());
        assert!(!queue.shared.lock().redraw_pending);
    }

    #[test]
    fn test_redraw_signal_is_weak() {
        let queue = CommandQueue::new();
        let signal = queue.redraw_signal();
        signal.request();
        assert!(queue.shared.lock().redraw_pending);

        drop(queue);
        // Nothing left to wake; must not panic.
        signal.request();
    }
}
