//! Headless stand-ins for the graphics driver and the viewer engine.
//!
//! Both record every call they receive into a [`Journal`] that other threads
//! can inspect or wait on. The host's scripted sessions and the tests drive
//! the render thread through them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use touchview_core::{
    ContextHandle, Orientation, PointerId, ViewerCommand, ViewerEngine, ViewerHandle,
};

use crate::context::{ContextError, GraphicsDisplay};
use crate::surface_config::{SurfaceConfig, RENDERABLE_ES2, RENDERABLE_ES3};

// ── Journal ──────────────────────────────────────────────────────────

/// Append-only, thread-safe call log.
pub struct Journal<T> {
    inner: Arc<(Mutex<Vec<T>>, Condvar)>,
}

impl<T> Clone for Journal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new((Mutex::new(Vec::new()), Condvar::new())),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Journal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lock().iter()).finish()
    }
}

impl<T> Journal<T> {
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, entry: T) {
        self.lock().push(entry);
        self.inner.1.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.lock().iter().filter(|entry| predicate(*entry)).count()
    }

    /// Block until `predicate` holds over the whole log or `timeout` passes.
    /// Returns whether the predicate was met.
    pub fn wait_until(&self, timeout: Duration, predicate: impl Fn(&[T]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut entries = self.lock();
        loop {
            if predicate(entries.as_slice()) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            entries = self
                .inner
                .1
                .wait_timeout(entries, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

impl<T: Clone> Journal<T> {
    pub fn entries(&self) -> Vec<T> {
        self.lock().clone()
    }
}

// ── Display ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    CreateContext(ContextHandle, SurfaceConfig),
    DestroyContext(ContextHandle),
    Attach(ContextHandle),
    Detach(ContextHandle),
}

#[derive(Debug, Default)]
struct ScriptState {
    configs: Vec<SurfaceConfig>,
    create_failures: VecDeque<u32>,
    lost: bool,
}

/// Shared knobs for injecting driver failures into a running display.
#[derive(Debug, Clone, Default)]
pub struct DisplayScript {
    state: Arc<Mutex<ScriptState>>,
}

impl DisplayScript {
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next context creation fail with `code`.
    pub fn fail_next_create(&self, code: u32) {
        self.lock().create_failures.push_back(code);
    }

    /// Report every existing context as lost until a new one is created.
    pub fn lose_contexts(&self) {
        self.lock().lost = true;
    }

    /// Replace what the display offers from the next surface on.
    pub fn offer_configs(&self, configs: Vec<SurfaceConfig>) {
        self.lock().configs = configs;
    }
}

/// A display driver that offers scripted configurations and draws no pixels.
#[derive(Debug)]
pub struct HeadlessDisplay {
    script: DisplayScript,
    journal: Journal<DisplayCall>,
}

impl HeadlessDisplay {
    pub fn new(configs: Vec<SurfaceConfig>) -> Self {
        let script = DisplayScript::default();
        script.offer_configs(configs);
        Self {
            script,
            journal: Journal::default(),
        }
    }

    /// The configuration list of a typical phone GPU.
    pub fn phone() -> Self {
        Self::new(vec![
            SurfaceConfig::rgb565(16, 0),
            SurfaceConfig::rgb888(24, 8).with_alpha(8),
            SurfaceConfig::rgb888(24, 8),
            SurfaceConfig::rgb888(24, 8).with_renderable_type(RENDERABLE_ES2 | RENDERABLE_ES3),
        ])
    }

    pub fn script(&self) -> DisplayScript {
        self.script.clone()
    }

    pub fn journal(&self) -> Journal<DisplayCall> {
        self.journal.clone()
    }
}

impl GraphicsDisplay for HeadlessDisplay {
    fn configs(&self) -> Vec<SurfaceConfig> {
        self.script.lock().configs.clone()
    }

    fn create_context(&mut self, config: &SurfaceConfig) -> Result<ContextHandle, ContextError> {
        let mut script = self.script.lock();
        if let Some(code) = script.create_failures.pop_front() {
            return Err(ContextError::CreateFailed { code });
        }
        script.lost = false;
        let handle = ContextHandle::new();
        self.journal.record(DisplayCall::CreateContext(handle, *config));
        Ok(handle)
    }

    fn destroy_context(&mut self, context: ContextHandle) {
        self.journal.record(DisplayCall::DestroyContext(context));
    }

    fn attach_surface(&mut self, context: ContextHandle) -> Result<(), ContextError> {
        self.journal.record(DisplayCall::Attach(context));
        Ok(())
    }

    fn detach_surface(&mut self, context: ContextHandle) {
        self.journal.record(DisplayCall::Detach(context));
    }

    fn is_context_lost(&self, _context: ContextHandle) -> bool {
        self.script.lock().lost
    }
}

// ── Engine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create { handle: ViewerHandle, screen_density: f32 },
    Destroy { handle: ViewerHandle },
    Init { handle: ViewerHandle, context: ContextHandle },
    Command { handle: ViewerHandle, command: ViewerCommand },
    Redraw { handle: ViewerHandle },
}

/// A viewer engine that draws nothing and remembers everything.
///
/// Camera moves (`fit_all`, `set_projection`) start a transition that asks
/// for `transition_frames` extra frames.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    journal: Journal<EngineCall>,
    transition_frames: u32,
    frames_left: u32,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transition_frames(mut self, frames: u32) -> Self {
        self.transition_frames = frames;
        self
    }

    pub fn journal(&self) -> Journal<EngineCall> {
        self.journal.clone()
    }

    fn command(&self, handle: ViewerHandle, command: ViewerCommand) {
        self.journal.record(EngineCall::Command { handle, command });
    }
}

impl ViewerEngine for RecordingEngine {
    fn create(&mut self, screen_density: f32) -> ViewerHandle {
        let handle = ViewerHandle::new();
        self.journal.record(EngineCall::Create {
            handle,
            screen_density,
        });
        handle
    }

    fn destroy(&mut self, handle: ViewerHandle) {
        self.journal.record(EngineCall::Destroy { handle });
    }

    fn init(&mut self, handle: ViewerHandle, context: ContextHandle) -> bool {
        self.journal.record(EngineCall::Init { handle, context });
        true
    }

    fn open(&mut self, handle: ViewerHandle, path: &str) {
        self.command(handle, ViewerCommand::Open { path: path.to_string() });
    }

    fn resize(&mut self, handle: ViewerHandle, width: u32, height: u32) {
        self.command(handle, ViewerCommand::Resize { width, height });
    }

    fn redraw(&mut self, handle: ViewerHandle) -> bool {
        self.journal.record(EngineCall::Redraw { handle });
        if self.frames_left > 0 {
            self.frames_left -= 1;
            true
        } else {
            false
        }
    }

    fn add_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32) {
        self.command(handle, ViewerCommand::AddTouchPoint { id, x, y });
    }

    fn update_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32) {
        self.command(handle, ViewerCommand::UpdateTouchPoint { id, x, y });
    }

    fn remove_touch_point(&mut self, handle: ViewerHandle, id: PointerId) {
        self.command(handle, ViewerCommand::RemoveTouchPoint { id });
    }

    fn select(&mut self, handle: ViewerHandle, x: f32, y: f32) {
        self.command(handle, ViewerCommand::Select { x, y });
    }

    fn fit_all(&mut self, handle: ViewerHandle) {
        self.command(handle, ViewerCommand::FitAll);
        self.frames_left = self.transition_frames;
    }

    fn set_projection(&mut self, handle: ViewerHandle, orientation: Orientation) {
        self.command(handle, ViewerCommand::SetProjection(orientation));
        self.frames_left = self.transition_frames;
    }
}

// ── Message capture ──────────────────────────────────────────────────

/// Attaches a recording sink to the process-wide message log for as long
/// as it lives. Captures are serialized since there is only one log.
#[cfg(test)]
pub(crate) struct MessageCapture {
    lines: Arc<Mutex<Vec<String>>>,
    _serial: MutexGuard<'static, ()>,
}

#[cfg(test)]
impl MessageCapture {
    pub(crate) fn start() -> Self {
        static SERIAL: Mutex<()> = Mutex::new(());
        let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        touchview_core::message_log::attach(Box::new(
            move |severity: touchview_core::Severity, text: &str| {
                sink_lines.lock().unwrap().push(format!("{}: {}", severity, text));
            },
        ));
        Self {
            lines,
            _serial: serial,
        }
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl Drop for MessageCapture {
    fn drop(&mut self) {
        touchview_core::message_log::detach();
    }
}
