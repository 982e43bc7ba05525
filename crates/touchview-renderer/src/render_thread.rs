use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use thiserror::Error;
use touchview_core::message_log::{self, Severity};
use touchview_core::{CommandSink, ViewerCommand, ViewerEngine, ViewerSettings};

use crate::context::{ContextManager, GraphicsDisplay, SurfaceOutcome};
use crate::facade::ViewerFacade;
use crate::negotiator::ConfigNegotiator;
use crate::queue::{CommandQueue, Job, RedrawSignal, RenderState, Work, WorkReceiver};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start render thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Counters reported when the render thread exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Frames drawn.
    pub frames: u64,
    /// Jobs executed, the destroy marker included.
    pub jobs: u64,
    /// Jobs found behind the destroy marker.
    pub discarded: u64,
}

/// The dedicated thread that owns the viewer engine and the graphics context.
///
/// Everything is reached by posting; no method blocks on the render thread
/// except [`RenderThread::shutdown`], which joins it.
#[derive(Debug)]
pub struct RenderThread {
    queue: CommandQueue,
    worker: Option<JoinHandle<RenderStats>>,
}

impl RenderThread {
    /// Move `engine` and `display` onto a new render thread.
    pub fn spawn<E, D>(engine: E, display: D, settings: &ViewerSettings) -> Result<Self, RenderError>
    where
        E: ViewerEngine + 'static,
        D: GraphicsDisplay + 'static,
    {
        let queue = CommandQueue::new();
        let render_loop = RenderLoop {
            work: queue.receiver(),
            redraw: queue.redraw_signal(),
            facade: ViewerFacade::new(engine, settings.screen_density),
            contexts: ContextManager::new(
                display,
                ConfigNegotiator::from_settings(&settings.surface),
            ),
            paused: false,
            stats: RenderStats::default(),
        };

        let worker = thread::Builder::new()
            .name("touchview-render".into())
            .spawn(move || render_loop.run())?;

        Ok(Self {
            queue,
            worker: Some(worker),
        })
    }

    /// A producer handle usable from any thread.
    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn state(&self) -> RenderState {
        self.queue.state()
    }

    pub fn post(&self, command: ViewerCommand) {
        self.queue.post(command);
    }

    pub fn run<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.run(task)
    }

    pub fn request_redraw(&self) {
        self.queue.request_redraw();
    }

    pub fn surface_created(&self) {
        self.queue.push(Job::SurfaceCreated);
    }

    pub fn surface_changed(&self, width: u32, height: u32) {
        self.queue.post(ViewerCommand::Resize { width, height });
        self.queue.request_redraw();
    }

    pub fn pause(&self) {
        self.queue.push(Job::Pause);
    }

    pub fn resume(&self) {
        self.queue.push(Job::Resume);
    }

    /// Post the destroy marker and wait for the thread to release everything.
    pub fn shutdown(mut self) -> RenderStats {
        self.stop()
    }

    fn stop(&mut self) -> RenderStats {
        self.queue.close();
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                log::error!("Render thread panicked");
                RenderStats::default()
            }
            None => RenderStats::default(),
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

struct RenderLoop<E, D> {
    work: WorkReceiver,
    redraw: RedrawSignal,
    facade: ViewerFacade<E>,
    contexts: ContextManager<D>,
    paused: bool,
    stats: RenderStats,
}

impl<E: ViewerEngine, D: GraphicsDisplay> RenderLoop<E, D> {
    fn run(mut self) -> RenderStats {
        log::info!("Render thread started");
        loop {
            let can_draw =
                !self.paused && self.contexts.is_ready() && self.facade.is_initialized();
            match self.work.next_work(self.paused, can_draw) {
                Work::Jobs(jobs) => {
                    if self.run_jobs(jobs) == Flow::Exit {
                        break;
                    }
                }
                Work::Draw => self.guarded("draw", Self::draw),
            }
        }
        self.work.set_state(RenderState::Destroyed);
        log::info!(
            "Render thread stopped: {} frames, {} jobs, {} discarded",
            self.stats.frames,
            self.stats.jobs,
            self.stats.discarded
        );
        self.stats
    }

    fn run_jobs(&mut self, mut jobs: VecDeque<Job>) -> Flow {
        while let Some(job) = jobs.pop_front() {
            self.stats.jobs += 1;
            if let Job::Destroy = job {
                self.stats.discarded += jobs.len() as u64;
                self.guarded("teardown", Self::teardown);
                return Flow::Exit;
            }
            self.guarded("job", |this| this.execute(job));
        }
        Flow::Continue
    }

    fn execute(&mut self, job: Job) {
        match job {
            Job::Command(command) => self.facade.execute(&command),
            Job::Task(task) => task(),
            Job::SurfaceCreated => self.surface_created(),
            Job::Pause => self.pause(),
            Job::Resume => self.resume(),
            Job::Destroy => {}
        }
    }

    /// Run `step`, turning a panic into a message log line.
    fn guarded(&mut self, what: &str, step: impl FnOnce(&mut Self)) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| step(self))) {
            message_log::post_with(
                Severity::Alarm,
                &format!("Render thread {} panicked: {}", what, panic_message(&*payload)),
            );
        }
    }

    fn surface_created(&mut self) {
        match self.contexts.surface_created() {
            Ok(SurfaceOutcome::Created(context)) => {
                if self.facade.init(context) {
                    self.redraw.request();
                }
            }
            Ok(SurfaceOutcome::Reused(context)) => {
                if self.facade.is_initialized() || self.facade.init(context) {
                    self.redraw.request();
                }
            }
            Err(err) => {
                self.facade.invalidate();
                message_log::post_with(
                    Severity::Alarm,
                    &format!("Rendering disabled until a new surface arrives: {}", err),
                );
            }
        }
    }

    fn pause(&mut self) {
        log::debug!("Render thread paused");
        self.paused = true;
        self.contexts.pause();
    }

    fn resume(&mut self) {
        log::debug!("Render thread resumed");
        self.paused = false;
        match self.contexts.resume() {
            Ok(Some(context)) => {
                if self.facade.is_initialized() || self.facade.init(context) {
                    self.redraw.request();
                }
            }
            Ok(None) => log::debug!("Resumed without a context, waiting for a surface"),
            Err(err) => {
                message_log::post_with(Severity::Alarm, &format!("Resume failed: {}", err));
            }
        }
    }

    fn draw(&mut self) {
        self.stats.frames += 1;
        if self.facade.redraw() {
            // Transition still running; keep frames coming.
            self.redraw.request();
        }
    }

    fn teardown(&mut self) {
        self.facade.release();
        self.contexts.release();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
