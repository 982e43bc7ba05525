use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use touchview_core::{
    CommandSink, Orientation, PointerId, TouchAction, TouchPoint, ViewerCommand, ViewerEngine,
    ViewerSettings,
};
use touchview_gesture::GestureRouter;
use touchview_renderer::{
    CommandQueue, GraphicsDisplay, RenderError, RenderState, RenderStats, RenderThread,
};

/// The UI-facing side of the viewport.
///
/// Every inbound call returns immediately: touch input is routed on the
/// caller's thread and everything that reaches the engine is posted to the
/// render thread. Storage access must already be granted before
/// [`ViewportBridge::open_file`] is called.
#[derive(Debug)]
pub struct ViewportBridge {
    render: RenderThread,
    queue: CommandQueue,
    router: GestureRouter,
}

impl ViewportBridge {
    pub fn start<E, D>(engine: E, display: D, settings: &ViewerSettings) -> Result<Self, RenderError>
    where
        E: ViewerEngine + 'static,
        D: GraphicsDisplay + 'static,
    {
        let render = RenderThread::spawn(engine, display, settings)?;
        let queue = render.queue();
        log::info!(
            "Viewport started (density {}, tap threshold {}px)",
            settings.screen_density,
            settings.tap_threshold()
        );
        Ok(Self {
            render,
            queue,
            router: GestureRouter::from_settings(settings),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn on_surface_created(&self) {
        self.render.surface_created();
    }

    pub fn on_surface_changed(&self, width: u32, height: u32) {
        self.render.surface_changed(width, height);
    }

    /// Fingers still down cannot survive a pause; release them first.
    pub fn on_pause(&mut self) {
        self.router.cancel_all(&self.queue);
        self.render.pause();
    }

    pub fn on_resume(&self) {
        self.render.resume();
    }

    /// Stop the render thread, releasing the viewer and the context.
    pub fn shutdown(self) -> RenderStats {
        self.render.shutdown()
    }

    // ── Input ────────────────────────────────────────────────────────

    pub fn on_touch(&mut self, action: TouchAction, pointer_id: PointerId, x: f32, y: f32) {
        self.router.on_touch(&self.queue, action, pointer_id, x, y);
    }

    pub fn on_touch_move(&mut self, points: &[TouchPoint]) {
        self.router.pointer_move(&self.queue, points);
    }

    // ── Menu commands ────────────────────────────────────────────────

    pub fn open_file(&self, path: &str) {
        self.send(ViewerCommand::Open {
            path: path.to_string(),
        });
    }

    pub fn fit_all(&self) {
        self.send(ViewerCommand::FitAll);
    }

    pub fn set_projection(&self, orientation: Orientation) {
        self.send(ViewerCommand::SetProjection(orientation));
    }

    pub fn request_redraw(&self) {
        self.queue.request_redraw();
    }

    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn state(&self) -> RenderState {
        self.render.state()
    }

    fn send(&self, command: ViewerCommand) {
        self.queue.post(command);
        self.queue.request_redraw();
    }
}

// ── Scripted sessions ────────────────────────────────────────────────

/// One UI event in a scripted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionStep {
    SurfaceCreated,
    SurfaceChanged { width: u32, height: u32 },
    Open { path: String },
    Touch { action: TouchAction, pointer: PointerId, x: f32, y: f32 },
    FitAll,
    Projection { orientation: Orientation },
    Pause,
    Resume,
    Wait { millis: u64 },
}

pub fn parse_session(json: &str) -> Result<Vec<SessionStep>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Open a model, tap it, drag it around and flip through the projections.
pub fn default_session(path: &str) -> Vec<SessionStep> {
    let touch = |action, pointer, x, y| SessionStep::Touch { action, pointer, x, y };
    let mut steps = vec![
        SessionStep::SurfaceCreated,
        SessionStep::SurfaceChanged { width: 1080, height: 1920 },
        SessionStep::Open { path: path.to_string() },
        SessionStep::FitAll,
        touch(TouchAction::Down, 0, 540.0, 960.0),
        touch(TouchAction::Move, 0, 542.0, 961.0),
        touch(TouchAction::Up, 0, 542.0, 961.0),
        touch(TouchAction::Down, 0, 300.0, 900.0),
        touch(TouchAction::Move, 0, 380.0, 940.0),
        touch(TouchAction::Move, 0, 460.0, 980.0),
        touch(TouchAction::Up, 0, 460.0, 980.0),
        SessionStep::Pause,
        SessionStep::Resume,
    ];
    steps.extend(
        Orientation::ALL
            .into_iter()
            .map(|orientation| SessionStep::Projection { orientation }),
    );
    steps.push(SessionStep::Wait { millis: 50 });
    steps
}

pub fn run_session(bridge: &mut ViewportBridge, steps: &[SessionStep]) {
    for step in steps {
        log::debug!("Session step: {:?}", step);
        match step {
            SessionStep::SurfaceCreated => bridge.on_surface_created(),
            SessionStep::SurfaceChanged { width, height } => {
                bridge.on_surface_changed(*width, *height)
            }
            SessionStep::Open { path } => bridge.open_file(path),
            SessionStep::Touch { action, pointer, x, y } => bridge.on_touch(*action, *pointer, *x, *y),
            SessionStep::FitAll => bridge.fit_all(),
            SessionStep::Projection { orientation } => bridge.set_projection(*orientation),
            SessionStep::Pause => bridge.on_pause(),
            SessionStep::Resume => bridge.on_resume(),
            SessionStep::Wait { millis } => thread::sleep(Duration::from_millis(*millis)),
        }
    }
}
