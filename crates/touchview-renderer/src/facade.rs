use touchview_core::{ContextHandle, ViewerCommand, ViewerEngine, ViewerHandle};

/// The render thread's only way into the engine.
///
/// Every call is a no-op until an engine instance exists, and drawing
/// additionally needs the instance to have been bound to a context.
#[derive(Debug)]
pub struct ViewerFacade<E> {
    engine: E,
    handle: Option<ViewerHandle>,
    initialized: bool,
    screen_density: f32,
}

impl<E: ViewerEngine> ViewerFacade<E> {
    pub fn new(engine: E, screen_density: f32) -> Self {
        Self {
            engine,
            handle: None,
            initialized: false,
            screen_density,
        }
    }

    pub fn handle(&self) -> Option<ViewerHandle> {
        self.handle
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Bind the engine to `context`, creating the instance on first use.
    pub fn init(&mut self, context: ContextHandle) -> bool {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = self.engine.create(self.screen_density);
                log::info!("Created {} (density {})", handle, self.screen_density);
                self.handle = Some(handle);
                handle
            }
        };
        self.initialized = self.engine.init(handle, context);
        if !self.initialized {
            log::warn!("{} refused {}", handle, context);
        }
        self.initialized
    }

    /// The context the engine was bound to is gone.
    pub fn invalidate(&mut self) {
        self.initialized = false;
    }

    pub fn execute(&mut self, command: &ViewerCommand) {
        let Some(handle) = self.handle else {
            log::trace!("{} skipped, no viewer", command.description());
            return;
        };
        let engine = &mut self.engine;
        match command {
            ViewerCommand::Open { path } => {
                log::info!("Opening {}", path);
                engine.open(handle, path);
            }
            ViewerCommand::Resize { width, height } => engine.resize(handle, *width, *height),
            ViewerCommand::AddTouchPoint { id, x, y } => engine.add_touch_point(handle, *id, *x, *y),
            ViewerCommand::UpdateTouchPoint { id, x, y } => {
                engine.update_touch_point(handle, *id, *x, *y)
            }
            ViewerCommand::RemoveTouchPoint { id } => engine.remove_touch_point(handle, *id),
            ViewerCommand::Select { x, y } => engine.select(handle, *x, *y),
            ViewerCommand::FitAll => engine.fit_all(handle),
            ViewerCommand::SetProjection(orientation) => engine.set_projection(handle, *orientation),
        }
    }

    /// Draw one frame. Returns whether the engine wants another one.
    pub fn redraw(&mut self) -> bool {
        match self.handle {
            Some(handle) if self.initialized => self.engine.redraw(handle),
            _ => false,
        }
    }

    /// Destroy the engine instance.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.destroy(handle);
            log::info!("Destroyed {}", handle);
        }
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{EngineCall, RecordingEngine};
    use touchview_core::Orientation;

    #[test]
    fn test_commands_without_handle_are_noops() {
        let engine = RecordingEngine::new();
        let journal = engine.journal();
        let mut facade = ViewerFacade::new(engine, 2.0);

        facade.execute(&ViewerCommand::Open { path: "/sdcard/model.brep".into() });
        facade.execute(&ViewerCommand::FitAll);
        assert!(!facade.redraw());
        facade.release();

        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_init_creates_once() {
        let engine = RecordingEngine::new();
        let journal = engine.journal();
        let mut facade = ViewerFacade::new(engine, 2.0);

        assert!(facade.init(ContextHandle::new()));
        let handle = facade.handle().unwrap();
        facade.invalidate();
        assert!(facade.init(ContextHandle::new()));

        assert_eq!(facade.handle(), Some(handle));
        assert_eq!(journal.count(|call| matches!(call, EngineCall::Create { .. })), 1);
        assert_eq!(journal.count(|call| matches!(call, EngineCall::Init { .. })), 2);
    }

    #[test]
    fn test_redraw_needs_initialized_viewer() {
        let engine = RecordingEngine::new();
        let journal = engine.journal();
        let mut facade = ViewerFacade::new(engine, 1.0);

        facade.init(ContextHandle::new());
        facade.invalidate();
        assert!(!facade.redraw());
        // Commands still reach an uninitialized engine.
        facade.execute(&ViewerCommand::SetProjection(Orientation::ZNeg));

        assert_eq!(journal.count(|call| matches!(call, EngineCall::Redraw { .. })), 0);
        assert_eq!(
            journal.entries().last(),
            Some(&EngineCall::Command {
                handle: facade.handle().unwrap(),
                command: ViewerCommand::SetProjection(Orientation::ZNeg),
            })
        );
    }
}
