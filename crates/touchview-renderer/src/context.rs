use thiserror::Error;
use touchview_core::message_log::{self, Severity};
use touchview_core::ContextHandle;

use crate::negotiator::{ConfigNegotiator, NegotiationError};
use crate::surface_config::SurfaceConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context creation failed with error 0x{code:04X}")]
    CreateFailed { code: u32 },

    #[error("Attaching the surface to the context failed with error 0x{code:04X}")]
    AttachFailed { code: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// The graphics driver as seen from the render thread.
///
/// Moved onto the render thread at spawn; never shared.
pub trait GraphicsDisplay: Send {
    /// Every configuration the hardware offers, in its enumeration order.
    fn configs(&self) -> Vec<SurfaceConfig>;
    fn create_context(&mut self, config: &SurfaceConfig) -> Result<ContextHandle, ContextError>;
    fn destroy_context(&mut self, context: ContextHandle);
    /// Make `context` current against the window surface.
    fn attach_surface(&mut self, context: ContextHandle) -> Result<(), ContextError>;
    fn detach_surface(&mut self, context: ContextHandle);

    /// Whether the driver dropped the context behind our back.
    fn is_context_lost(&self, _context: ContextHandle) -> bool {
        false
    }
}

/// What a surface-created event did to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOutcome {
    /// A new context exists; the viewer must be (re)initialized on it.
    Created(ContextHandle),
    /// The live context was compatible and has been reattached.
    Reused(ContextHandle),
}

#[derive(Debug, Clone, Copy)]
struct LiveContext {
    handle: ContextHandle,
    config: SurfaceConfig,
    attached: bool,
}

/// Owns the graphics context on the render thread.
#[derive(Debug)]
pub struct ContextManager<D> {
    display: D,
    negotiator: ConfigNegotiator,
    live: Option<LiveContext>,
}

impl<D: GraphicsDisplay> ContextManager<D> {
    pub fn new(display: D, negotiator: ConfigNegotiator) -> Self {
        Self {
            display,
            negotiator,
            live: None,
        }
    }

    pub fn context(&self) -> Option<ContextHandle> {
        self.live.map(|live| live.handle)
    }

    pub fn config(&self) -> Option<SurfaceConfig> {
        self.live.map(|live| live.config)
    }

    /// A context exists and is attached to a surface.
    pub fn is_ready(&self) -> bool {
        self.live.map_or(false, |live| live.attached)
    }

    /// Handle a new window surface.
    ///
    /// Keeps the live context when the negotiated configuration is unchanged
    /// and the driver still has it; otherwise replaces it. A negotiation or
    /// creation error leaves no context behind.
    pub fn surface_created(&mut self) -> Result<SurfaceOutcome, SurfaceError> {
        let config = match self.negotiator.choose(&self.display.configs()) {
            Ok(config) => config,
            Err(err) => {
                self.release();
                return Err(err.into());
            }
        };

        if let Some(live) = self.live {
            if live.config == config && !self.display.is_context_lost(live.handle) {
                if !live.attached {
                    self.attach(live.handle)?;
                }
                log::debug!("Reusing {} for new surface", live.handle);
                return Ok(SurfaceOutcome::Reused(live.handle));
            }
            log::info!("Surface configuration changed, recreating context");
            self.release();
        }

        let handle = self.display.create_context(&config).map_err(|err| {
            message_log::post_with(Severity::Fail, &err.to_string());
            err
        })?;
        log::info!("Created {} with {}", handle, config);
        self.live = Some(LiveContext {
            handle,
            config,
            attached: false,
        });
        self.attach(handle)?;
        Ok(SurfaceOutcome::Created(handle))
    }

    /// Detach from the surface but keep the context alive.
    pub fn pause(&mut self) {
        if let Some(live) = self.live.as_mut() {
            if live.attached {
                self.display.detach_surface(live.handle);
                live.attached = false;
            }
        }
    }

    /// Reattach the preserved context, if there is one.
    pub fn resume(&mut self) -> Result<Option<ContextHandle>, ContextError> {
        match self.live {
            Some(live) if !live.attached => {
                self.attach(live.handle)?;
                Ok(Some(live.handle))
            }
            Some(live) => Ok(Some(live.handle)),
            None => Ok(None),
        }
    }

    /// Detach and destroy the context.
    pub fn release(&mut self) {
        if let Some(live) = self.live.take() {
            if live.attached {
                self.display.detach_surface(live.handle);
            }
            self.display.destroy_context(live.handle);
            log::debug!("Destroyed {}", live.handle);
        }
    }

    fn attach(&mut self, handle: ContextHandle) -> Result<(), ContextError> {
        match self.display.attach_surface(handle) {
            Ok(()) => {
                if let Some(live) = self.live.as_mut() {
                    live.attached = true;
                }
                Ok(())
            }
            Err(err) => {
                message_log::post_with(Severity::Alarm, &err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{DisplayCall, HeadlessDisplay, MessageCapture};
    use touchview_core::SurfaceSettings;

    fn manager(display: HeadlessDisplay) -> ContextManager<HeadlessDisplay> {
        ContextManager::new(display, ConfigNegotiator::from_settings(&SurfaceSettings::default()))
    }

    #[test]
    fn test_create_attaches() {
        let display = HeadlessDisplay::phone();
        let journal = display.journal();
        let mut contexts = manager(display);

        let outcome = contexts.surface_created().unwrap();
        let SurfaceOutcome::Created(handle) = outcome else {
            panic!("expected a fresh context, got {:?}", outcome);
        };
        assert!(contexts.is_ready());
        assert_eq!(contexts.config(), Some(SurfaceConfig::rgb888(24, 8)));
        assert_eq!(
            journal.entries(),
            vec![
                DisplayCall::CreateContext(handle, SurfaceConfig::rgb888(24, 8)),
                DisplayCall::Attach(handle),
            ]
        );
    }

    #[test]
    fn test_pause_resume_keeps_context() {
        let display = HeadlessDisplay::phone();
        let journal = display.journal();
        let mut contexts = manager(display);

        let SurfaceOutcome::Created(handle) = contexts.surface_created().unwrap() else {
            panic!("expected a fresh context");
        };
        contexts.pause();
        assert!(!contexts.is_ready());
        assert_eq!(contexts.resume(), Ok(Some(handle)));
        assert!(contexts.is_ready());

        // Surface recreated with the same configuration: reuse.
        contexts.pause();
        assert_eq!(contexts.surface_created(), Ok(SurfaceOutcome::Reused(handle)));
        assert_eq!(journal.count(|call| matches!(call, DisplayCall::DestroyContext(_))), 0);
        assert_eq!(journal.count(|call| matches!(call, DisplayCall::CreateContext(..))), 1);
    }

    #[test]
    fn test_lost_context_is_replaced() {
        let display = HeadlessDisplay::phone();
        let script = display.script();
        let journal = display.journal();
        let mut contexts = manager(display);

        let SurfaceOutcome::Created(first) = contexts.surface_created().unwrap() else {
            panic!("expected a fresh context");
        };
        script.lose_contexts();
        let SurfaceOutcome::Created(second) = contexts.surface_created().unwrap() else {
            panic!("expected a replacement context");
        };
        assert_ne!(first, second);
        assert!(journal.entries().contains(&DisplayCall::DestroyContext(first)));
    }

    #[test]
    fn test_create_failure_leaves_no_context() {
        let display = HeadlessDisplay::phone();
        display.script().fail_next_create(0x3003);
        let mut contexts = manager(display);

        assert_eq!(
            contexts.surface_created(),
            Err(SurfaceError::Context(ContextError::CreateFailed { code: 0x3003 }))
        );
        assert!(contexts.context().is_none());
        assert!(!contexts.is_ready());

        // The next surface gets a fresh attempt.
        assert!(matches!(contexts.surface_created(), Ok(SurfaceOutcome::Created(_))));
    }

    #[test]
    fn test_create_failure_logs_driver_code() {
        let messages = MessageCapture::start();
        let display = HeadlessDisplay::phone();
        display.script().fail_next_create(0x3003);
        let mut contexts = manager(display);

        assert!(contexts.surface_created().is_err());
        assert!(messages.contains("fail: Context creation failed with error 0x3003"));
    }

    #[test]
    fn test_changed_config_recreates_context() {
        let display = HeadlessDisplay::phone();
        let script = display.script();
        let journal = display.journal();
        let mut contexts = manager(display);

        let SurfaceOutcome::Created(first) = contexts.surface_created().unwrap() else {
            panic!("expected a fresh context");
        };
        script.offer_configs(vec![SurfaceConfig::rgb888(24, 8).with_alpha(8)]);
        let SurfaceOutcome::Created(second) = contexts.surface_created().unwrap() else {
            panic!("expected a replacement context");
        };

        assert_ne!(first, second);
        assert_eq!(contexts.config(), Some(SurfaceConfig::rgb888(24, 8).with_alpha(8)));
        assert_eq!(
            journal.entries()[2..],
            [
                DisplayCall::Detach(first),
                DisplayCall::DestroyContext(first),
                DisplayCall::CreateContext(second, SurfaceConfig::rgb888(24, 8).with_alpha(8)),
                DisplayCall::Attach(second),
            ]
        );
    }

    #[test]
    fn test_negotiation_failure() {
        let mut contexts = manager(HeadlessDisplay::new(vec![SurfaceConfig::rgb565(0, 0)]));
        assert!(matches!(
            contexts.surface_created(),
            Err(SurfaceError::Negotiation(_))
        ));
        assert!(contexts.context().is_none());
    }

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(
            ContextError::CreateFailed { code: 0x3005 }.to_string(),
            "Context creation failed with error 0x3005"
        );
    }
}
