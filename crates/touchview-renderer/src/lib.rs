//! # touchview Renderer
//!
//! The render side of the viewport bridge: a dedicated thread that owns the
//! viewer engine and the graphics context, fed by a FIFO command queue and
//! drawing only when something asked for a frame.
//!
//! Surface setup negotiates a configuration from what the display offers
//! and keeps the resulting context alive across pause/resume.

pub mod surface_config;
pub mod negotiator;
pub mod context;
pub mod facade;
pub mod queue;
pub mod render_thread;
pub mod headless;

pub use surface_config::{ConfigAttribute, SurfaceConfig};
pub use negotiator::{ConfigNegotiator, NegotiationError};
pub use context::{ContextError, ContextManager, GraphicsDisplay, SurfaceError, SurfaceOutcome};
pub use facade::ViewerFacade;
pub use queue::{CommandQueue, RedrawSignal, RenderState, Task};
pub use render_thread::{RenderError, RenderStats, RenderThread};
