//! # touchview Core
//!
//! Shared vocabulary of the touchview viewport bridge: touch points and
//! actions, the closed viewer command set, the opaque engine interface,
//! viewer settings and the process-wide message log.
//!
//! Nothing in this crate spawns threads; it only defines what the gesture
//! router produces and what the render thread consumes.

pub mod touch;
pub mod commands;
pub mod engine;
pub mod message_log;
pub mod settings;

pub use touch::{PointerId, Position, TouchAction, TouchPoint};
pub use commands::{CommandSink, Orientation, ViewerCommand};
pub use engine::{ContextHandle, ViewerEngine, ViewerHandle};
pub use message_log::{MessageLog, MessageSink, Severity};
pub use settings::{SettingsError, SurfaceSettings, SurfaceWishlist, ViewerSettings};
