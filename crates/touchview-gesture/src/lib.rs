//! # touchview Gesture
//!
//! Maps raw multi-touch input from the UI thread onto the engine's
//! per-pointer touch commands, and recognizes strict single-finger taps
//! as selections.

pub mod router;
pub mod selection;

pub use router::GestureRouter;
pub use selection::SelectionCandidate;
