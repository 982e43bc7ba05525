use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::Orientation;
use crate::touch::PointerId;

/// Identity of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewerHandle(Uuid);

impl ViewerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for ViewerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// Identity of one graphics context created by the display driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextHandle(Uuid);

impl ContextHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

/// The opaque native viewer engine.
///
/// An implementation is moved onto the render thread when the thread is
/// spawned and is never touched from anywhere else, so it only needs to be
/// `Send`. Every method receives the handle returned by [`ViewerEngine::create`].
pub trait ViewerEngine: Send {
    /// Allocate a new engine instance for a screen of the given density.
    fn create(&mut self, screen_density: f32) -> ViewerHandle;
    /// Release an engine instance.
    fn destroy(&mut self, handle: ViewerHandle);
    /// Let the engine take ownership of the context current on this thread.
    /// Returns `false` when the engine could not bind to it.
    fn init(&mut self, handle: ViewerHandle, context: ContextHandle) -> bool;

    fn open(&mut self, handle: ViewerHandle, path: &str);
    fn resize(&mut self, handle: ViewerHandle, width: u32, height: u32);
    /// Draw one frame. Returns `true` when the engine wants another frame
    /// (e.g. a camera transition is still running).
    fn redraw(&mut self, handle: ViewerHandle) -> bool;

    fn add_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32);
    fn update_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32);
    fn remove_touch_point(&mut self, handle: ViewerHandle, id: PointerId);
    fn select(&mut self, handle: ViewerHandle, x: f32, y: f32);
    fn fit_all(&mut self, handle: ViewerHandle);
    fn set_projection(&mut self, handle: ViewerHandle, orientation: Orientation);
}

impl<E: ViewerEngine + ?Sized> ViewerEngine for Box<E> {
    fn create(&mut self, screen_density: f32) -> ViewerHandle {
        (**self).create(screen_density)
    }

    fn destroy(&mut self, handle: ViewerHandle) {
        (**self).destroy(handle);
    }

    fn init(&mut self, handle: ViewerHandle, context: ContextHandle) -> bool {
        (**self).init(handle, context)
    }

    fn open(&mut self, handle: ViewerHandle, path: &str) {
        (**self).open(handle, path);
    }

    fn resize(&mut self, handle: ViewerHandle, width: u32, height: u32) {
        (**self).resize(handle, width, height);
    }

    fn redraw(&mut self, handle: ViewerHandle) -> bool {
        (**self).redraw(handle)
    }

    fn add_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32) {
        (**self).add_touch_point(handle, id, x, y);
    }

    fn update_touch_point(&mut self, handle: ViewerHandle, id: PointerId, x: f32, y: f32) {
        (**self).update_touch_point(handle, id, x, y);
    }

    fn remove_touch_point(&mut self, handle: ViewerHandle, id: PointerId) {
        (**self).remove_touch_point(handle, id);
    }

    fn select(&mut self, handle: ViewerHandle, x: f32, y: f32) {
        (**self).select(handle, x, y);
    }

    fn fit_all(&mut self, handle: ViewerHandle) {
        (**self).fit_all(handle);
    }

    fn set_projection(&mut self, handle: ViewerHandle, orientation: Orientation) {
        (**self).set_projection(handle, orientation);
    }
}
