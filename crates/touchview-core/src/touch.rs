use serde::{Deserialize, Serialize};

/// Identifier the input system assigns to one finger for the life of its contact.
pub type PointerId = i32;

/// A screen position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the left edge.
    pub x: f32,
    /// Vertical offset from the top edge.
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// True when `other` lies further than `threshold` from `self` along either axis.
    pub fn drifted_beyond(&self, other: &Position, threshold: f32) -> bool {
        (self.x - other.x).abs() > threshold || (self.y - other.y).abs() > threshold
    }
}

/// One active contact on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Which finger.
    pub pointer_id: PointerId,
    /// Where it currently is.
    pub position: Position,
}

impl TouchPoint {
    pub fn new(pointer_id: PointerId, x: f32, y: f32) -> Self {
        Self {
            pointer_id,
            position: Position::new(x, y),
        }
    }
}

/// Raw touch action as reported by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchAction {
    /// First finger or an additional finger touched the surface.
    Down,
    /// One or more fingers moved.
    Move,
    /// A finger was lifted.
    Up,
    /// The system took the gesture away (e.g. the window lost focus).
    Cancel,
}
