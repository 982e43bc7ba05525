use touchview_core::Position;

/// A tentative single-finger tap.
///
/// The drift check is always made against the point where the finger first
/// came down; the select position follows the finger while it stays inside
/// the allowance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionCandidate {
    origin: Position,
    current: Position,
}

impl SelectionCandidate {
    pub fn new(at: Position) -> Self {
        Self {
            origin: at,
            current: at,
        }
    }

    /// Follow the finger to `to`. Returns `false` once the finger has left
    /// the tap allowance, after which the candidate must be dropped.
    pub fn track(&mut self, to: Position, threshold: f32) -> bool {
        if self.origin.drifted_beyond(&to, threshold) {
            return false;
        }
        self.current = to;
        true
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Where a select would land if the finger lifted now.
    pub fn position(&self) -> Position {
        self.current
    }
}
