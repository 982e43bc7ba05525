use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::touch::PointerId;

/// One of the six axis-aligned camera projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    XPos,
    YPos,
    ZPos,
    XNeg,
    YNeg,
    ZNeg,
}

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::XPos,
        Orientation::YPos,
        Orientation::ZPos,
        Orientation::XNeg,
        Orientation::YNeg,
        Orientation::ZNeg,
    ];

    /// Short label, e.g. `+X`.
    pub fn label(&self) -> &'static str {
        match self {
            Orientation::XPos => "+X",
            Orientation::YPos => "+Y",
            Orientation::ZPos => "+Z",
            Orientation::XNeg => "-X",
            Orientation::YNeg => "-Y",
            Orientation::ZNeg => "-Z",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown projection '{0}', expected one of +X, +Y, +Z, -X, -Y, -Z")]
pub struct ParseOrientationError(pub String);

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('\u{2212}', "-");
        match normalized.as_str() {
            "+x" | "x" | "xpos" => Ok(Orientation::XPos),
            "+y" | "y" | "ypos" => Ok(Orientation::YPos),
            "+z" | "z" | "zpos" => Ok(Orientation::ZPos),
            "-x" | "xneg" => Ok(Orientation::XNeg),
            "-y" | "yneg" => Ok(Orientation::YNeg),
            "-z" | "zneg" => Ok(Orientation::ZNeg),
            _ => Err(ParseOrientationError(s.to_string())),
        }
    }
}

/// The closed set of commands the viewer engine accepts.
///
/// Every variant is executed on the render thread; producers only ever
/// build and post them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewerCommand {
    Open { path: String },
    Resize { width: u32, height: u32 },
    AddTouchPoint { id: PointerId, x: f32, y: f32 },
    UpdateTouchPoint { id: PointerId, x: f32, y: f32 },
    RemoveTouchPoint { id: PointerId },
    Select { x: f32, y: f32 },
    FitAll,
    SetProjection(Orientation),
}

impl ViewerCommand {
    /// Human-readable description for diagnostics.
    pub fn description(&self) -> &str {
        match self {
            ViewerCommand::Open { .. } => "Open model",
            ViewerCommand::Resize { .. } => "Resize viewport",
            ViewerCommand::AddTouchPoint { .. } => "Add touch point",
            ViewerCommand::UpdateTouchPoint { .. } => "Update touch point",
            ViewerCommand::RemoveTouchPoint { .. } => "Remove touch point",
            ViewerCommand::Select { .. } => "Select",
            ViewerCommand::FitAll => "Fit all",
            ViewerCommand::SetProjection(_) => "Set projection",
        }
    }
}

/// Destination for viewer commands produced off the render thread.
///
/// Implementations must never block the caller beyond a short lock hold.
pub trait CommandSink {
    /// Queue a command; ordering across calls is preserved.
    fn post(&self, command: ViewerCommand);
    /// Mark the viewport dirty so the next idle point draws a frame.
    fn request_redraw(&self);
}

impl<T: CommandSink + ?Sized> CommandSink for &T {
    fn post(&self, command: ViewerCommand) {
        (**self).post(command);
    }

    fn request_redraw(&self) {
        (**self).request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_parse() {
        assert_eq!("+X".parse::<Orientation>(), Ok(Orientation::XPos));
        assert_eq!("-z".parse::<Orientation>(), Ok(Orientation::ZNeg));
        assert_eq!(" yneg ".parse::<Orientation>(), Ok(Orientation::YNeg));
        assert!("w".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_orientation_label_roundtrip() {
        for orientation in Orientation::ALL {
            assert_eq!(orientation.label().parse::<Orientation>(), Ok(orientation));
        }
    }
}
