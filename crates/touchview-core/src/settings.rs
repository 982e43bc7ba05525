use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Renderable-type bit for OpenGL ES 2 contexts.
pub const RENDERABLE_ES2: u32 = 0x0004;

/// Requested surface attributes, in the order they are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceWishlist {
    /// Minimum red channel bits.
    pub red: u32,
    /// Minimum green channel bits.
    pub green: u32,
    /// Minimum blue channel bits.
    pub blue: u32,
    /// Minimum alpha channel bits.
    pub alpha: u32,
    /// Minimum depth buffer bits.
    pub depth: u32,
    /// Minimum stencil buffer bits.
    pub stencil: u32,
    /// Client API bits that must all be supported.
    pub renderable_type: u32,
}

impl Default for SurfaceWishlist {
    fn default() -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 0,
            depth: 24,
            stencil: 8,
            renderable_type: RENDERABLE_ES2,
        }
    }
}

/// Surface negotiation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// What the surface must provide at minimum.
    pub wishlist: SurfaceWishlist,
    /// Depth size to retry with when the wishlist matches nothing.
    /// `None` disables the retry.
    pub depth_fallback: Option<u32>,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            wishlist: SurfaceWishlist::default(),
            depth_fallback: Some(16),
        }
    }
}

/// Tuning parameters for the viewport bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Physical pixels per density-independent pixel.
    pub screen_density: f32,
    /// Tap drift allowance in density-independent pixels.
    pub tap_drift_factor: f32,
    /// Surface negotiation policy.
    pub surface: SurfaceSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            screen_density: 1.0,
            tap_drift_factor: 5.0,
            surface: SurfaceSettings::default(),
        }
    }
}

impl ViewerSettings {
    pub fn with_density(mut self, screen_density: f32) -> Self {
        self.screen_density = screen_density;
        self
    }

    /// Maximum per-axis movement, in pixels, that still counts as a tap.
    pub fn tap_threshold(&self) -> f32 {
        self.tap_drift_factor * self.screen_density
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.screen_density.is_finite() && self.screen_density > 0.0) {
            return Err(SettingsError::Invalid {
                field: "screen_density",
                message: format!("must be positive, got {}", self.screen_density),
            });
        }
        if !(self.tap_drift_factor.is_finite() && self.tap_drift_factor >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "tap_drift_factor",
                message: format!("must not be negative, got {}", self.tap_drift_factor),
            });
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded viewer settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.surface.wishlist.depth, 24);
        assert_eq!(settings.surface.depth_fallback, Some(16));
        assert_eq!(settings.tap_threshold(), 5.0);
        assert_eq!(settings.with_density(2.5).tap_threshold(), 12.5);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings =
            ViewerSettings::from_json(r#"{ "screen_density": 3.0, "surface": { "depth_fallback": null } }"#)
                .unwrap();
        assert_eq!(settings.screen_density, 3.0);
        assert_eq!(settings.tap_drift_factor, 5.0);
        assert_eq!(settings.surface.depth_fallback, None);
        assert_eq!(settings.surface.wishlist.stencil, 8);
    }

    #[test]
    fn test_rejects_bad_density() {
        let err = ViewerSettings::from_json(r#"{ "screen_density": 0.0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "screen_density", .. }));
    }
}
