use std::fmt;

use serde::{Deserialize, Serialize};
use touchview_core::SurfaceWishlist;

pub use touchview_core::settings::RENDERABLE_ES2;

/// Renderable-type bit for OpenGL ES 3 contexts.
pub const RENDERABLE_ES3: u32 = 0x0040;

/// One attribute of a surface configuration, in wishlist rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigAttribute {
    RedSize,
    GreenSize,
    BlueSize,
    AlphaSize,
    DepthSize,
    StencilSize,
    RenderableType,
}

impl ConfigAttribute {
    pub const RANKED: [ConfigAttribute; 7] = [
        ConfigAttribute::RedSize,
        ConfigAttribute::GreenSize,
        ConfigAttribute::BlueSize,
        ConfigAttribute::AlphaSize,
        ConfigAttribute::DepthSize,
        ConfigAttribute::StencilSize,
        ConfigAttribute::RenderableType,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfigAttribute::RedSize => "RED_SIZE",
            ConfigAttribute::GreenSize => "GREEN_SIZE",
            ConfigAttribute::BlueSize => "BLUE_SIZE",
            ConfigAttribute::AlphaSize => "ALPHA_SIZE",
            ConfigAttribute::DepthSize => "DEPTH_SIZE",
            ConfigAttribute::StencilSize => "STENCIL_SIZE",
            ConfigAttribute::RenderableType => "RENDERABLE_TYPE",
        }
    }

    /// Sizes are minimums; the renderable type is a bitmask.
    pub fn is_mask(&self) -> bool {
        matches!(self, ConfigAttribute::RenderableType)
    }

    pub fn requested(&self, wishlist: &SurfaceWishlist) -> u32 {
        match self {
            ConfigAttribute::RedSize => wishlist.red,
            ConfigAttribute::GreenSize => wishlist.green,
            ConfigAttribute::BlueSize => wishlist.blue,
            ConfigAttribute::AlphaSize => wishlist.alpha,
            ConfigAttribute::DepthSize => wishlist.depth,
            ConfigAttribute::StencilSize => wishlist.stencil,
            ConfigAttribute::RenderableType => wishlist.renderable_type,
        }
    }
}

/// A surface/context configuration offered by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Red channel bits.
    pub red: u32,
    /// Green channel bits.
    pub green: u32,
    /// Blue channel bits.
    pub blue: u32,
    /// Alpha channel bits.
    pub alpha: u32,
    /// Depth buffer bits.
    pub depth: u32,
    /// Stencil buffer bits.
    pub stencil: u32,
    /// Supported client API bits.
    pub renderable_type: u32,
}

impl SurfaceConfig {
    pub fn rgb888(depth: u32, stencil: u32) -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 0,
            depth,
            stencil,
            renderable_type: RENDERABLE_ES2,
        }
    }

    pub fn rgb565(depth: u32, stencil: u32) -> Self {
        Self {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth,
            stencil,
            renderable_type: RENDERABLE_ES2,
        }
    }

    pub fn with_alpha(mut self, alpha: u32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_renderable_type(mut self, renderable_type: u32) -> Self {
        self.renderable_type = renderable_type;
        self
    }

    pub fn get(&self, attribute: ConfigAttribute) -> u32 {
        match attribute {
            ConfigAttribute::RedSize => self.red,
            ConfigAttribute::GreenSize => self.green,
            ConfigAttribute::BlueSize => self.blue,
            ConfigAttribute::AlphaSize => self.alpha,
            ConfigAttribute::DepthSize => self.depth,
            ConfigAttribute::StencilSize => self.stencil,
            ConfigAttribute::RenderableType => self.renderable_type,
        }
    }

    /// Whether every requested attribute is met.
    pub fn satisfies(&self, wishlist: &SurfaceWishlist) -> bool {
        ConfigAttribute::RANKED.iter().all(|&attribute| {
            let requested = attribute.requested(wishlist);
            let offered = self.get(attribute);
            if attribute.is_mask() {
                offered & requested == requested
            } else {
                offered >= requested
            }
        })
    }

    /// Bits offered beyond what was asked for, per size attribute in rank order.
    pub fn excess(&self, wishlist: &SurfaceWishlist) -> Vec<u32> {
        ConfigAttribute::RANKED
            .iter()
            .filter(|attribute| !attribute.is_mask())
            .map(|&attribute| self.get(attribute).saturating_sub(attribute.requested(wishlist)))
            .collect()
    }
}

impl fmt::Display for SurfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}G{}B{}A{} D{} S{} type=0x{:X}",
            self.red, self.green, self.blue, self.alpha, self.depth, self.stencil, self.renderable_type
        )
    }
}

/// `NAME = value` dump of a wishlist, for diagnostics.
pub fn describe_wishlist(wishlist: &SurfaceWishlist) -> String {
    ConfigAttribute::RANKED
        .iter()
        .map(|attribute| {
            let value = attribute.requested(wishlist);
            if attribute.is_mask() {
                format!("{} = 0x{:X}", attribute.name(), value)
            } else {
                format!("{} = {}", attribute.name(), value)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
