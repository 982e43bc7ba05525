use thiserror::Error;
use touchview_core::message_log::{self, Severity};
use touchview_core::{SurfaceSettings, SurfaceWishlist};

use crate::surface_config::{describe_wishlist, SurfaceConfig};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("No surface configuration among {offered} candidates matches [{wishlist}]")]
    NoMatchingConfig { offered: usize, wishlist: String },
}

/// Picks the surface configuration to create the context with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigNegotiator {
    wishlist: SurfaceWishlist,
    depth_fallback: Option<u32>,
}

impl ConfigNegotiator {
    pub fn new(wishlist: SurfaceWishlist, depth_fallback: Option<u32>) -> Self {
        Self {
            wishlist,
            depth_fallback,
        }
    }

    pub fn from_settings(settings: &SurfaceSettings) -> Self {
        Self::new(settings.wishlist, settings.depth_fallback)
    }

    pub fn wishlist(&self) -> &SurfaceWishlist {
        &self.wishlist
    }

    /// Match the full wishlist, then retry once with the depth relaxed.
    ///
    /// On failure the wishlist is dumped to the message log; the caller is
    /// expected to carry on without a context.
    pub fn choose(&self, candidates: &[SurfaceConfig]) -> Result<SurfaceConfig, NegotiationError> {
        if let Some(config) = best_match(&self.wishlist, candidates) {
            log::debug!("Surface config chosen: {}", config);
            return Ok(config);
        }

        if let Some(depth) = self.depth_fallback.filter(|&depth| depth != self.wishlist.depth) {
            log::info!(
                "No surface config with {}-bit depth, retrying with {}-bit",
                self.wishlist.depth,
                depth
            );
            let relaxed = SurfaceWishlist {
                depth,
                ..self.wishlist
            };
            if let Some(config) = best_match(&relaxed, candidates) {
                log::debug!("Surface config chosen after fallback: {}", config);
                return Ok(config);
            }
        }

        let error = NegotiationError::NoMatchingConfig {
            offered: candidates.len(),
            wishlist: describe_wishlist(&self.wishlist),
        };
        message_log::post_with(Severity::Fail, &error.to_string());
        Err(error)
    }
}

/// The matching candidate with the least excess, first one wins ties.
fn best_match(wishlist: &SurfaceWishlist, candidates: &[SurfaceConfig]) -> Option<SurfaceConfig> {
    candidates
        .iter()
        .filter(|config| config.satisfies(wishlist))
        .min_by_key(|config| config.excess(wishlist))
        .copied()
}
