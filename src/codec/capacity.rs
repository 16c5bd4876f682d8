//! Eligibility and capacity of a cover image.
//!
//! An image is eligible when its pixels resolve to three 8-bit color planes
//! (RGB, or RGBA with the alpha plane ignored). Capacity is the advisory byte
//! budget for a whole frame, header included:
//!
//! ```text
//! capacity = floor(width × height × 3 × 8 × embed_ratio / 8)
//! ```
//!
//! where `embed_ratio` is the fraction of the eight bit-depth levels in use
//! (`0.125` is classic single-LSB coding).

use image::{ColorType, DynamicImage};

use super::channel::MAX_DEPTH;
use super::grid::{layout_name, PixelGrid, PLANES};

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible { layout: String },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Decide whether `image` can be coded. Pure; never mutates the image.
pub fn validate(image: &DynamicImage) -> Eligibility {
    match image.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => Eligibility::Eligible,
        other => Eligibility::Ineligible {
            layout: layout_name(other),
        },
    }
}

/// Advisory frame capacity in bytes.
pub fn capacity(width: u32, height: u32, embed_ratio: f64) -> u64 {
    let samples = width as u64 * height as u64 * PLANES as u64;
    let ratio = embed_ratio.clamp(0.0, 1.0);
    (samples as f64 * MAX_DEPTH as f64 * ratio / 8.0).floor() as u64
}

/// [`capacity`] of an already loaded grid.
pub fn grid_capacity<G: PixelGrid + ?Sized>(grid: &G, embed_ratio: f64) -> u64 {
    capacity(grid.width(), grid.height(), embed_ratio)
}

/// Whether a frame of `header_len` + `payload_len` bytes fits `capacity`.
pub fn can_hold_frame(capacity: u64, header_len: u64, payload_len: u64) -> bool {
    header_len
        .checked_add(payload_len)
        .map_or(false, |total| total <= capacity)
}

/// Bit-depth levels the channel may touch for `embed_ratio`.
pub fn depth_levels(embed_ratio: f64) -> u8 {
    let levels = (embed_ratio.clamp(0.0, 1.0) * MAX_DEPTH as f64).ceil() as u8;
    levels.clamp(1, MAX_DEPTH)
}
