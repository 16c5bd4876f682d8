//! # Pixel Grid
//!
//! The codec sees an image only through [`PixelGrid`]: a `width × height`
//! array of pixels, each with three 8-bit color planes. An alpha plane, if
//! the underlying buffer has one, is never visited.

use image::{ColorType, DynamicImage, RgbImage, RgbaImage};

use super::error::{CodecError, Result};

/// Number of color planes the codec reads and writes, regardless of alpha.
pub const PLANES: usize = 3;

/// Sample access over an RGB(A) pixel grid.
///
/// `row` indexes `0..height`, `column` indexes `0..width`, `plane` indexes
/// `0..PLANES`. Implementations may panic on out-of-range coordinates; the
/// bit-channel never produces one.
pub trait PixelGrid {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Planes stored per pixel by the underlying buffer (3 or 4).
    fn source_planes(&self) -> usize;

    fn sample(&self, row: u32, column: u32, plane: usize) -> u8;
    fn set_sample(&mut self, row: u32, column: u32, plane: usize, value: u8);

    /// Total coded samples (`width × height × 3`).
    fn sample_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64 * PLANES as u64
    }
}

macro_rules! impl_pixel_grid {
    ($buffer:ty, $planes:expr) => {
        impl PixelGrid for $buffer {
            fn width(&self) -> u32 {
                self.dimensions().0
            }

            fn height(&self) -> u32 {
                self.dimensions().1
            }

            fn source_planes(&self) -> usize {
                $planes
            }

            fn sample(&self, row: u32, column: u32, plane: usize) -> u8 {
                self.get_pixel(column, row).0[plane]
            }

            fn set_sample(&mut self, row: u32, column: u32, plane: usize, value: u8) {
                self.get_pixel_mut(column, row).0[plane] = value;
            }
        }
    };
}

impl_pixel_grid!(RgbImage, 3);
impl_pixel_grid!(RgbaImage, 4);

/// An eligible cover image, owning its pixel buffer.
///
/// Keeps the layout it was loaded with so that saving an RGB image does not
/// silently add an alpha plane, and saving an RGBA image keeps its alpha.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverImage {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl CoverImage {
    /// Take ownership of a decoded image if its layout is eligible.
    ///
    /// # Errors
    /// [`CodecError::IneligibleImage`] for grayscale, gray+alpha and
    /// non-8-bit layouts.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageRgb8(buffer) => Ok(Self::Rgb(buffer)),
            DynamicImage::ImageRgba8(buffer) => Ok(Self::Rgba(buffer)),
            other => Err(CodecError::IneligibleImage {
                layout: layout_name(other.color()),
            }),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Rgb(buffer) => DynamicImage::ImageRgb8(buffer),
            Self::Rgba(buffer) => DynamicImage::ImageRgba8(buffer),
        }
    }
}

impl PixelGrid for CoverImage {
    fn width(&self) -> u32 {
        match self {
            Self::Rgb(b) => PixelGrid::width(b),
            Self::Rgba(b) => PixelGrid::width(b),
        }
    }

    fn height(&self) -> u32 {
        match self {
            Self::Rgb(b) => PixelGrid::height(b),
            Self::Rgba(b) => PixelGrid::height(b),
        }
    }

    fn source_planes(&self) -> usize {
        match self {
            Self::Rgb(b) => b.source_planes(),
            Self::Rgba(b) => b.source_planes(),
        }
    }

    fn sample(&self, row: u32, column: u32, plane: usize) -> u8 {
        match self {
            Self::Rgb(b) => b.sample(row, column, plane),
            Self::Rgba(b) => b.sample(row, column, plane),
        }
    }

    fn set_sample(&mut self, row: u32, column: u32, plane: usize, value: u8) {
        match self {
            Self::Rgb(b) => b.set_sample(row, column, plane, value),
            Self::Rgba(b) => b.set_sample(row, column, plane, value),
        }
    }
}

/// Human-readable name of a color layout, used in eligibility reports.
pub fn layout_name(color: ColorType) -> String {
    format!("{color:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba};

    #[test]
    fn rgba_alpha_plane_is_not_addressed() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 200]));
        for plane in 0..PLANES {
            img.set_sample(1, 0, plane, 9);
        }
        assert_eq!(img.get_pixel(0, 1).0, [9, 9, 9, 200]);
        assert_eq!(img.sample_count(), 12);
    }

    #[test]
    fn row_and_column_map_to_y_and_x() {
        let mut img = RgbImage::new(3, 2);
        img.set_sample(1, 2, 0, 77);
        assert_eq!(img.get_pixel(2, 1).0[0], 77);
    }

    #[test]
    fn grayscale_is_rejected() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        let err = CoverImage::from_dynamic(gray).unwrap_err();
        assert!(matches!(err, CodecError::IneligibleImage { .. }));
    }

    #[test]
    fn layout_survives_round_trip() {
        let rgb = CoverImage::from_dynamic(DynamicImage::new_rgb8(2, 2)).unwrap();
        assert_eq!(rgb.source_planes(), 3);
        assert!(matches!(rgb.into_dynamic(), DynamicImage::ImageRgb8(_)));
    }
}
