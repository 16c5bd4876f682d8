//! # LSB Codec
//!
//! Embeds a file into the color samples of an RGB(A) image and finds it again.
//!
//! ## Modules
//!
//! - [`grid`]: pixel access the codec works through
//! - [`channel`]: the bit-channel cursor, reader and writer
//! - [`capacity`]: eligibility and capacity
//! - [`frame`]: the fixed-grammar header
//! - [`transfer`]: chunked payload streaming
//! - [`session`]: decode/encode state machines
//!
//! ## Example
//! ```ignore
//! let config = CodecConfig::default();
//! let cover = CoverImage::from_dynamic(image::open("cover.png")?)?;
//! let header = FrameHeader::file("notes.txt", data.len() as u64);
//! let (coded, _) = codec::embed(&cover, &mut data.as_slice(), &header, &config)?;
//!
//! let mut out = Vec::new();
//! let (header, n) = codec::extract(&coded, &mut out, &config)?;
//! ```

pub mod capacity;
pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod grid;
pub mod session;
pub mod transfer;

use std::io::{Read, Write};

pub use capacity::{can_hold_frame, capacity, depth_levels, grid_capacity, validate, Eligibility};
pub use config::{CodecConfig, FrameLayout};
pub use error::{CodecError, Field, Result};
pub use frame::{Detection, FrameHeader, PayloadKind};
pub use grid::{CoverImage, PixelGrid};
pub use session::{Decoder, Encoder, FrameSummary, SessionState};

/// Scan `grid` for a frame header.
pub fn decode<G: PixelGrid + ?Sized>(grid: &G, config: &CodecConfig) -> Result<Detection> {
    config.validate()?;
    Decoder::new(grid, config).detect()
}

/// Detect a frame and stream its payload into `sink`.
///
/// # Returns
/// The parsed header and the number of payload bytes written.
///
/// # Errors
/// [`CodecError::NotCoded`] if the image carries no frame, plus every error
/// of [`Decoder::detect`] and [`Decoder::extract`].
pub fn extract<G, W>(grid: &G, sink: &mut W, config: &CodecConfig) -> Result<(FrameHeader, u64)>
where
    G: PixelGrid + ?Sized,
    W: Write,
{
    config.validate()?;
    let mut decoder = Decoder::new(grid, config);
    match decoder.detect()? {
        Detection::NotCoded => Err(CodecError::NotCoded),
        Detection::Coded(header) => {
            let written = decoder.extract(sink)?;
            Ok((header, written))
        }
    }
}

/// Embed `header` and the payload read from `source` into a copy of `grid`.
///
/// The caller's grid is never modified: on any error the copy is dropped, so
/// a failed embed leaves no partially written frame behind.
pub fn embed<G, R>(
    grid: &G,
    source: &mut R,
    header: &FrameHeader,
    config: &CodecConfig,
) -> Result<(G, FrameSummary)>
where
    G: PixelGrid + Clone,
    R: Read,
{
    config.validate()?;
    let mut work = grid.clone();
    let summary = {
        let mut encoder = Encoder::new(&mut work, config);
        encoder.write_header(header)?;
        encoder.write_payload(source)?;
        encoder.commit()?
    };
    Ok((work, summary))
}
