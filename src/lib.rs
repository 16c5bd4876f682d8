//! # imgpack
//!
//! Hides a file inside the pixels of an RGB(A) image with least-significant-bit
//! steganography, and finds and extracts it again.
//!
//! - [`codec`]: the bit-channel, frame format and capacity rules
//! - [`processing`]: image and payload file handling on top of the codec
//! - [`common`]: configuration
//! - [`utils`]: logging setup

pub mod codec;
pub mod common;
pub mod processing;
pub mod utils;

pub use codec::{CodecConfig, CodecError, Detection, FrameHeader};
pub use common::config::AppConfig;
