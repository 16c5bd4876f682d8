//! # Image Processing
//!
//! File and byte-level entry points over the LSB codec: decoding image
//! files, inspecting them, embedding payload files and extracting them.

pub mod steganography;

// Re-export main functions for convenience
pub use steganography::{
    embed_bytes, embed_file, extract_bytes, extract_file, inspect_bytes, inspect_file, output_path,
    stored_name, Inspection,
};
