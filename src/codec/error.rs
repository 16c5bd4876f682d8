//! Error types for the LSB codec.
//!
//! Every failure of the bit-channel, the frame grammar or the payload
//! transfer is reported as a [`CodecError`]. Nothing is swallowed: a short
//! read at one field invalidates the whole session.

use std::fmt;

use thiserror::Error;

use super::session::SessionState;

/// Fields of the embedded frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Preamble,
    PasswordFlag,
    PasswordLength,
    Password,
    PayloadType,
    NameLength,
    Name,
    PayloadLength,
    Payload,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preamble => "preamble",
            Self::PasswordFlag => "password flag",
            Self::PasswordLength => "password length",
            Self::Password => "password",
            Self::PayloadType => "payload type",
            Self::NameLength => "name length",
            Self::Name => "name",
            Self::PayloadLength => "payload length",
            Self::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while validating, decoding or embedding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The pixel layout does not resolve to three 8-bit color planes.
    #[error("image layout {layout} is not eligible (need 8-bit RGB or RGBA)")]
    IneligibleImage { layout: String },

    /// The image cannot hold even the fixed part of a frame.
    #[error("image too small to code: capacity {capacity} bytes, minimum frame {required} bytes")]
    TooSmallToCode { capacity: u64, required: u64 },

    /// The image carries no frame.
    #[error("image does not carry an embedded frame")]
    NotCoded,

    /// The image ran out of pixels before a field was complete.
    #[error("truncated frame at {field}: requested {requested} bytes, got {actual}")]
    TruncatedFrame {
        field: Field,
        requested: u64,
        actual: u64,
    },

    /// A numeric value does not fit the configured decimal width.
    #[error("{field} value {value} does not fit in {width} decimal digits")]
    FieldOverflow {
        field: Field,
        value: u64,
        width: usize,
    },

    /// A parsed field does not follow the frame grammar.
    #[error("malformed {field} field: {raw:?}")]
    MalformedField { field: Field, raw: String },

    /// A text field contains non-ASCII characters.
    #[error("{field} must be ASCII")]
    NonAsciiField { field: Field },

    /// The bit-channel (or the configured embed ratio) has no room left.
    #[error("capacity exceeded: requested {requested} bytes, wrote {written}")]
    CapacityExceeded { requested: u64, written: u64 },

    /// The byte sink accepted fewer bytes than offered.
    #[error("short write to sink: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: u64, actual: u64 },

    /// The byte source ended before the declared payload length.
    #[error("short read from source: expected {expected} bytes, read {actual}")]
    ShortRead { expected: u64, actual: u64 },

    /// An operation was called out of order.
    #[error("cannot {operation} while session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The session already failed; no further operations are allowed.
    #[error("session has failed and accepts no further operations")]
    SessionFailed,

    /// Codec configuration is out of range.
    #[error("invalid codec configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result alias used across the codec.
pub type Result<T> = std::result::Result<T, CodecError>;
