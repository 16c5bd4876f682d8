use serde::{Deserialize, Serialize};

use super::error::{CodecError, Result};

/// Widest decimal field accepted; `u64::MAX` has 20 digits.
pub const MAX_FIELD_WIDTH: usize = 20;

/// Fixed grammar of the embedded frame.
///
/// Encode and decode must use identical values: the format has no
/// delimiters, so a single width mismatch shifts every later field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLayout {
    pub preamble: String,
    pub password_flag_width: usize,
    pub password_length_width: usize,
    pub payload_type_width: usize,
    pub name_length_width: usize,
    pub payload_length_width: usize,
    pub file_type_code: u32,
    pub marker_type_code: u32,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            preamble: "imgpack".to_string(),
            password_flag_width: 1,
            password_length_width: 2,
            payload_type_width: 1,
            name_length_width: 3,
            payload_length_width: 10,
            file_type_code: 1,
            marker_type_code: 0,
        }
    }
}

impl FrameLayout {
    /// Bytes of every fixed-width field of a frame, with empty password and name.
    pub fn min_header_len(&self) -> u64 {
        (self.preamble.len()
            + self.password_flag_width
            + self.password_length_width
            + self.payload_type_width
            + self.name_length_width
            + self.payload_length_width) as u64
    }

    /// Below this many bytes an image cannot possibly carry a frame.
    pub fn detection_floor(&self) -> u64 {
        (self.preamble.len() + self.payload_length_width) as u64
    }

    fn validate(&self) -> Result<()> {
        if self.preamble.is_empty() || !self.preamble.is_ascii() {
            return Err(CodecError::Config(
                "preamble must be a non-empty ASCII literal".into(),
            ));
        }
        let widths = [
            ("password_flag_width", self.password_flag_width),
            ("password_length_width", self.password_length_width),
            ("payload_type_width", self.payload_type_width),
            ("name_length_width", self.name_length_width),
            ("payload_length_width", self.payload_length_width),
        ];
        for (name, width) in widths {
            if width == 0 || width > MAX_FIELD_WIDTH {
                return Err(CodecError::Config(format!(
                    "{name} must be within 1..={MAX_FIELD_WIDTH}, got {width}"
                )));
            }
        }
        let codes = [
            ("file_type_code", self.file_type_code),
            ("marker_type_code", self.marker_type_code),
        ];
        for (name, code) in codes {
            if code.to_string().len() > self.payload_type_width {
                return Err(CodecError::Config(format!(
                    "{name} {code} does not fit payload_type_width {}",
                    self.payload_type_width
                )));
            }
        }
        if self.file_type_code == self.marker_type_code {
            return Err(CodecError::Config(
                "file and marker type codes must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Codec settings shared by encode and decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Fraction of the eight bit-depth levels used, in `(0, 1]`.
    pub embed_ratio: f64,
    /// Payload transfer buffer size in bytes.
    pub chunk_size: usize,
    pub frame: FrameLayout,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            embed_ratio: 0.125,
            chunk_size: 4096,
            frame: FrameLayout::default(),
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.embed_ratio > 0.0 && self.embed_ratio <= 1.0) {
            return Err(CodecError::Config(format!(
                "embed_ratio must be within (0, 1], got {}",
                self.embed_ratio
            )));
        }
        if self.chunk_size == 0 {
            return Err(CodecError::Config("chunk_size must be positive".into()));
        }
        self.frame.validate()
    }

    pub fn with_ratio(mut self, embed_ratio: f64) -> Self {
        self.embed_ratio = embed_ratio;
        self
    }
}
