//! # Frame Codec
//!
//! Self-describing header written at the origin of the bit-channel.
//!
//! ## Wire Format
//!
//! Fields follow each other with no delimiters. Numbers are zero-padded
//! ASCII decimal of a configured fixed width (see [`FrameLayout`]):
//!
//! ```text
//! [preamble      ] fixed ASCII literal
//! [W1 digits     ] password-present flag
//! [W2 digits     ] password length
//! [N bytes       ] password (ASCII, may be empty)
//! [W3 digits     ] payload type code
//! -- only when the type code is FILE --
//! [W4 digits     ] name length
//! [N bytes       ] name (ASCII)
//! [W5 digits     ] payload length
//! [N bytes       ] payload
//! ```
//!
//! The password is descriptive metadata: it is stored in clear and does not
//! gate extraction.

use log::debug;
use serde::Serialize;

use super::channel::BitReader;
use super::config::FrameLayout;
use super::error::{CodecError, Field, Result};
use super::grid::PixelGrid;

/// What follows the type code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadKind {
    /// An embedded file: its stored path/name and byte length.
    File { name: String, length: u64 },
    /// A header-only frame carrying some other type code.
    Other { code: u32 },
}

/// Parsed (or to-be-written) frame header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub password_flag: bool,
    pub password: String,
    pub kind: PayloadKind,
}

impl FrameHeader {
    pub fn file(name: impl Into<String>, length: u64) -> Self {
        Self {
            password_flag: false,
            password: String::new(),
            kind: PayloadKind::File {
                name: name.into(),
                length,
            },
        }
    }

    /// A header-only frame using the layout's marker type code.
    pub fn marker(layout: &FrameLayout) -> Self {
        Self {
            password_flag: false,
            password: String::new(),
            kind: PayloadKind::Other {
                code: layout.marker_type_code,
            },
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password_flag = true;
        self.password = password.into();
        self
    }

    /// Declared payload bytes following the header.
    pub fn payload_length(&self) -> u64 {
        match &self.kind {
            PayloadKind::File { length, .. } => *length,
            PayloadKind::Other { .. } => 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            PayloadKind::File { name, .. } => Some(name),
            PayloadKind::Other { .. } => None,
        }
    }
}

/// Result of scanning the channel origin for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    NotCoded,
    Coded(FrameHeader),
}

impl Detection {
    pub fn header(&self) -> Option<&FrameHeader> {
        match self {
            Self::NotCoded => None,
            Self::Coded(header) => Some(header),
        }
    }
}

fn fixed_width(field: Field, value: u64, width: usize) -> Result<String> {
    let digits = value.to_string();
    if digits.len() > width {
        return Err(CodecError::FieldOverflow {
            field,
            value,
            width,
        });
    }
    Ok(format!("{digits:0>width$}"))
}

fn ascii_text(field: Field, text: &str) -> Result<&str> {
    if text.is_ascii() {
        Ok(text)
    } else {
        Err(CodecError::NonAsciiField { field })
    }
}

/// Serialize `header` into its wire bytes.
///
/// Every field is checked before anything is produced, so a
/// [`CodecError::FieldOverflow`] never leaves a partial header behind.
pub fn encode_header(header: &FrameHeader, layout: &FrameLayout) -> Result<Vec<u8>> {
    let password = ascii_text(Field::Password, &header.password)?;

    let mut out = String::with_capacity(layout.min_header_len() as usize + password.len());
    out.push_str(&layout.preamble);
    out.push_str(&fixed_width(
        Field::PasswordFlag,
        header.password_flag as u64,
        layout.password_flag_width,
    )?);
    out.push_str(&fixed_width(
        Field::PasswordLength,
        password.len() as u64,
        layout.password_length_width,
    )?);
    out.push_str(password);

    match &header.kind {
        PayloadKind::File { name, length } => {
            let name = ascii_text(Field::Name, name)?;
            out.push_str(&fixed_width(
                Field::PayloadType,
                layout.file_type_code as u64,
                layout.payload_type_width,
            )?);
            out.push_str(&fixed_width(
                Field::NameLength,
                name.len() as u64,
                layout.name_length_width,
            )?);
            out.push_str(name);
            out.push_str(&fixed_width(
                Field::PayloadLength,
                *length,
                layout.payload_length_width,
            )?);
        }
        PayloadKind::Other { code } => {
            if *code == layout.file_type_code {
                return Err(CodecError::MalformedField {
                    field: Field::PayloadType,
                    raw: code.to_string(),
                });
            }
            out.push_str(&fixed_width(
                Field::PayloadType,
                *code as u64,
                layout.payload_type_width,
            )?);
        }
    }

    Ok(out.into_bytes())
}

fn read_field<G: PixelGrid + ?Sized>(
    reader: &mut BitReader<'_, G>,
    field: Field,
    len: u64,
) -> Result<Vec<u8>> {
    let requested = usize::try_from(len).map_err(|_| CodecError::TruncatedFrame {
        field,
        requested: len,
        actual: reader.remaining_bytes(),
    })?;
    let bytes = reader.read(requested);
    if bytes.len() != requested {
        return Err(CodecError::TruncatedFrame {
            field,
            requested: len,
            actual: bytes.len() as u64,
        });
    }
    Ok(bytes)
}

fn read_number<G: PixelGrid + ?Sized>(
    reader: &mut BitReader<'_, G>,
    field: Field,
    width: usize,
) -> Result<u64> {
    let raw = read_field(reader, field, width as u64)?;
    let malformed = || CodecError::MalformedField {
        field,
        raw: String::from_utf8_lossy(&raw).into_owned(),
    };
    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(malformed)
}

fn read_text<G: PixelGrid + ?Sized>(
    reader: &mut BitReader<'_, G>,
    field: Field,
    len: u64,
) -> Result<String> {
    let raw = read_field(reader, field, len)?;
    if !raw.is_ascii() {
        return Err(CodecError::MalformedField {
            field,
            raw: String::from_utf8_lossy(&raw).into_owned(),
        });
    }
    Ok(raw.into_iter().map(char::from).collect())
}

/// Scan the channel origin for a frame header.
///
/// A preamble mismatch (or preamble bytes that are not text) is the normal
/// [`Detection::NotCoded`] outcome. Once the preamble matches, the grammar is
/// strict: a short field is [`CodecError::TruncatedFrame`], a non-decimal
/// number is [`CodecError::MalformedField`].
///
/// On success the reader is positioned on the first payload byte.
pub fn parse_header<G: PixelGrid + ?Sized>(
    reader: &mut BitReader<'_, G>,
    layout: &FrameLayout,
) -> Result<Detection> {
    let expected = layout.preamble.as_bytes();
    let raw = reader.read(expected.len());
    if raw.len() != expected.len() {
        debug!("channel shorter than preamble, image is not coded");
        return Ok(Detection::NotCoded);
    }
    match std::str::from_utf8(&raw) {
        Ok(text) if text == layout.preamble => {}
        _ => return Ok(Detection::NotCoded),
    }

    let password_flag = read_number(reader, Field::PasswordFlag, layout.password_flag_width)? != 0;
    let password_len = read_number(reader, Field::PasswordLength, layout.password_length_width)?;
    let password = read_text(reader, Field::Password, password_len)?;

    let code = read_number(reader, Field::PayloadType, layout.payload_type_width)?;
    let code = u32::try_from(code).map_err(|_| CodecError::MalformedField {
        field: Field::PayloadType,
        raw: code.to_string(),
    })?;
    debug!("frame preamble matched, payload type {code}");

    let kind = if code == layout.file_type_code {
        let name_len = read_number(reader, Field::NameLength, layout.name_length_width)?;
        let name = read_text(reader, Field::Name, name_len)?;
        let length = read_number(reader, Field::PayloadLength, layout.payload_length_width)?;
        let available = reader.remaining_bytes();
        if length > available {
            return Err(CodecError::TruncatedFrame {
                field: Field::Payload,
                requested: length,
                actual: available,
            });
        }
        PayloadKind::File { name, length }
    } else {
        PayloadKind::Other { code }
    };

    Ok(Detection::Coded(FrameHeader {
        password_flag,
        password,
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::channel::BitWriter;
    use image::RgbImage;

    fn write_raw(img: &mut RgbImage, bytes: &[u8]) {
        BitWriter::new(img, 1).write(bytes).unwrap();
    }

    #[test]
    fn encodes_fixed_width_fields_in_order() {
        let layout = FrameLayout::default();
        let header = FrameHeader::file("a.txt", 42);
        let bytes = encode_header(&header, &layout).unwrap();
        assert_eq!(bytes, b"imgpack0001005a.txt0000000042");
    }

    #[test]
    fn password_is_stored_in_clear() {
        let layout = FrameLayout::default();
        let header = FrameHeader::marker(&layout).with_password("hunter2");
        let bytes = encode_header(&header, &layout).unwrap();
        assert_eq!(bytes, b"imgpack107hunter20");
    }

    #[test]
    fn overflowing_name_length_is_rejected() {
        let layout = FrameLayout::default();
        let header = FrameHeader::file("n".repeat(1000), 1);
        let err = encode_header(&header, &layout).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldOverflow {
                field: Field::NameLength,
                value: 1000,
                width: 3
            }
        ));
    }

    #[test]
    fn non_ascii_name_is_rejected() {
        let layout = FrameLayout::default();
        let header = FrameHeader::file("résumé.pdf", 1);
        assert!(matches!(
            encode_header(&header, &layout),
            Err(CodecError::NonAsciiField { field: Field::Name })
        ));
    }

    #[test]
    fn parses_header_and_stops_at_payload() {
        let layout = FrameLayout::default();
        let mut img = RgbImage::new(32, 32);
        let mut frame = encode_header(&FrameHeader::file("dir/x.bin", 3), &layout).unwrap();
        frame.extend_from_slice(&[7, 8, 9]);
        write_raw(&mut img, &frame);

        let mut reader = BitReader::new(&img, 1);
        let detection = parse_header(&mut reader, &layout).unwrap();
        assert_eq!(detection, Detection::Coded(FrameHeader::file("dir/x.bin", 3)));
        assert_eq!(reader.read(3), vec![7, 8, 9]);
    }

    #[test]
    fn password_bytes_are_read_even_without_flag() {
        let layout = FrameLayout::default();
        let mut img = RgbImage::new(16, 16);
        write_raw(&mut img, b"imgpack002ab5");

        let mut reader = BitReader::new(&img, 1);
        let header = parse_header(&mut reader, &layout).unwrap();
        assert_eq!(
            header,
            Detection::Coded(FrameHeader {
                password_flag: false,
                password: "ab".into(),
                kind: PayloadKind::Other { code: 5 },
            })
        );
    }

    #[test]
    fn blank_image_is_not_coded() {
        let img = RgbImage::new(16, 16);
        let mut reader = BitReader::new(&img, 1);
        assert_eq!(
            parse_header(&mut reader, &FrameLayout::default()).unwrap(),
            Detection::NotCoded
        );
    }

    #[test]
    fn garbage_length_after_preamble_is_malformed() {
        let mut img = RgbImage::new(16, 16);
        write_raw(&mut img, b"imgpack0x1");
        let mut reader = BitReader::new(&img, 1);
        let err = parse_header(&mut reader, &FrameLayout::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedField {
                field: Field::PasswordLength,
                ..
            }
        ));
    }

    #[test]
    fn declared_name_beyond_image_is_truncated() {
        // 8x8 at one level carries 24 bytes.
        let mut img = RgbImage::new(8, 8);
        write_raw(&mut img, b"imgpack0001999");
        let mut reader = BitReader::new(&img, 1);
        let err = parse_header(&mut reader, &FrameLayout::default()).unwrap_err();
        match err {
            CodecError::TruncatedFrame {
                field,
                requested,
                actual,
            } => {
                assert_eq!(field, Field::Name);
                assert_eq!(requested, 999);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
