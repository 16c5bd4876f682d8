//! # Codec Sessions
//!
//! A session owns the bit-channel cursor for one pass over one grid. The
//! cursor starts at the origin when the session is created and only moves
//! forward; a new pass needs a new session.
//!
//! ## Decode
//! ```text
//! Loaded ──detect──▶ NotCoded
//!        └─────────▶ HeaderParsed ──extract──▶ PayloadExtracted
//! ```
//!
//! ## Encode
//! ```text
//! Loaded ──write_header──▶ HeaderWritten ──write_payload──▶ PayloadWritten
//!        ──commit──▶ Committed
//! ```
//!
//! Any error moves the session to `Failed`, after which every call returns
//! [`CodecError::SessionFailed`]. An [`Encoder`] holds the only mutable
//! borrow of its grid, so two writers can never share a cursor.

use std::io::{Read, Write};

use log::{debug, warn};
use serde::Serialize;

use super::capacity::{can_hold_frame, depth_levels, grid_capacity};
use super::channel::{BitReader, BitWriter, MAX_DEPTH};
use super::config::CodecConfig;
use super::error::{CodecError, Result};
use super::frame::{encode_header, parse_header, Detection, FrameHeader};
use super::grid::PixelGrid;
use super::transfer::{embed_payload, extract_payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    NotCoded,
    HeaderParsed,
    PayloadExtracted,
    HeaderWritten,
    PayloadWritten,
    Committed,
    Failed,
}

fn expect_state(
    current: SessionState,
    expected: SessionState,
    operation: &'static str,
) -> Result<()> {
    if current == SessionState::Failed {
        return Err(CodecError::SessionFailed);
    }
    if current != expected {
        return Err(CodecError::InvalidState {
            operation,
            state: current,
        });
    }
    Ok(())
}

/// Reads a frame from a borrowed grid.
///
/// The reader walks all eight bit-depth levels. The traversal order does not
/// depend on the depth limit, so a frame written at any embed ratio is read
/// back the same way and the decoder needs no ratio of its own.
pub struct Decoder<'g, G: ?Sized> {
    reader: BitReader<'g, G>,
    config: CodecConfig,
    state: SessionState,
    header: Option<FrameHeader>,
}

impl<'g, G: PixelGrid + ?Sized> Decoder<'g, G> {
    pub fn new(grid: &'g G, config: &CodecConfig) -> Self {
        Self {
            reader: BitReader::new(grid, MAX_DEPTH),
            config: config.clone(),
            state: SessionState::Loaded,
            header: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn header(&self) -> Option<&FrameHeader> {
        self.header.as_ref()
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("decode session failed: {e}");
            self.state = SessionState::Failed;
        }
        result
    }

    /// Look for a frame at the channel origin.
    pub fn detect(&mut self) -> Result<Detection> {
        expect_state(self.state, SessionState::Loaded, "detect")?;

        let floor = self.config.frame.detection_floor();
        if self.reader.remaining_bytes() < floor {
            debug!(
                "channel holds {} bytes, below the {} byte detection floor",
                self.reader.remaining_bytes(),
                floor
            );
            self.state = SessionState::NotCoded;
            return Ok(Detection::NotCoded);
        }

        let parsed = parse_header(&mut self.reader, &self.config.frame);
        let detection = self.settle(parsed)?;
        match &detection {
            Detection::NotCoded => self.state = SessionState::NotCoded,
            Detection::Coded(header) => {
                self.header = Some(header.clone());
                self.state = SessionState::HeaderParsed;
            }
        }
        Ok(detection)
    }

    /// Stream the declared payload into `sink`.
    ///
    /// Returns the number of bytes written, which is always the declared
    /// payload length (zero for header-only frames).
    pub fn extract<W: Write>(&mut self, sink: &mut W) -> Result<u64> {
        if self.state == SessionState::NotCoded {
            return Err(CodecError::NotCoded);
        }
        expect_state(self.state, SessionState::HeaderParsed, "extract")?;

        let length = self
            .header
            .as_ref()
            .map(FrameHeader::payload_length)
            .unwrap_or_default();
        let chunk_size = self.config.chunk_size;
        let result = extract_payload(&mut self.reader, sink, length, chunk_size);
        let written = self.settle(result)?;
        self.state = SessionState::PayloadExtracted;
        Ok(written)
    }
}

/// What a committed encode put into the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    pub header_bytes: u64,
    pub payload_bytes: u64,
    pub capacity: u64,
    pub depth_levels: u8,
}

/// Writes a frame into a mutably borrowed grid.
pub struct Encoder<'g, G: ?Sized> {
    writer: BitWriter<'g, G>,
    config: CodecConfig,
    state: SessionState,
    capacity: u64,
    header_bytes: u64,
    declared: u64,
    payload_bytes: u64,
}

impl<'g, G: PixelGrid + ?Sized> Encoder<'g, G> {
    pub fn new(grid: &'g mut G, config: &CodecConfig) -> Self {
        let capacity = grid_capacity(&*grid, config.embed_ratio);
        Self {
            writer: BitWriter::new(grid, depth_levels(config.embed_ratio)),
            config: config.clone(),
            state: SessionState::Loaded,
            capacity,
            header_bytes: 0,
            declared: 0,
            payload_bytes: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("encode session failed: {e}");
            self.state = SessionState::Failed;
        }
        result
    }

    fn plan_header(&self, header: &FrameHeader) -> Result<Vec<u8>> {
        let bytes = encode_header(header, &self.config.frame)?;

        let required = self.config.frame.min_header_len();
        if self.capacity < required {
            return Err(CodecError::TooSmallToCode {
                capacity: self.capacity,
                required,
            });
        }

        let header_len = bytes.len() as u64;
        if !can_hold_frame(self.capacity, header_len, header.payload_length()) {
            return Err(CodecError::CapacityExceeded {
                requested: header_len.saturating_add(header.payload_length()),
                written: 0,
            });
        }
        Ok(bytes)
    }

    /// Validate and write the header.
    ///
    /// Field widths and the whole-frame capacity are checked before the first
    /// sample is touched.
    pub fn write_header(&mut self, header: &FrameHeader) -> Result<()> {
        expect_state(self.state, SessionState::Loaded, "write header")?;

        let planned = self.plan_header(header);
        let bytes = self.settle(planned)?;
        let written = self.writer.write(&bytes);
        self.settle(written)?;

        debug!("wrote {} byte frame header", bytes.len());
        self.header_bytes = bytes.len() as u64;
        self.declared = header.payload_length();
        self.state = SessionState::HeaderWritten;
        Ok(())
    }

    /// Stream the declared payload length from `source`.
    pub fn write_payload<R: Read>(&mut self, source: &mut R) -> Result<u64> {
        expect_state(self.state, SessionState::HeaderWritten, "write payload")?;

        let chunk_size = self.config.chunk_size;
        let result = embed_payload(&mut self.writer, source, self.declared, chunk_size);
        self.payload_bytes = self.settle(result)?;
        self.state = SessionState::PayloadWritten;
        Ok(self.payload_bytes)
    }

    pub fn commit(&mut self) -> Result<FrameSummary> {
        expect_state(self.state, SessionState::PayloadWritten, "commit")?;
        self.state = SessionState::Committed;
        Ok(FrameSummary {
            header_bytes: self.header_bytes,
            payload_bytes: self.payload_bytes,
            capacity: self.capacity,
            depth_levels: self.writer.cursor().depth_limit(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::Cursor;

    #[test]
    fn encoder_walks_its_states() {
        let config = CodecConfig::default();
        let mut img = RgbImage::new(32, 32);
        let mut encoder = Encoder::new(&mut img, &config);
        assert_eq!(encoder.state(), SessionState::Loaded);

        encoder.write_header(&FrameHeader::file("f", 4)).unwrap();
        assert_eq!(encoder.state(), SessionState::HeaderWritten);

        encoder.write_payload(&mut Cursor::new(b"data")).unwrap();
        let summary = encoder.commit().unwrap();
        assert_eq!(encoder.state(), SessionState::Committed);
        assert_eq!(summary.payload_bytes, 4);
        assert_eq!(summary.capacity, 384);

        assert!(matches!(
            encoder.commit(),
            Err(CodecError::InvalidState {
                state: SessionState::Committed,
                ..
            })
        ));
    }

    #[test]
    fn payload_before_header_is_out_of_order() {
        let config = CodecConfig::default();
        let mut img = RgbImage::new(8, 8);
        let mut encoder = Encoder::new(&mut img, &config);
        let err = encoder.write_payload(&mut std::io::empty()).unwrap_err();
        assert!(matches!(err, CodecError::InvalidState { .. }));
        // Misuse does not poison the session.
        assert_eq!(encoder.state(), SessionState::Loaded);
    }

    #[test]
    fn failed_encoder_refuses_further_work() {
        let config = CodecConfig::default();
        let mut img = RgbImage::new(32, 32);
        let mut encoder = Encoder::new(&mut img, &config);
        encoder.write_header(&FrameHeader::file("f", 10)).unwrap();
        assert!(matches!(
            encoder.write_payload(&mut Cursor::new(b"short")),
            Err(CodecError::ShortRead { .. })
        ));
        assert_eq!(encoder.state(), SessionState::Failed);
        assert!(matches!(encoder.commit(), Err(CodecError::SessionFailed)));
    }

    #[test]
    fn tiny_image_is_too_small_to_code() {
        let config = CodecConfig::default();
        // 3x2 at single LSB: 2 bytes, below the 24 byte minimum header.
        let mut img = RgbImage::new(3, 2);
        let err = Encoder::new(&mut img, &config)
            .write_header(&FrameHeader::marker(&config.frame))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::TooSmallToCode {
                capacity: 2,
                required: 24
            }
        ));
    }

    #[test]
    fn decoder_on_uncoded_image_reports_not_coded_on_extract() {
        let config = CodecConfig::default();
        let img = RgbImage::new(32, 32);
        let mut decoder = Decoder::new(&img, &config);
        assert_eq!(decoder.detect().unwrap(), Detection::NotCoded);
        assert_eq!(decoder.state(), SessionState::NotCoded);
        assert!(matches!(decoder.extract(&mut Vec::new()), Err(CodecError::NotCoded)));
    }

    #[test]
    fn decoder_below_detection_floor_reads_nothing() {
        let config = CodecConfig::default();
        // 2x2 over all eight levels: 12 bytes, below preamble + payload length width.
        let img = RgbImage::new(2, 2);
        let mut decoder = Decoder::new(&img, &config);
        assert_eq!(decoder.detect().unwrap(), Detection::NotCoded);
        assert_eq!(decoder.reader.cursor().consumed_bits(), 0);
    }

    #[test]
    fn header_only_frame_extracts_nothing() {
        let config = CodecConfig::default();
        let mut img = RgbImage::new(16, 16);
        {
            let mut encoder = Encoder::new(&mut img, &config);
            encoder
                .write_header(&FrameHeader::marker(&config.frame).with_password("pw"))
                .unwrap();
            assert_eq!(encoder.write_payload(&mut std::io::empty()).unwrap(), 0);
            encoder.commit().unwrap();
        }

        let mut decoder = Decoder::new(&img, &config);
        let detection = decoder.detect().unwrap();
        assert_eq!(detection.header().map(|h| h.password.as_str()), Some("pw"));
        let mut sink = Vec::new();
        assert_eq!(decoder.extract(&mut sink).unwrap(), 0);
        assert!(sink.is_empty());
        assert_eq!(decoder.state(), SessionState::PayloadExtracted);
    }

    #[test]
    fn frame_written_deep_is_read_without_knowing_the_ratio() {
        let wide = CodecConfig::default().with_ratio(0.5);
        let mut img = RgbImage::new(20, 20);
        let data = vec![0xa5u8; 300];
        {
            let mut encoder = Encoder::new(&mut img, &wide);
            encoder.write_header(&FrameHeader::file("deep", 300)).unwrap();
            encoder.write_payload(&mut data.as_slice()).unwrap();
            assert_eq!(encoder.commit().unwrap().depth_levels, 4);
        }

        let mut decoder = Decoder::new(&img, &CodecConfig::default());
        assert!(decoder.detect().unwrap().header().is_some());
        let mut sink = Vec::new();
        assert_eq!(decoder.extract(&mut sink).unwrap(), 300);
        assert_eq!(sink, data);
    }
}
