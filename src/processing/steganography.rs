//! # Image File Glue
//!
//! Connects the codec to encoded image files (PNG and anything else the
//! `image` crate can decode) and to payload files on disk.
//!
//! ## Encoding Process
//! 1. Decode the cover image and check that its layout is eligible
//! 2. Build a FILE header from the payload's name and length
//! 3. Embed header and payload into a copy of the pixels
//! 4. Encode the result as PNG (lossy formats would destroy the frame)
//!
//! ## Decoding Process
//! 1. Skip files too small to hold a preamble and a length field
//! 2. Decode the image and scan the bit-channel for a header
//! 3. On request, stream the declared payload out to a file or buffer

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, ImageFormat};
use log::{info, warn};
use serde::Serialize;

use crate::codec::{
    self, capacity, validate, CodecConfig, CodecError, CoverImage, Decoder, Detection,
    Eligibility, FrameHeader, FrameSummary,
};

/// What an image carries, as reported to front ends.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Advisory frame capacity in bytes at the configured embed ratio.
    pub capacity: u64,
    pub coded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<FrameHeader>,
}

/// Name stored for a payload file: its final path component.
pub fn stored_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "payload.bin".to_string())
}

/// Where an extracted payload named `name` lands inside `dir`.
///
/// Only the final component of the stored name is used, so a stored path
/// can never escape `dir`.
pub fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(stored_name(Path::new(name)))
}

fn to_cover(image: DynamicImage) -> Result<CoverImage> {
    Ok(CoverImage::from_dynamic(image)?)
}

/// Inspect an encoded image held in memory.
///
/// # Example
/// ```ignore
/// let bytes = std::fs::read("photo.png")?;
/// let report = inspect_bytes(&bytes, &CodecConfig::default())?;
/// println!("coded: {}", report.coded);
/// ```
pub fn inspect_bytes(bytes: &[u8], config: &CodecConfig) -> Result<Inspection> {
    let image = image::load_from_memory(bytes).context("decoding image")?;
    let (width, height) = image.dimensions();

    let mut report = Inspection {
        eligible: false,
        layout: None,
        width,
        height,
        capacity: 0,
        coded: false,
        header: None,
    };

    if let Eligibility::Ineligible { layout } = validate(&image) {
        warn!("image layout {layout} is not eligible for coding");
        report.layout = Some(layout);
        return Ok(report);
    }
    report.eligible = true;
    report.capacity = capacity(width, height, config.embed_ratio);

    if (bytes.len() as u64) < config.frame.detection_floor() {
        return Ok(report);
    }

    let cover = to_cover(image)?;
    if let Detection::Coded(header) = codec::decode(&cover, config)? {
        report.coded = true;
        report.header = Some(header);
    }
    Ok(report)
}

pub fn inspect_file(path: &Path, config: &CodecConfig) -> Result<Inspection> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    inspect_bytes(&bytes, config)
}

/// Encode a cover as PNG bytes.
pub fn encode_png(cover: CoverImage) -> Result<Vec<u8>> {
    let mut output_bytes = Vec::new();
    cover
        .into_dynamic()
        .write_to(&mut Cursor::new(&mut output_bytes), ImageFormat::Png)?;
    Ok(output_bytes)
}

/// Embed an in-memory payload into an in-memory cover image.
///
/// # Returns
/// - `Ok((png, summary))`: PNG bytes of the coded image and what was written
/// - `Err`: undecodable or ineligible cover, or any [`CodecError`]
pub fn embed_bytes(
    cover_bytes: &[u8],
    payload: &[u8],
    name: &str,
    password: Option<&str>,
    config: &CodecConfig,
) -> Result<(Vec<u8>, FrameSummary)> {
    let cover = to_cover(image::load_from_memory(cover_bytes).context("decoding cover image")?)?;

    let mut header = FrameHeader::file(name, payload.len() as u64);
    if let Some(password) = password {
        header = header.with_password(password);
    }

    let (coded, summary) = codec::embed(&cover, &mut &payload[..], &header, config)?;
    Ok((encode_png(coded)?, summary))
}

/// Embed the file at `payload_path` into `cover_path`, writing a PNG to `output`.
///
/// The payload is streamed from disk in `chunk_size` pieces.
pub fn embed_file(
    cover_path: &Path,
    payload_path: &Path,
    output: &Path,
    name: Option<&str>,
    password: Option<&str>,
    config: &CodecConfig,
) -> Result<FrameSummary> {
    let image = image::open(cover_path)
        .with_context(|| format!("opening cover image {}", cover_path.display()))?;
    let cover = to_cover(image)?;

    let file = File::open(payload_path)
        .with_context(|| format!("opening payload {}", payload_path.display()))?;
    let length = file.metadata()?.len();
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| stored_name(payload_path));

    let mut header = FrameHeader::file(name, length);
    if let Some(password) = password {
        header = header.with_password(password);
    }

    let mut source = BufReader::new(file);
    let (coded, summary) = codec::embed(&cover, &mut source, &header, config)?;

    coded
        .into_dynamic()
        .save_with_format(output, ImageFormat::Png)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "embedded {} ({} bytes) into {} using {} of {} bytes",
        payload_path.display(),
        summary.payload_bytes,
        output.display(),
        summary.header_bytes + summary.payload_bytes,
        summary.capacity
    );
    Ok(summary)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Run `write` against `<destination>.part`, then rename it onto `destination`.
///
/// On any error the partial file is removed and `destination` is untouched.
fn write_file_atomically<T, F>(destination: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T>,
{
    let partial = partial_path(destination);
    let file = File::create(&partial).with_context(|| format!("creating {}", partial.display()))?;
    let mut sink = BufWriter::new(file);

    let outcome = write(&mut sink).and_then(|value| {
        sink.flush()?;
        Ok(value)
    });
    drop(sink);

    match outcome {
        Ok(value) => {
            fs::rename(&partial, destination)
                .with_context(|| format!("moving payload to {}", destination.display()))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = fs::remove_file(&partial) {
                warn!("could not remove {}: {}", partial.display(), e);
            }
            Err(err)
        }
    }
}

/// Extract the embedded payload of an in-memory image.
pub fn extract_bytes(bytes: &[u8], config: &CodecConfig) -> Result<(FrameHeader, Vec<u8>)> {
    if (bytes.len() as u64) < config.frame.detection_floor() {
        return Err(CodecError::NotCoded.into());
    }
    let cover = to_cover(image::load_from_memory(bytes).context("decoding image")?)?;
    let mut payload = Vec::new();
    let (header, _) = codec::extract(&cover, &mut payload, config)?;
    Ok((header, payload))
}

/// Extract the payload of `image_path` into a file.
///
/// `output` names the destination file; without it the payload is written
/// into `dir` under its stored name.
pub fn extract_file(
    image_path: &Path,
    output: Option<&Path>,
    dir: &Path,
    config: &CodecConfig,
) -> Result<(FrameHeader, PathBuf, u64)> {
    let file_size = fs::metadata(image_path)
        .with_context(|| format!("reading {}", image_path.display()))?
        .len();
    if file_size < config.frame.detection_floor() {
        return Err(CodecError::NotCoded.into());
    }

    config.validate()?;
    let image = image::open(image_path)
        .with_context(|| format!("opening image {}", image_path.display()))?;
    let cover = to_cover(image)?;

    // The header names the destination, so detect before creating the file.
    let mut decoder = Decoder::new(&cover, config);
    let header = match decoder.detect()? {
        Detection::NotCoded => return Err(CodecError::NotCoded.into()),
        Detection::Coded(header) => header,
    };
    let destination = match output {
        Some(path) => path.to_path_buf(),
        None => output_path(dir, header.name().unwrap_or("payload.bin")),
    };

    let written = write_file_atomically(&destination, |sink| Ok(decoder.extract(sink)?))?;

    info!("extracted {written} bytes to {}", destination.display());
    Ok((header, destination, written))
}
