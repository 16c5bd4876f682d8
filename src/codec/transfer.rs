//! Chunked payload transfer between the bit-channel and a byte source/sink.
//!
//! The chunk size only bounds memory; it never changes which samples carry
//! which bits.

use std::io::{Read, Write};

use log::debug;

use super::channel::{BitReader, BitWriter};
use super::error::{CodecError, Field, Result};
use super::grid::PixelGrid;

/// Fill `buf` from `source`, stopping early only at end of input.
fn fill_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Stream exactly `length` bytes from `source` into the channel.
///
/// # Errors
/// - [`CodecError::ShortRead`] if `source` ends before `length` bytes.
/// - [`CodecError::CapacityExceeded`] if the channel runs out of room;
///   `written` counts payload bytes that landed.
pub fn embed_payload<G, R>(
    writer: &mut BitWriter<'_, G>,
    source: &mut R,
    length: u64,
    chunk_size: usize,
) -> Result<u64>
where
    G: PixelGrid + ?Sized,
    R: Read,
{
    let limit = usize::try_from(length).unwrap_or(usize::MAX);
    let mut buf = vec![0u8; chunk_size.max(1).min(limit)];
    let mut transferred = 0u64;

    while transferred < length {
        let want = (length - transferred).min(buf.len() as u64) as usize;
        let got = fill_chunk(source, &mut buf[..want])?;
        if got != want {
            return Err(CodecError::ShortRead {
                expected: length,
                actual: transferred + got as u64,
            });
        }
        writer.write(&buf[..want]).map_err(|e| match e {
            CodecError::CapacityExceeded { written, .. } => CodecError::CapacityExceeded {
                requested: length,
                written: transferred + written,
            },
            other => other,
        })?;
        transferred += want as u64;
    }

    debug!("embedded {transferred} payload bytes");
    Ok(transferred)
}

/// Stream exactly `length` bytes out of the channel into `sink`.
///
/// # Errors
/// - [`CodecError::TruncatedFrame`] if the channel is exhausted first.
/// - [`CodecError::ShortWrite`] if `sink` stops accepting bytes.
pub fn extract_payload<G, W>(
    reader: &mut BitReader<'_, G>,
    sink: &mut W,
    length: u64,
    chunk_size: usize,
) -> Result<u64>
where
    G: PixelGrid + ?Sized,
    W: Write,
{
    let chunk = chunk_size.max(1) as u64;
    let mut transferred = 0u64;

    while transferred < length {
        let want = (length - transferred).min(chunk) as usize;
        let bytes = reader.read(want);
        if bytes.len() != want {
            return Err(CodecError::TruncatedFrame {
                field: Field::Payload,
                requested: length,
                actual: transferred + bytes.len() as u64,
            });
        }

        let mut offset = 0;
        while offset < bytes.len() {
            let n = sink.write(&bytes[offset..])?;
            if n == 0 {
                return Err(CodecError::ShortWrite {
                    expected: length,
                    actual: transferred + offset as u64,
                });
            }
            offset += n;
        }
        transferred += want as u64;
    }
    sink.flush()?;

    debug!("extracted {transferred} payload bytes");
    Ok(transferred)
}
