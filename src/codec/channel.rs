//! # Bit-Channel Stream
//!
//! A sequential, bit-addressable view over the samples of a [`PixelGrid`].
//!
//! ## Traversal Order
//!
//! For one bit-depth-index and one plane, every pixel is visited row by row,
//! column fastest. Then the plane advances (R → G → B), and once all three
//! planes are exhausted the bit-depth-index advances and everything restarts
//! at pixel (0, 0), plane 0:
//!
//! ```text
//! for bit in 0..depth_limit
//!   for plane in 0..3
//!     for row in 0..height
//!       for column in 0..width
//! ```
//!
//! Bytes are carried most-significant-bit first. [`BitReader`] and
//! [`BitWriter`] share the same [`Cursor`], so a read session always mirrors
//! a write session over the same grid dimensions and depth limit.

use log::debug;

use super::error::{CodecError, Result};
use super::grid::{PixelGrid, PLANES};

/// Highest number of bit-depth levels an 8-bit sample offers.
pub const MAX_DEPTH: u8 = 8;

/// Position of the next bit in the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    row: u32,
    column: u32,
    plane: usize,
    bit: u8,
    width: u32,
    height: u32,
    depth_limit: u8,
}

impl Cursor {
    /// A cursor at the origin `(0, 0, 0, 0)`.
    ///
    /// `depth_limit` is clamped to `1..=8`.
    pub fn new(width: u32, height: u32, depth_limit: u8) -> Self {
        Self {
            row: 0,
            column: 0,
            plane: 0,
            bit: 0,
            width,
            height,
            depth_limit: depth_limit.clamp(1, MAX_DEPTH),
        }
    }

    /// `(row, column, plane, bit_depth_index)`.
    pub fn position(&self) -> (u32, u32, usize, u8) {
        (self.row, self.column, self.plane, self.bit)
    }

    pub fn depth_limit(&self) -> u8 {
        self.depth_limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.width == 0 || self.height == 0 || self.bit >= self.depth_limit
    }

    pub fn total_bits(&self) -> u64 {
        self.depth_limit as u64 * PLANES as u64 * self.width as u64 * self.height as u64
    }

    pub fn consumed_bits(&self) -> u64 {
        let pixels = self.width as u64 * self.height as u64;
        let level = self.bit as u64 * PLANES as u64 + self.plane as u64;
        level * pixels + self.row as u64 * self.width as u64 + self.column as u64
    }

    pub fn remaining_bits(&self) -> u64 {
        self.total_bits().saturating_sub(self.consumed_bits())
    }

    /// Whole bytes that can still be carried from this position.
    pub fn remaining_bytes(&self) -> u64 {
        self.remaining_bits() / 8
    }

    fn advance(&mut self) {
        self.column += 1;
        if self.column < self.width {
            return;
        }
        self.column = 0;
        self.row += 1;
        if self.row < self.height {
            return;
        }
        self.row = 0;
        self.plane += 1;
        if self.plane < PLANES {
            return;
        }
        self.plane = 0;
        self.bit += 1;
    }
}

/// Reads bytes out of the bit-channel of a borrowed grid.
pub struct BitReader<'g, G: ?Sized> {
    grid: &'g G,
    cursor: Cursor,
}

impl<'g, G: PixelGrid + ?Sized> BitReader<'g, G> {
    pub fn new(grid: &'g G, depth_limit: u8) -> Self {
        let cursor = Cursor::new(grid.width(), grid.height(), depth_limit);
        Self { grid, cursor }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.cursor.remaining_bytes()
    }

    fn read_bit(&mut self) -> Option<u8> {
        if self.cursor.is_exhausted() {
            return None;
        }
        let (row, column, plane, bit) = self.cursor.position();
        let sample = self.grid.sample(row, column, plane);
        self.cursor.advance();
        Some((sample >> bit) & 1)
    }

    /// Read the next `n` bytes.
    ///
    /// Returns fewer than `n` bytes only when the channel is exhausted; a
    /// trailing partial byte is dropped. Callers decide whether a short read
    /// is an error.
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let cap = (n as u64).min(self.remaining_bytes()) as usize;
        let mut out = Vec::with_capacity(cap);
        'bytes: for _ in 0..n {
            let mut byte = 0u8;
            for _ in 0..8 {
                match self.read_bit() {
                    Some(bit) => byte = (byte << 1) | bit,
                    None => break 'bytes,
                }
            }
            out.push(byte);
        }
        if out.len() < n {
            debug!("bit-channel exhausted: requested {} bytes, read {}", n, out.len());
        }
        out
    }
}

/// Writes bytes into the bit-channel of a mutably borrowed grid.
///
/// Only the bit at the current bit-depth-index of each visited sample is
/// changed; every other bit of the sample is preserved.
pub struct BitWriter<'g, G: ?Sized> {
    grid: &'g mut G,
    cursor: Cursor,
}

impl<'g, G: PixelGrid + ?Sized> BitWriter<'g, G> {
    pub fn new(grid: &'g mut G, depth_limit: u8) -> Self {
        let cursor = Cursor::new(grid.width(), grid.height(), depth_limit);
        Self { grid, cursor }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.cursor.remaining_bytes()
    }

    fn write_bit(&mut self, value: u8) {
        let (row, column, plane, bit) = self.cursor.position();
        let sample = self.grid.sample(row, column, plane);
        let updated = (sample & !(1 << bit)) | ((value & 1) << bit);
        self.grid.set_sample(row, column, plane, updated);
        self.cursor.advance();
    }

    /// Write every byte of `bytes`, MSB first.
    ///
    /// # Errors
    /// [`CodecError::CapacityExceeded`] once the channel cannot take another
    /// whole byte. `written` reports how many bytes did land in the grid.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        for (index, &byte) in bytes.iter().enumerate() {
            if self.cursor.remaining_bits() < 8 {
                return Err(CodecError::CapacityExceeded {
                    requested: bytes.len() as u64,
                    written: index as u64,
                });
            }
            for shift in (0..8).rev() {
                self.write_bit(byte >> shift);
            }
        }
        Ok(())
    }
}
