//! Page level pixel buffers.
//!
//! A [`PageBuffer`] holds one page of 8 bit greyscale samples as delivered by
//! the raster source. A [`MonoBitmap`] holds the packed 1 bit per pixel result
//! of dithering that page, ready to be framed into a raster image command.

use crate::{bits, error::Error};

/// One page of 8 bit greyscale samples, row-major, top to bottom.
///
/// The buffer is zero filled on creation. Rows the source never delivers
/// stay zero, so a page cut short still has exactly `width * height`
/// initialized samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PageBuffer {
    /// Bit depth of every sample in the buffer.
    pub const BITS_PER_SAMPLE: u32 = 8;

    /// Allocate a zero filled page.
    ///
    /// Fails with [`Error::EmptyPage`] if either dimension is zero and with
    /// [`Error::AllocationError`] if the sample count can't be allocated.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyPage { width, height });
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(Error::AllocationError { width, height })?;

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| Error::AllocationError { width, height })?;
        samples.resize(len, 0);

        Ok(PageBuffer {
            width,
            height,
            samples,
        })
    }

    /// Copy one scanline into row `row`.
    ///
    /// At most `width` bytes are taken from `source`. A shorter source only
    /// overwrites its own length and leaves the rest of the row untouched.
    pub fn write_row(&mut self, row: u32, source: &[u8]) -> Result<(), Error> {
        if row >= self.height {
            return Err(Error::RowIndexOutOfRange {
                row,
                height: self.height,
            });
        }

        let width = self.width as usize;
        let start = row as usize * width;
        let len = source.len().min(width);
        self.samples[start..start + len].copy_from_slice(&source[..len]);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Samples of row `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= height`.
    pub fn row(&self, row: u32) -> &[u8] {
        let width = self.width as usize;
        let start = row as usize * width;
        &self.samples[start..start + width]
    }
}

/// Packed monochrome bitmap.
///
/// Each row takes `ceil(width / 8)` bytes, bit 7 is the leftmost pixel of a
/// byte and a set bit means ink. Padding bits past `width` are always clear
/// because the only way to set a bit is [`MonoBitmap::set`], which is bounded
/// by the geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// All blank bitmap of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        MonoBitmap {
            width,
            height,
            data: vec![0; bits::width_in_bytes(width) * height as usize],
        }
    }

    /// Mark the pixel at `(x, y)` as ink.
    ///
    /// # Panics
    ///
    /// Panics if the pixel lies outside the bitmap.
    pub fn set(&mut self, x: u32, y: u32) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) outside {}x{} bitmap",
            x,
            y,
            self.width,
            self.height
        );
        let index = y as usize * self.width as usize + x as usize;
        bits::set_bit(&mut self.data, index, self.width);
    }

    /// Whether the pixel at `(x, y)` is ink.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        let index = y as usize * self.width as usize + x as usize;
        let (byte, bit) = bits::bit_position(index, self.width);
        self.data[byte] & (1 << bit) != 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    pub fn width_bytes(&self) -> usize {
        bits::width_in_bytes(self.width)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Number of inked pixels.
    pub fn ink_count(&self) -> u64 {
        self.data.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}
