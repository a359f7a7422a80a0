//! ESC/POS command encoding.
//!
//! | Command | Bytes |
//! |---|---|
//! | Reset | `1B 40` |
//! | Raster image | `1D 76 30 00 xL xH yL yH` + `x * y` payload bytes |
//! | Feed | blank raster image, or `1B 64 n` |
//! | Cut | `1B 6D` |
//!
//! All multi byte fields are 16 bit little endian. Values that don't fit are
//! rejected with [`Error::DimensionOverflow`] rather than truncated.

use crate::{error::Error, page::MonoBitmap};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Largest row count a single `ESC d` command can feed.
const MAX_ESC_D_ROWS: u32 = 255;

/// How paper advance is put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedStyle {
    /// An all blank raster image one byte wide and `rows` tall.
    #[default]
    BlankRaster,
    /// `ESC d n`, repeated in chunks of at most 255 rows.
    EscD,
}

/// A single printer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Reset,
    RasterImageBlock {
        width_bytes: usize,
        height_rows: usize,
        payload: &'a [u8],
    },
    Feed {
        rows: u32,
        style: FeedStyle,
    },
    Cut,
}

impl<'a> Command<'a> {
    /// Raster image block for a whole bitmap.
    pub fn raster_image(bitmap: &'a MonoBitmap) -> Self {
        Command::RasterImageBlock {
            width_bytes: bitmap.width_bytes(),
            height_rows: bitmap.height() as usize,
            payload: bitmap.data(),
        }
    }

    /// Append the encoded command to `buf`.
    ///
    /// On error `buf` is left unchanged.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        match *self {
            Command::Reset => buf.extend_from_slice(&reset()),
            Command::RasterImageBlock {
                width_bytes,
                height_rows,
                payload,
            } => buf.append(&mut raster_image_block(width_bytes, height_rows, payload)?),
            Command::Feed { rows, style } => buf.append(&mut feed(rows, style)?),
            Command::Cut => buf.extend_from_slice(&cut()),
        }
        Ok(())
    }
}

/// `ESC @` : initialize printer
pub fn reset() -> [u8; 2] {
    [ESC, 0x40]
}

/// `ESC m` : partial cut
pub fn cut() -> [u8; 2] {
    [ESC, 0x6D]
}

/// `GS v 0` : print raster bit image in normal density.
///
/// `payload` must be exactly `width_bytes * height_rows` bytes of packed
/// rows.
pub fn raster_image_block(
    width_bytes: usize,
    height_rows: usize,
    payload: &[u8],
) -> Result<Vec<u8>, Error> {
    if width_bytes.checked_mul(height_rows) != Some(payload.len()) {
        return Err(Error::InvalidBitmapGeometry {
            width_bytes,
            height_rows,
            payload_len: payload.len(),
        });
    }

    let [xl, xh] = u16_le("raster width", width_bytes)?;
    let [yl, yh] = u16_le("raster height", height_rows)?;

    let mut buf: Vec<u8> = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&[GS, 0x76, 0x30, 0x00, xl, xh, yl, yh]);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Advance the paper by `rows` printable rows.
pub fn feed(rows: u32, style: FeedStyle) -> Result<Vec<u8>, Error> {
    match style {
        FeedStyle::BlankRaster => {
            if rows == 0 {
                return Ok(Vec::new());
            }
            let blank = vec![0u8; rows as usize];
            raster_image_block(1, rows as usize, &blank)
        }
        FeedStyle::EscD => {
            let mut buf: Vec<u8> = Vec::new();
            let mut remaining = rows;
            while remaining > 0 {
                let n = remaining.min(MAX_ESC_D_ROWS);
                buf.extend_from_slice(&[ESC, 0x64, n as u8]);
                remaining -= n;
            }
            Ok(buf)
        }
    }
}

fn u16_le(field: &'static str, value: usize) -> Result<[u8; 2], Error> {
    u16::try_from(value)
        .map(u16::to_le_bytes)
        .map_err(|_| Error::DimensionOverflow { field, value })
}
