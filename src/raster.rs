//! Raster page sources.
//!
//! A [`RasterSource`] hands out page headers and then the scanlines of each
//! page, one at a time. [`CupsRasterReader`] decodes a CUPS raster stream as
//! CUPS feeds it to a filter on stdin. [`MemorySource`] serves pages held in
//! memory.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};
use std::collections::VecDeque;
use std::io::{self, Read};

use crate::error::Error;

/// CUPS colour space codes used to pick clear colour and ink polarity.
pub const CSPACE_W: u32 = 0;
pub const CSPACE_RGB: u32 = 1;
pub const CSPACE_K: u32 = 3;
pub const CSPACE_SW: u32 = 18;
pub const CSPACE_SRGB: u32 = 19;
pub const CSPACE_ADOBERGB: u32 = 20;

/// Size of `cups_page_header2_t` on the wire.
pub const PAGE_HEADER_LEN: usize = 1796;

// Field offsets inside the page header.
const OFF_ADVANCE_DISTANCE: usize = 256;
const OFF_ADVANCE_MEDIA: usize = 260;
const OFF_CUT_MEDIA: usize = 268;
const OFF_NUM_COPIES: usize = 340;
const OFF_WIDTH: usize = 372;
const OFF_HEIGHT: usize = 376;
const OFF_BITS_PER_COLOR: usize = 384;
const OFF_BITS_PER_PIXEL: usize = 388;
const OFF_BYTES_PER_LINE: usize = 392;
const OFF_COLOR_SPACE: usize = 400;
const OFF_INTEGERS: usize = 452;

/// Page metadata delivered ahead of each page's scanlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub width: u32,
    pub height: u32,
    pub bits_per_color: u32,
    pub bits_per_pixel: u32,
    pub bytes_per_line: u32,
    pub color_space: u32,
    pub num_copies: u32,
    pub advance_distance: u32,
    pub advance_media: u32,
    pub cut_media: u32,
    /// `cupsInteger` vendor options, slot 0 selects the dither mode.
    pub integers: [i32; 16],
}

impl PageHeader {
    /// Header for an 8 bit greyscale page with no paper handling options.
    pub fn greyscale(width: u32, height: u32) -> Self {
        PageHeader {
            width,
            height,
            bits_per_color: 8,
            bits_per_pixel: 8,
            bytes_per_line: width,
            color_space: CSPACE_W,
            num_copies: 1,
            advance_distance: 0,
            advance_media: 0,
            cut_media: 0,
            integers: [0; 16],
        }
    }

    fn parse<B: ByteOrder>(buf: &[u8]) -> Self {
        let mut integers = [0i32; 16];
        B::read_i32_into(&buf[OFF_INTEGERS..OFF_INTEGERS + 64], &mut integers);

        PageHeader {
            width: B::read_u32(&buf[OFF_WIDTH..]),
            height: B::read_u32(&buf[OFF_HEIGHT..]),
            bits_per_color: B::read_u32(&buf[OFF_BITS_PER_COLOR..]),
            bits_per_pixel: B::read_u32(&buf[OFF_BITS_PER_PIXEL..]),
            bytes_per_line: B::read_u32(&buf[OFF_BYTES_PER_LINE..]),
            color_space: B::read_u32(&buf[OFF_COLOR_SPACE..]),
            num_copies: B::read_u32(&buf[OFF_NUM_COPIES..]),
            advance_distance: B::read_u32(&buf[OFF_ADVANCE_DISTANCE..]),
            advance_media: B::read_u32(&buf[OFF_ADVANCE_MEDIA..]),
            cut_media: B::read_u32(&buf[OFF_CUT_MEDIA..]),
            integers,
        }
    }

    /// Serialize into a `cups_page_header2_t` block. Fields this crate does
    /// not model are left zero.
    pub fn to_bytes(&self, order: Endian) -> Vec<u8> {
        match order {
            Endian::Big => self.write::<BigEndian>(),
            Endian::Little => self.write::<LittleEndian>(),
        }
    }

    fn write<B: ByteOrder>(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PAGE_HEADER_LEN];
        B::write_u32(&mut buf[OFF_WIDTH..], self.width);
        B::write_u32(&mut buf[OFF_HEIGHT..], self.height);
        B::write_u32(&mut buf[OFF_BITS_PER_COLOR..], self.bits_per_color);
        B::write_u32(&mut buf[OFF_BITS_PER_PIXEL..], self.bits_per_pixel);
        B::write_u32(&mut buf[OFF_BYTES_PER_LINE..], self.bytes_per_line);
        B::write_u32(&mut buf[OFF_COLOR_SPACE..], self.color_space);
        B::write_u32(&mut buf[OFF_NUM_COPIES..], self.num_copies);
        B::write_u32(&mut buf[OFF_ADVANCE_DISTANCE..], self.advance_distance);
        B::write_u32(&mut buf[OFF_ADVANCE_MEDIA..], self.advance_media);
        B::write_u32(&mut buf[OFF_CUT_MEDIA..], self.cut_media);
        B::write_i32_into(&self.integers, &mut buf[OFF_INTEGERS..OFF_INTEGERS + 64]);
        buf
    }

    /// Value written over the rest of a line by a v2 "clear" run.
    fn clear_color(&self) -> u8 {
        match self.color_space {
            CSPACE_W | CSPACE_RGB | CSPACE_SW | CSPACE_SRGB | CSPACE_ADOBERGB => 0xFF,
            _ => 0x00,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8).max(1)
    }
}

/// A sequential supplier of raster pages.
pub trait RasterSource {
    /// Header of the next page, or `None` once the job has no more pages.
    fn next_page(&mut self) -> Result<Option<PageHeader>, Error>;

    /// Read the next scanline of the current page into `line`.
    ///
    /// Returns the number of bytes written. A return of 0 means the page's
    /// data ended early; a short count means a truncated line.
    fn read_scanline(&mut self, line: &mut [u8]) -> Result<usize, Error>;
}

/// Byte order of a raster stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// CUPS raster format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// `RaSt`, uncompressed
    V1,
    /// `RaS2`, run length compressed
    V2,
    /// `RaS3`, uncompressed
    V3,
}

impl Version {
    fn from_sync(sync: [u8; 4]) -> Option<(Version, Endian)> {
        match &sync {
            b"RaSt" => Some((Version::V1, Endian::Big)),
            b"tSaR" => Some((Version::V1, Endian::Little)),
            b"RaS2" => Some((Version::V2, Endian::Big)),
            b"2SaR" => Some((Version::V2, Endian::Little)),
            b"RaS3" => Some((Version::V3, Endian::Big)),
            b"3SaR" => Some((Version::V3, Endian::Little)),
            _ => None,
        }
    }

    /// Sync word opening a stream of this version and byte order.
    pub fn sync_word(self, order: Endian) -> [u8; 4] {
        let word = match self {
            Version::V1 => *b"RaSt",
            Version::V2 => *b"RaS2",
            Version::V3 => *b"RaS3",
        };
        match order {
            Endian::Big => word,
            Endian::Little => [word[3], word[2], word[1], word[0]],
        }
    }
}

/// Per page decoding state.
#[derive(Debug)]
struct PageState {
    header: PageHeader,
    lines_left: u32,
    /// Last decoded v2 line and how many more times it repeats.
    line: Vec<u8>,
    repeats: u32,
    exhausted: bool,
}

/// Decoder for CUPS raster streams (v1, v2 and v3, either byte order).
pub struct CupsRasterReader<R: Read> {
    reader: R,
    version: Version,
    endian: Endian,
    page: Option<PageState>,
}

impl<R: Read> CupsRasterReader<R> {
    /// Read the sync word and prepare to read pages.
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let mut sync = [0u8; 4];
        reader.read_exact(&mut sync).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::InvalidRaster("stream is empty".to_string()),
            _ => Error::SourceReadError(err),
        })?;

        let (version, endian) = Version::from_sync(sync)
            .ok_or_else(|| Error::InvalidRaster(format!("unknown sync word {:02X?}", sync)))?;
        debug!("CUPS raster {:?}, {:?} endian", version, endian);

        Ok(CupsRasterReader {
            reader,
            version,
            endian,
            page: None,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Fill `buf` as far as the stream allows, returning the bytes read.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::SourceReadError(err)),
            }
        }
        Ok(filled)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        let mut byte = [0u8; 1];
        Ok(match self.read_full(&mut byte)? {
            0 => None,
            _ => Some(byte[0]),
        })
    }

    fn mark_exhausted(&mut self) {
        if let Some(state) = self.page.as_mut() {
            state.exhausted = true;
        }
    }

    /// Discard whatever is left of the current page.
    fn skip_page(&mut self) -> Result<(), Error> {
        let left = match &self.page {
            Some(state) if !state.exhausted && state.lines_left > 0 => state.lines_left,
            _ => return Ok(()),
        };
        debug!("skipping {} unread scanlines", left);

        let len = self.page.as_ref().map_or(0, |s| s.header.bytes_per_line as usize);
        let mut scratch = vec![0u8; len];
        for _ in 0..left {
            if self.read_scanline(&mut scratch)? == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Decode one compressed v2 line into `line`. Returns false at end of
    /// stream.
    fn decode_v2_line(&mut self, line: &mut [u8], bpp: usize, clear: u8) -> Result<bool, Error> {
        let mut pos = 0;
        while pos < line.len() {
            let code = match self.read_byte()? {
                Some(code) => code,
                None => return Ok(pos > 0),
            };

            if code == 128 {
                line[pos..].iter_mut().for_each(|b| *b = clear);
                pos = line.len();
            } else if code < 128 {
                let mut pixel = vec![0u8; bpp];
                let n = self.read_full(&mut pixel)?;
                if n < bpp {
                    return Ok(pos > 0);
                }
                for _ in 0..=code {
                    let end = (pos + bpp).min(line.len());
                    line[pos..end].copy_from_slice(&pixel[..end - pos]);
                    pos = end;
                    if pos == line.len() {
                        break;
                    }
                }
            } else {
                let count = (257 - code as usize) * bpp;
                let mut literal = vec![0u8; count];
                let n = self.read_full(&mut literal)?;
                let end = (pos + n).min(line.len());
                line[pos..end].copy_from_slice(&literal[..end - pos]);
                pos = end;
                if n < count {
                    return Ok(true);
                }
            }
        }
        Ok(true)
    }

    fn read_v2(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        let (bpl, bpp, clear, repeats) = match &self.page {
            Some(state) => (
                state.header.bytes_per_line as usize,
                state.header.bytes_per_pixel(),
                state.header.clear_color(),
                state.repeats,
            ),
            None => return Ok(0),
        };

        if repeats == 0 {
            let count = match self.read_byte()? {
                Some(count) => count,
                None => return Ok(0),
            };
            let mut line = vec![clear; bpl];
            if !self.decode_v2_line(&mut line, bpp, clear)? {
                return Ok(0);
            }
            if let Some(state) = self.page.as_mut() {
                state.line = line;
                state.repeats = u32::from(count) + 1;
            }
        }

        let state = match self.page.as_mut() {
            Some(state) => state,
            None => return Ok(0),
        };
        state.repeats -= 1;
        let n = out.len().min(state.line.len());
        out[..n].copy_from_slice(&state.line[..n]);
        Ok(n)
    }
}

impl<R: Read> RasterSource for CupsRasterReader<R> {
    fn next_page(&mut self) -> Result<Option<PageHeader>, Error> {
        self.skip_page()?;
        self.page = None;

        let mut buf = vec![0u8; PAGE_HEADER_LEN];
        let n = self.read_full(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n < PAGE_HEADER_LEN {
            return Err(Error::InvalidRaster(format!(
                "truncated page header: {} of {} bytes",
                n, PAGE_HEADER_LEN
            )));
        }

        let header = match self.endian {
            Endian::Big => PageHeader::parse::<BigEndian>(&buf),
            Endian::Little => PageHeader::parse::<LittleEndian>(&buf),
        };

        self.page = Some(PageState {
            lines_left: header.height,
            header: header.clone(),
            line: Vec::new(),
            repeats: 0,
            exhausted: false,
        });
        Ok(Some(header))
    }

    fn read_scanline(&mut self, line: &mut [u8]) -> Result<usize, Error> {
        let (bpl, lines_left, exhausted) = match &self.page {
            Some(state) => (
                state.header.bytes_per_line as usize,
                state.lines_left,
                state.exhausted,
            ),
            None => return Ok(0),
        };
        if exhausted || lines_left == 0 {
            return Ok(0);
        }

        let n = match self.version {
            Version::V2 => self.read_v2(line)?,
            Version::V1 | Version::V3 => {
                let mut raw = vec![0u8; bpl];
                let n = self.read_full(&mut raw)?;
                let copied = n.min(line.len());
                line[..copied].copy_from_slice(&raw[..copied]);
                if n < bpl {
                    warn!("short scanline: got {} of {} bytes", n, bpl);
                    self.mark_exhausted();
                }
                copied
            }
        };

        if let Some(state) = self.page.as_mut() {
            if n == 0 {
                state.exhausted = true;
            }
            state.lines_left -= 1;
        }
        Ok(n)
    }
}

/// A page held in memory: its header and scanlines.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    pub header: PageHeader,
    pub rows: Vec<Vec<u8>>,
}

/// In memory raster source.
///
/// Each page serves its rows in order and then reports end of page data,
/// so a page with fewer rows than its header's height behaves like a
/// truncated page from a real stream.
#[derive(Debug, Default)]
pub struct MemorySource {
    pages: VecDeque<MemoryPage>,
    rows: VecDeque<Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page.
    pub fn page(mut self, header: PageHeader, rows: Vec<Vec<u8>>) -> Self {
        self.pages.push_back(MemoryPage { header, rows });
        self
    }
}

impl RasterSource for MemorySource {
    fn next_page(&mut self) -> Result<Option<PageHeader>, Error> {
        Ok(self.pages.pop_front().map(|page| {
            self.rows = page.rows.into();
            page.header
        }))
    }

    fn read_scanline(&mut self, line: &mut [u8]) -> Result<usize, Error> {
        Ok(match self.rows.pop_front() {
            Some(row) => {
                let n = row.len().min(line.len());
                line[..n].copy_from_slice(&row[..n]);
                n
            }
            None => 0,
        })
    }
}
