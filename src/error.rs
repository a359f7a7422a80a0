//! Error types for raster conversion and command encoding.
//!
//! Every error is fatal to the job being processed. Nothing in this crate
//! retries: printer output is order sensitive and a half emitted page can not
//! be replayed without resetting the device.

use std::io;
use thiserror::Error;

/// Main error type for the print pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The page buffer for the requested geometry can not be allocated.
    ///
    /// Raised when `width * height` does not fit in addressable memory or the
    /// allocator refuses the request.
    #[error("Can't allocate a {width}x{height} page buffer")]
    AllocationError { width: u32, height: u32 },

    #[error("Page declares an empty image ({width}x{height})")]
    EmptyPage { width: u32, height: u32 },

    #[error("Row {row} is out of range for a page of {height} rows")]
    RowIndexOutOfRange { row: u32, height: u32 },

    #[error("Unsupported bit depth: {0} bits per pixel, only 8 bit greyscale is accepted")]
    UnsupportedBitDepth(u32),

    /// The dither mode slot of the page options holds an unknown value.
    #[error("Unsupported dither mode {0}")]
    UnsupportedDitherMode(i32),

    /// A page setting read from the raster header has no known meaning.
    ///
    /// Values are rejected rather than coerced to a default so a driver
    /// mismatch shows up immediately instead of as wrong paper handling.
    #[error("Unsupported value {value} for {field}")]
    UnsupportedSettingValue { field: &'static str, value: u32 },

    /// Payload length does not equal `width_bytes * height_rows`.
    #[error("Bitmap geometry mismatch: {width_bytes} bytes x {height_rows} rows but {payload_len} payload bytes")]
    InvalidBitmapGeometry {
        width_bytes: usize,
        height_rows: usize,
        payload_len: usize,
    },

    /// A geometry field does not fit in the 16 bit field of the command.
    #[error("{field} of {value} does not fit in 16 bits")]
    DimensionOverflow { field: &'static str, value: usize },

    #[error("Invalid raster stream: {0}")]
    InvalidRaster(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidConfig(String),

    /// Reading from the raster source failed.
    #[error(transparent)]
    SourceReadError(#[from] io::Error),

    #[error("Can't write to output stream: {0}")]
    OutputWriteError(#[source] io::Error),

    /// An error raised while processing a given page, numbered from 1.
    #[error("Page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the page number to an error raised while processing that page.
    pub fn on_page(self, page: u32) -> Self {
        Error::Page {
            page,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any page context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Page { source, .. } => source.root(),
            other => other,
        }
    }
}
