//! CUPS raster to ESC/POS filter
//!
//! This crate turns 8 bit greyscale raster pages into the bitmap command
//! stream of ESC/POS receipt and label printers: it dithers each page to one
//! bit per pixel, frames it in a `GS v 0` raster image and adds the reset,
//! paper advance and cut commands the page headers ask for.
//!
//! # Example
//!
//! ```rust
//! use rastertopos::{Config, MemorySource, PageHeader, PrintSession};
//!
//! let source = MemorySource::new().page(
//!     PageHeader::greyscale(8, 1),
//!     vec![vec![0, 0, 0, 0, 255, 255, 255, 255]],
//! );
//! let mut out: Vec<u8> = Vec::new();
//! let summary = PrintSession::new(source, &mut out, Config::new()).run().unwrap();
//!
//! assert_eq!(summary.pages, 1);
//! assert_eq!(
//!     out,
//!     vec![0x1B, 0x40, 0x1D, 0x76, 0x30, 0x00, 0x01, 0x00, 0x01, 0x00, 0xF0]
//! );
//! ```

mod bits;
mod command;
mod config;
mod dither;
mod error;
mod page;
mod raster;
mod session;
mod settings;

pub use crate::{
    bits::{bit_position, set_bit, width_in_bytes},
    command::{cut, feed, raster_image_block, reset, Command, FeedStyle},
    config::Config,
    dither::{
        DiffusionKernel, DitherMode, Ditherer, ErrorDiffusion, Polarity, Threshold,
        FLOYD_STEINBERG,
    },
    error::Error,
    page::{MonoBitmap, PageBuffer},
    raster::{
        CupsRasterReader, Endian, MemoryPage, MemorySource, PageHeader, RasterSource, Version,
        CSPACE_K, CSPACE_SW, CSPACE_W, PAGE_HEADER_LEN,
    },
    session::{JobSummary, PrintSession, SessionState},
    settings::{AdvancePolicy, CutPolicy, PageSettings, DITHER_MODE_SLOT},
};
