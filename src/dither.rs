//! Greyscale to monochrome conversion.
//!
//! Two ditherers are provided: a fixed [`Threshold`] and kernel driven
//! [`ErrorDiffusion`]. Both take a [`PageBuffer`] by reference and return a
//! new [`MonoBitmap`] of the same size.

use crate::{
    error::Error,
    page::{MonoBitmap, PageBuffer},
};

/// Convert a greyscale page to a packed monochrome bitmap.
pub trait Ditherer {
    fn dither(&self, page: &PageBuffer) -> MonoBitmap;
}

/// Meaning of a sample value.
///
/// `Luminance` samples are brightness, so dark samples get ink. `Density`
/// samples are ink coverage, so bright samples get ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Luminance,
    Density,
}

impl Polarity {
    /// Polarity matching a CUPS colour space code.
    ///
    /// Only the black (`K`) colour space carries density samples, every
    /// other greyscale space is luminance.
    pub fn for_color_space(color_space: u32) -> Self {
        match color_space {
            crate::raster::CSPACE_K => Polarity::Density,
            _ => Polarity::Luminance,
        }
    }

    /// Sample converted to brightness.
    #[inline]
    fn luminance(self, sample: u8) -> u8 {
        match self {
            Polarity::Luminance => sample,
            Polarity::Density => 255 - sample,
        }
    }
}

/// Dithering algorithm selected by a page's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMode {
    Threshold,
    ErrorDiffusion,
}

impl TryFrom<i32> for DitherMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DitherMode::Threshold),
            1 => Ok(DitherMode::ErrorDiffusion),
            other => Err(Error::UnsupportedDitherMode(other)),
        }
    }
}

/// Ink every pixel whose brightness is below a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    threshold: u8,
    polarity: Polarity,
}

impl Threshold {
    pub fn new(threshold: u8) -> Self {
        Threshold {
            threshold,
            polarity: Polarity::Luminance,
        }
    }

    pub fn polarity(self, polarity: Polarity) -> Self {
        Threshold { polarity, ..self }
    }
}

impl Ditherer for Threshold {
    fn dither(&self, page: &PageBuffer) -> MonoBitmap {
        let mut bitmap = MonoBitmap::blank(page.width(), page.height());

        for y in 0..page.height() {
            for (x, &sample) in page.row(y).iter().enumerate() {
                if self.polarity.luminance(sample) < self.threshold {
                    bitmap.set(x as u32, y);
                }
            }
        }

        bitmap
    }
}

/// Error diffusion weights.
///
/// Each tap pushes `weight / divisor` of a pixel's quantisation error to the
/// pixel at `(x + dx, y + dy)`. Taps must point at pixels not yet visited in
/// row-major order: `dy > 0`, or `dy == 0` and `dx > 0`.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionKernel {
    pub taps: &'static [(i32, u32, i32)],
    pub divisor: i32,
}

impl DiffusionKernel {
    fn rows(&self) -> usize {
        self.taps
            .iter()
            .map(|&(_, dy, _)| dy as usize)
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Floyd-Steinberg: 7/16 right, 3/16 below left, 5/16 below, 1/16 below right.
pub const FLOYD_STEINBERG: DiffusionKernel = DiffusionKernel {
    taps: &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)],
    divisor: 16,
};

/// Error diffusion ditherer.
///
/// Pixels are visited row-major, left to right, top to bottom. The error
/// carried into a pixel is added to its brightness and the sum is clamped to
/// `0..=255` before it is quantised. Taps that fall outside the image are
/// dropped.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDiffusion {
    kernel: DiffusionKernel,
    threshold: u8,
    polarity: Polarity,
}

impl ErrorDiffusion {
    pub fn new(kernel: DiffusionKernel) -> Self {
        ErrorDiffusion {
            kernel,
            threshold: 128,
            polarity: Polarity::Luminance,
        }
    }

    pub fn floyd_steinberg() -> Self {
        Self::new(FLOYD_STEINBERG)
    }

    /// Brightness below which a pixel is quantised to ink.
    pub fn threshold(self, threshold: u8) -> Self {
        ErrorDiffusion { threshold, ..self }
    }

    pub fn polarity(self, polarity: Polarity) -> Self {
        ErrorDiffusion { polarity, ..self }
    }
}

impl Ditherer for ErrorDiffusion {
    fn dither(&self, page: &PageBuffer) -> MonoBitmap {
        let width = page.width() as usize;
        let height = page.height();
        let divisor = self.kernel.divisor;
        let mut bitmap = MonoBitmap::blank(page.width(), height);

        // errors[0] is the current row. Values are scaled by the divisor.
        let mut errors: Vec<Vec<i32>> = vec![vec![0; width]; self.kernel.rows()];

        for y in 0..height {
            for (x, &sample) in page.row(y).iter().enumerate() {
                let carried = errors[0][x] / divisor;
                let value = (i32::from(self.polarity.luminance(sample)) + carried).clamp(0, 255);

                let quantised = if value < i32::from(self.threshold) {
                    bitmap.set(x as u32, y);
                    0
                } else {
                    255
                };
                let error = value - quantised;

                for &(dx, dy, weight) in self.kernel.taps {
                    let nx = x as i64 + i64::from(dx);
                    if nx < 0 || nx >= width as i64 || y + dy >= height {
                        continue;
                    }
                    errors[dy as usize][nx as usize] += error * weight;
                }
            }

            errors.rotate_left(1);
            if let Some(last) = errors.last_mut() {
                last.iter_mut().for_each(|e| *e = 0);
            }
        }

        bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(width: u32, height: u32, sample: u8) -> PageBuffer {
        let mut page = PageBuffer::new(width, height).unwrap();
        let row = vec![sample; width as usize];
        for y in 0..height {
            page.write_row(y, &row).unwrap();
        }
        page
    }

    fn ink_fraction(bitmap: &MonoBitmap) -> f64 {
        bitmap.ink_count() as f64 / (bitmap.width() as f64 * bitmap.height() as f64)
    }

    #[test]
    fn dither_mode_from_option_slot() {
        assert_eq!(DitherMode::try_from(0).unwrap(), DitherMode::Threshold);
        assert_eq!(DitherMode::try_from(1).unwrap(), DitherMode::ErrorDiffusion);
        assert!(matches!(
            DitherMode::try_from(2),
            Err(Error::UnsupportedDitherMode(2))
        ));
        assert!(matches!(
            DitherMode::try_from(-1),
            Err(Error::UnsupportedDitherMode(-1))
        ));
    }

    #[test]
    fn threshold_all_black_is_all_ink() {
        let bitmap = Threshold::new(127).dither(&uniform(16, 3, 0));
        assert_eq!(bitmap.data(), &[0xFF; 6]);
    }

    #[test]
    fn threshold_all_black_odd_width_leaves_padding_clear() {
        let bitmap = Threshold::new(127).dither(&uniform(10, 2, 0));
        assert_eq!(bitmap.data(), &[0xFF, 0xC0, 0xFF, 0xC0]);
    }

    #[test]
    fn threshold_all_white_is_blank() {
        let bitmap = Threshold::new(127).dither(&uniform(13, 4, 255));
        assert_eq!(bitmap.data().len(), 2 * 4);
        assert!(bitmap.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn threshold_half_row() {
        let mut page = PageBuffer::new(8, 1).unwrap();
        page.write_row(0, &[0, 0, 0, 0, 255, 255, 255, 255]).unwrap();
        let bitmap = Threshold::new(127).dither(&page);
        assert_eq!(bitmap.data(), &[0xF0]);
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let mut page = PageBuffer::new(3, 1).unwrap();
        page.write_row(0, &[126, 127, 128]).unwrap();
        let bitmap = Threshold::new(127).dither(&page);
        assert_eq!(bitmap.data(), &[0b1000_0000]);
    }

    #[test]
    fn threshold_is_idempotent_on_binary_input() {
        let mut page = PageBuffer::new(11, 3).unwrap();
        for y in 0..3 {
            let row: Vec<u8> = (0..11)
                .map(|x| if (x * 7 + y * 3) % 5 < 2 { 0 } else { 255 })
                .collect();
            page.write_row(y, &row).unwrap();
        }
        let ditherer = Threshold::new(127);
        let first = ditherer.dither(&page);

        let mut expanded = PageBuffer::new(11, 3).unwrap();
        for y in 0..3 {
            let row: Vec<u8> = (0..11)
                .map(|x| if first.is_set(x, y) { 0 } else { 255 })
                .collect();
            expanded.write_row(y, &row).unwrap();
        }
        assert_eq!(ditherer.dither(&expanded), first);
    }

    #[test]
    fn density_polarity_inks_bright_samples() {
        let mut page = PageBuffer::new(4, 1).unwrap();
        page.write_row(0, &[0, 128, 129, 255]).unwrap();
        let bitmap = Threshold::new(127)
            .polarity(Polarity::Density)
            .dither(&page);
        assert_eq!(bitmap.data(), &[0b0011_0000]);
    }

    #[test]
    fn polarity_for_color_space() {
        assert_eq!(Polarity::for_color_space(crate::raster::CSPACE_K), Polarity::Density);
        assert_eq!(Polarity::for_color_space(crate::raster::CSPACE_W), Polarity::Luminance);
        assert_eq!(Polarity::for_color_space(crate::raster::CSPACE_SW), Polarity::Luminance);
    }

    #[test]
    fn diffusion_mid_grey_is_half_ink() {
        let bitmap = ErrorDiffusion::floyd_steinberg().dither(&uniform(64, 64, 128));
        let fraction = ink_fraction(&bitmap);
        assert!((fraction - 0.5).abs() < 0.02, "ink fraction {}", fraction);
    }

    #[test]
    fn diffusion_tracks_grey_level() {
        let bitmap = ErrorDiffusion::floyd_steinberg().dither(&uniform(64, 64, 192));
        let fraction = ink_fraction(&bitmap);
        assert!((fraction - 0.25).abs() < 0.02, "ink fraction {}", fraction);
    }

    #[test]
    fn diffusion_extremes_do_not_spread() {
        let black = ErrorDiffusion::floyd_steinberg().dither(&uniform(20, 5, 0));
        assert_eq!(black.ink_count(), 100);
        let white = ErrorDiffusion::floyd_steinberg().dither(&uniform(20, 5, 255));
        assert_eq!(white.ink_count(), 0);
    }

    #[test]
    fn diffusion_matches_threshold_on_binary_input() {
        let mut page = PageBuffer::new(9, 4).unwrap();
        for y in 0..4 {
            let row: Vec<u8> = (0..9).map(|x| if (x + y) % 3 == 0 { 0 } else { 255 }).collect();
            page.write_row(y, &row).unwrap();
        }
        assert_eq!(
            ErrorDiffusion::floyd_steinberg().dither(&page),
            Threshold::new(128).dither(&page)
        );
    }

    #[test]
    fn diffusion_single_column_carries_error_down() {
        // Only the 5/16 tap lands inside a one pixel wide image.
        let bitmap = ErrorDiffusion::floyd_steinberg().dither(&uniform(1, 4, 100));
        assert_eq!(bitmap.width_bytes(), 1);
        // 100 -> ink, error 100 -> next row 100 + 31 = 131 -> blank,
        // error -124 -> 100 - 38 = 62 -> ink, error 62 -> 100 + 19 = 119 -> ink.
        assert_eq!(bitmap.data(), &[0x80, 0x00, 0x80, 0x80]);
    }

    #[test]
    fn diffusion_first_row_pushes_error_right() {
        let mut page = PageBuffer::new(3, 1).unwrap();
        page.write_row(0, &[100, 100, 100]).unwrap();
        // 100 -> ink, +43 -> 143 blank, error -112 * 7 / 16 = -49 -> 51 ink.
        let bitmap = ErrorDiffusion::floyd_steinberg().dither(&page);
        assert_eq!(bitmap.data(), &[0b1010_0000]);
    }

    #[test]
    fn diffusion_is_deterministic_and_pure() {
        let mut page = PageBuffer::new(17, 9).unwrap();
        for y in 0..9 {
            let row: Vec<u8> = (0..17).map(|x| ((x * 15 + y * 29) % 256) as u8).collect();
            page.write_row(y, &row).unwrap();
        }
        let before = page.clone();
        let ditherer = ErrorDiffusion::floyd_steinberg();
        let first = ditherer.dither(&page);
        let second = ditherer.dither(&page);
        assert_eq!(first, second);
        assert_eq!(page, before);
        assert_eq!((first.width(), first.height()), (17, 9));
    }

    #[test]
    fn diffusion_density_polarity_mirrors_luminance() {
        let lum = ErrorDiffusion::floyd_steinberg().dither(&uniform(32, 32, 64));
        let density = ErrorDiffusion::floyd_steinberg()
            .polarity(Polarity::Density)
            .dither(&uniform(32, 32, 191));
        assert_eq!(lum, density);
    }
}
