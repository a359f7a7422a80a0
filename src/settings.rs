//! Per page paper handling and dithering directives.

use crate::{dither::DitherMode, error::Error, raster::PageHeader};

/// CUPS `cups_adv_t` / `cups_cut_t` codes.
const CUPS_NONE: u32 = 0;
const CUPS_JOB: u32 = 2;
const CUPS_PAGE: u32 = 4;

/// Index of the page option slot holding the dither mode.
pub const DITHER_MODE_SLOT: usize = 0;

/// When to advance the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvancePolicy {
    None,
    AdvanceOnPage,
    AdvanceOnJob,
}

impl AdvancePolicy {
    fn from_code(code: u32) -> Result<Self, Error> {
        match code {
            CUPS_NONE => Ok(Self::None),
            CUPS_JOB => Ok(Self::AdvanceOnJob),
            CUPS_PAGE => Ok(Self::AdvanceOnPage),
            value => Err(Error::UnsupportedSettingValue {
                field: "AdvanceMedia",
                value,
            }),
        }
    }
}

/// When to cut the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutPolicy {
    None,
    CutOnPage,
    CutOnJob,
}

impl CutPolicy {
    fn from_code(code: u32) -> Result<Self, Error> {
        match code {
            CUPS_NONE => Ok(Self::None),
            CUPS_JOB => Ok(Self::CutOnJob),
            CUPS_PAGE => Ok(Self::CutOnPage),
            value => Err(Error::UnsupportedSettingValue {
                field: "CutMedia",
                value,
            }),
        }
    }
}

/// Directives derived from one page header.
///
/// The settings of the last page of a job also decide the job level advance
/// and cut, which run once after every page has been emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub dither_mode: DitherMode,
    pub advance: AdvancePolicy,
    /// Rows to advance, 0 meaning "use the configured default".
    pub advance_distance: u32,
    pub cut: CutPolicy,
}

impl PageSettings {
    /// Read settings from a page header.
    pub fn from_header(header: &PageHeader) -> Result<Self, Error> {
        Ok(PageSettings {
            dither_mode: DitherMode::try_from(header.integers[DITHER_MODE_SLOT])?,
            advance: AdvancePolicy::from_code(header.advance_media)?,
            advance_distance: header.advance_distance,
            cut: CutPolicy::from_code(header.cut_media)?,
        })
    }

    pub fn advances_after_page(&self) -> bool {
        self.advance == AdvancePolicy::AdvanceOnPage
    }

    pub fn cuts_after_page(&self) -> bool {
        self.cut == CutPolicy::CutOnPage
    }

    pub fn advances_after_job(&self) -> bool {
        self.advance == AdvancePolicy::AdvanceOnJob
    }

    pub fn cuts_after_job(&self) -> bool {
        self.cut == CutPolicy::CutOnJob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_plain_header() {
        let header = PageHeader::greyscale(8, 8);
        let settings = PageSettings::from_header(&header).unwrap();
        assert_eq!(
            settings,
            PageSettings {
                dither_mode: DitherMode::Threshold,
                advance: AdvancePolicy::None,
                advance_distance: 0,
                cut: CutPolicy::None,
            }
        );
    }

    #[test]
    fn page_and_job_policies() {
        let mut header = PageHeader::greyscale(8, 8);
        header.advance_media = 4;
        header.advance_distance = 40;
        header.cut_media = 2;
        header.integers[0] = 1;

        let settings = PageSettings::from_header(&header).unwrap();
        assert_eq!(settings.dither_mode, DitherMode::ErrorDiffusion);
        assert!(settings.advances_after_page());
        assert!(!settings.advances_after_job());
        assert!(settings.cuts_after_job());
        assert!(!settings.cuts_after_page());
        assert_eq!(settings.advance_distance, 40);
    }

    #[test]
    fn unknown_advance_is_rejected() {
        let mut header = PageHeader::greyscale(8, 8);
        header.advance_media = 1;
        assert!(matches!(
            PageSettings::from_header(&header),
            Err(Error::UnsupportedSettingValue {
                field: "AdvanceMedia",
                value: 1
            })
        ));
    }

    #[test]
    fn unknown_cut_is_rejected() {
        let mut header = PageHeader::greyscale(8, 8);
        header.cut_media = 3;
        assert!(matches!(
            PageSettings::from_header(&header),
            Err(Error::UnsupportedSettingValue {
                field: "CutMedia",
                value: 3
            })
        ));
    }

    #[test]
    fn unknown_dither_mode_is_rejected() {
        let mut header = PageHeader::greyscale(8, 8);
        header.integers[DITHER_MODE_SLOT] = 5;
        assert!(matches!(
            PageSettings::from_header(&header),
            Err(Error::UnsupportedDitherMode(5))
        ));
    }
}
