use log::debug;

use crate::{command::FeedStyle, dither::Polarity, error::Error};

/// Filter configuration.
///
/// Values the page headers can't express: dithering thresholds, how ink
/// polarity is chosen and how paper advance is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    threshold: u8,
    diffusion_threshold: u8,
    polarity: Option<Polarity>,
    feed_style: FeedStyle,
    default_advance_rows: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Initialize configuration data with default values.
    ///
    /// # Example
    ///
    /// ```
    /// use rastertopos::{Config, FeedStyle};
    ///
    /// let config = Config::new().threshold(100).feed_style(FeedStyle::EscD);
    /// assert_eq!(config.get_threshold(), 100);
    /// ```
    pub fn new() -> Config {
        Config {
            threshold: 127,
            diffusion_threshold: 128,
            polarity: None,
            feed_style: FeedStyle::BlankRaster,
            default_advance_rows: 24,
        }
    }

    /// Cut-off for threshold dithering, samples darker than this get ink.
    pub fn threshold(self, threshold: u8) -> Self {
        Config { threshold, ..self }
    }

    /// Quantisation midpoint for error diffusion.
    pub fn diffusion_threshold(self, diffusion_threshold: u8) -> Self {
        Config {
            diffusion_threshold,
            ..self
        }
    }

    /// Force a sample polarity instead of following each page's colour space.
    pub fn polarity(self, polarity: Polarity) -> Self {
        Config {
            polarity: Some(polarity),
            ..self
        }
    }

    /// Follow each page's colour space when choosing polarity.
    pub fn auto_polarity(self) -> Self {
        Config {
            polarity: None,
            ..self
        }
    }

    pub fn feed_style(self, feed_style: FeedStyle) -> Self {
        Config { feed_style, ..self }
    }

    /// Rows to feed when a page asks for an advance without a distance.
    pub fn default_advance_rows(self, rows: u32) -> Self {
        Config {
            default_advance_rows: rows,
            ..self
        }
    }

    pub fn get_threshold(&self) -> u8 {
        self.threshold
    }

    pub fn get_diffusion_threshold(&self) -> u8 {
        self.diffusion_threshold
    }

    pub fn get_feed_style(&self) -> FeedStyle {
        self.feed_style
    }

    /// Polarity for a page in the given CUPS colour space.
    pub fn polarity_for(&self, color_space: u32) -> Polarity {
        self.polarity
            .unwrap_or_else(|| Polarity::for_color_space(color_space))
    }

    /// Rows to feed for a requested advance distance.
    pub fn advance_rows(&self, distance: u32) -> u32 {
        if distance == 0 {
            self.default_advance_rows
        } else {
            distance
        }
    }

    /// Apply options from a CUPS option string.
    ///
    /// Options are whitespace separated `key=value` pairs. Keys this filter
    /// does not know are ignored since CUPS passes every job option to every
    /// filter.
    pub fn apply_options(self, options: &str) -> Result<Self, Error> {
        let mut config = self;

        for option in options.split_whitespace() {
            let (key, value) = match option.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };

            config = match key {
                "Threshold" => config.threshold(parse_number(key, value)?),
                "DiffusionThreshold" => config.diffusion_threshold(parse_number(key, value)?),
                "AdvanceRows" => config.default_advance_rows(parse_number(key, value)?),
                "InkPolarity" => match value.to_lowercase().as_str() {
                    "auto" => config.auto_polarity(),
                    "luminance" => config.polarity(Polarity::Luminance),
                    "density" => config.polarity(Polarity::Density),
                    _ => return Err(invalid(key, value)),
                },
                "FeedStyle" => match value.to_lowercase().as_str() {
                    "raster" => config.feed_style(FeedStyle::BlankRaster),
                    "escpos" => config.feed_style(FeedStyle::EscD),
                    _ => return Err(invalid(key, value)),
                },
                _ => continue,
            };
            debug!("option {}={}", key, value);
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> Error {
    Error::InvalidConfig(format!("{}={}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.get_threshold(), 127);
        assert_eq!(config.get_diffusion_threshold(), 128);
        assert_eq!(config.get_feed_style(), FeedStyle::BlankRaster);
        assert_eq!(config.advance_rows(0), 24);
        assert_eq!(config.advance_rows(10), 10);
    }

    #[test]
    fn polarity_follows_color_space_unless_forced() {
        let config = Config::new();
        assert_eq!(config.polarity_for(crate::raster::CSPACE_K), Polarity::Density);
        assert_eq!(config.polarity_for(crate::raster::CSPACE_SW), Polarity::Luminance);

        let forced = config.polarity(Polarity::Luminance);
        assert_eq!(forced.polarity_for(crate::raster::CSPACE_K), Polarity::Luminance);
    }

    #[test]
    fn options_are_applied() {
        let config = Config::new()
            .apply_options(
                "media=om_roll_80mm Threshold=90 InkPolarity=density FeedStyle=escpos AdvanceRows=48 noCollate",
            )
            .unwrap();
        assert_eq!(config.get_threshold(), 90);
        assert_eq!(config.polarity_for(crate::raster::CSPACE_SW), Polarity::Density);
        assert_eq!(config.get_feed_style(), FeedStyle::EscD);
        assert_eq!(config.advance_rows(0), 48);
    }

    #[test]
    fn empty_options_keep_defaults() {
        assert_eq!(Config::new().apply_options("").unwrap(), Config::new());
    }

    #[test]
    fn bad_option_values_are_rejected() {
        assert!(matches!(
            Config::new().apply_options("Threshold=300"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::new().apply_options("InkPolarity=sideways"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::new().apply_options("FeedStyle=teleport"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
