use log::{debug, info, warn};
use std::io::Write;

use crate::{
    command::Command,
    config::Config,
    dither::{DitherMode, Ditherer, ErrorDiffusion, Threshold},
    error::Error,
    page::PageBuffer,
    raster::{PageHeader, RasterSource},
    settings::PageSettings,
};

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPage,
    ProcessingPage,
    JobComplete,
}

/// Outcome of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    pub pages: u32,
}

/// Drives one print job from a raster source to a printer byte stream.
///
/// Pages are handled one at a time. Each page's commands are assembled in a
/// buffer and written in one go once the page is complete, in the order
/// reset, raster image, page advance, page cut. After the last page the job
/// level advance and cut of that page's settings are written.
pub struct PrintSession<S: RasterSource, W: Write> {
    source: S,
    out: W,
    config: Config,
    state: SessionState,
    pending: Option<PageHeader>,
    pages: u32,
    last_settings: Option<PageSettings>,
}

impl<S: RasterSource, W: Write> PrintSession<S, W> {
    pub fn new(source: S, out: W, config: Config) -> Self {
        PrintSession {
            source,
            out,
            config,
            state: SessionState::AwaitingPage,
            pending: None,
            pages: 0,
            last_settings: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pages emitted so far.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Make one state transition and return the new state.
    ///
    /// Stepping a completed session is a no-op.
    pub fn step(&mut self) -> Result<SessionState, Error> {
        self.state = match self.state {
            SessionState::AwaitingPage => match self.source.next_page()? {
                Some(header) => {
                    self.pending = Some(header);
                    SessionState::ProcessingPage
                }
                None => {
                    self.finish_job()?;
                    SessionState::JobComplete
                }
            },
            SessionState::ProcessingPage => {
                if let Some(header) = self.pending.take() {
                    let page = self.pages + 1;
                    self.print_page(&header).map_err(|err| err.on_page(page))?;
                    self.pages = page;
                }
                SessionState::AwaitingPage
            }
            SessionState::JobComplete => SessionState::JobComplete,
        };
        Ok(self.state)
    }

    /// Run the job to completion.
    pub fn run(mut self) -> Result<JobSummary, Error> {
        while self.step()? != SessionState::JobComplete {}
        Ok(JobSummary { pages: self.pages })
    }

    fn print_page(&mut self, header: &PageHeader) -> Result<(), Error> {
        info!("PAGE: {} ({} copies)", self.pages + 1, header.num_copies);
        debug!("BytesPerLine: {}", header.bytes_per_line);
        debug!("BPP: {}", header.bits_per_pixel);
        debug!("BitsPerColour: {}", header.bits_per_color);
        debug!("Width: {}", header.width);
        debug!("Height: {}", header.height);

        if header.bits_per_pixel != PageBuffer::BITS_PER_SAMPLE {
            return Err(Error::UnsupportedBitDepth(header.bits_per_pixel));
        }
        let settings = PageSettings::from_header(header)?;

        let mut buf: Vec<u8> = Vec::new();
        Command::Reset.encode_into(&mut buf)?;

        {
            let page = self.read_page(header)?;
            let bitmap = self
                .ditherer(settings.dither_mode, header.color_space)
                .dither(&page);
            Command::raster_image(&bitmap).encode_into(&mut buf)?;
        }

        if settings.advances_after_page() {
            self.advance(&mut buf, settings.advance_distance)?;
        }
        if settings.cuts_after_page() {
            debug!("cut after page");
            Command::Cut.encode_into(&mut buf)?;
        }

        self.write(&buf)?;
        self.last_settings = Some(settings);
        Ok(())
    }

    /// Pull scanlines until the page is full or the source runs dry.
    fn read_page(&mut self, header: &PageHeader) -> Result<PageBuffer, Error> {
        let mut page = PageBuffer::new(header.width, header.height)?;
        let mut line = vec![0u8; header.bytes_per_line as usize];

        for y in 0..header.height {
            let n = self.source.read_scanline(&mut line)?;
            if n == 0 {
                warn!(
                    "page data ended after {} of {} rows, padding with blank rows",
                    y, header.height
                );
                break;
            }
            page.write_row(y, &line[..n])?;
        }

        Ok(page)
    }

    fn ditherer(&self, mode: DitherMode, color_space: u32) -> Box<dyn Ditherer> {
        let polarity = self.config.polarity_for(color_space);
        debug!("dithering with {:?}, {:?} samples", mode, polarity);

        match mode {
            DitherMode::Threshold => {
                Box::new(Threshold::new(self.config.get_threshold()).polarity(polarity))
            }
            DitherMode::ErrorDiffusion => Box::new(
                ErrorDiffusion::floyd_steinberg()
                    .threshold(self.config.get_diffusion_threshold())
                    .polarity(polarity),
            ),
        }
    }

    fn advance(&self, buf: &mut Vec<u8>, distance: u32) -> Result<(), Error> {
        let rows = self.config.advance_rows(distance);
        debug!("advance {} rows", rows);
        Command::Feed {
            rows,
            style: self.config.get_feed_style(),
        }
        .encode_into(buf)
    }

    /// Job level advance and cut, decided by the last page's settings.
    fn finish_job(&mut self) -> Result<(), Error> {
        if let Some(settings) = self.last_settings.take() {
            let mut buf: Vec<u8> = Vec::new();
            if settings.advances_after_job() {
                self.advance(&mut buf, settings.advance_distance)?;
            }
            if settings.cuts_after_job() {
                debug!("cut after job");
                Command::Cut.encode_into(&mut buf)?;
            }
            self.write(&buf)?;
        }
        info!("job complete, {} pages", self.pages);
        self.out.flush().map_err(Error::OutputWriteError)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Ok(());
        }
        self.out.write_all(buf).map_err(Error::OutputWriteError)
    }
}
