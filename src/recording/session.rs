use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use super::command::EncoderCommand;
use super::config::{Preset, Resolution, SessionConfig};
use super::counter::OutputCounter;
use super::frame_source::{FrameSource, GlFrameSource};
use super::launcher::{EncoderLauncher, EncoderSink, FfmpegLauncher};
use super::search_path::encoder_file_name;
use crate::error::RecordError;

/// Resources that only exist while an encoder is running.
struct ActiveEncode {
    /// `None` once a write has failed; later captures are dropped.
    sink: Option<Box<dyn EncoderSink>>,
    frame: Vec<u8>,
    resolution: Resolution,
    output: PathBuf,
}

/// Records frames from a [`FrameSource`] into numbered video files.
///
/// Idle until the first [`capture`](Self::capture) (or an explicit
/// [`start`](Self::start)), then Active until [`finish`](Self::finish).
/// A resolution change while Active closes the current file and starts a new
/// one, so a file never changes resolution.
pub struct CaptureSession<F: FrameSource = GlFrameSource> {
    config: SessionConfig,
    counter: OutputCounter,
    launcher: Box<dyn EncoderLauncher>,
    source: F,
    active: Option<ActiveEncode>,
    /// Set when an automatic start failed; cleared by an explicit `start`.
    start_failed: bool,
    frames_written: u64,
}

impl CaptureSession<GlFrameSource> {
    /// Default configuration, `ffmpeg` from `PATH`, frames from the current
    /// GL context and a fresh counter.
    pub fn with_defaults() -> Self {
        Self::new(
            SessionConfig::default(),
            OutputCounter::new(),
            FfmpegLauncher::new(),
            GlFrameSource,
        )
    }
}

impl<F: FrameSource> CaptureSession<F> {
    pub fn new(
        config: SessionConfig,
        counter: OutputCounter,
        launcher: impl EncoderLauncher + 'static,
        source: F,
    ) -> Self {
        Self {
            config,
            counter,
            launcher: Box::new(launcher),
            source,
            active: None,
            start_failed: false,
            frames_written: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Changes apply to the next encode. A resolution change is picked up by
    /// the next `capture`.
    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    pub fn counter(&self) -> &OutputCounter {
        &self.counter
    }

    pub fn source_mut(&mut self) -> &mut F {
        &mut self.source
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Frames handed to the encoder since the last start.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// File name for the current counter value. Does not advance it.
    pub fn output_file_name(&self) -> String {
        self.config.file_name(self.counter.current())
    }

    /// Full path for the current counter value. Does not advance it.
    pub fn output_video_file_path(&self) -> PathBuf {
        self.path_for(self.counter.current())
    }

    /// One-call setup for the common options, then [`start`](Self::start).
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        width: u32,
        height: u32,
        output_directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
        overwrite_existing: bool,
        preset: Preset,
        quality: i32,
    ) -> Result<PathBuf, RecordError> {
        self.config.resolution.update(width, height);
        self.config.set_output_directory(output_directory);
        self.config.base_name = base_name.into();
        self.config.overwrite_existing = overwrite_existing;
        self.config.preset = preset;
        self.config.set_quality(quality);
        self.start()
    }

    /// Spawn the encoder for a new output file.
    ///
    /// Fails if already active, if the encoder is not on the search path, if
    /// the file numbers are used up, or if it cannot be spawned. The session
    /// stays Idle on failure.
    pub fn start(&mut self) -> Result<PathBuf, RecordError> {
        if self.is_active() {
            return Err(RecordError::AlreadyActive);
        }
        self.start_failed = true;

        let name = self.launcher.encoder_name().to_string();
        if self.config.probe_encoder {
            if self.launcher.probe() {
                debug!("{name} can be launched");
            } else {
                warn!("launching {name} directly failed, checking search path anyway");
            }
        }

        let discovery = self.launcher.discover();
        if self.config.verbose_discovery || discovery.count() != 1 {
            discovery.log_entries(&encoder_file_name(&name));
        }
        if !discovery.is_found() {
            error!("{name} not found on the search path, video capture disabled");
            return Err(RecordError::EncoderNotFound {
                name,
                checked: discovery.checked,
            });
        }
        if discovery.is_ambiguous() {
            warn!(
                "{} copies of {name} found, continuing with whichever the OS resolves",
                discovery.count()
            );
        }

        let output = self
            .next_output_path()
            .inspect_err(|e| error!("cannot pick an output file: {e}"))?;
        let resolution = self.config.resolution;
        let command = EncoderCommand::from_config(&self.config, &output).with_program(name);
        info!("starting encoder: {command}");

        let sink = self.launcher.spawn(&command).map_err(|e| {
            error!("failed to spawn encoder: {e}");
            RecordError::Spawn(e)
        })?;

        self.active = Some(ActiveEncode {
            sink: Some(sink),
            frame: vec![0; resolution.rgba_frame_len()],
            resolution,
            output: output.clone(),
        });
        self.start_failed = false;
        self.frames_written = 0;
        info!("capturing {}x{} video to {}", resolution.width, resolution.height, output.display());
        Ok(output)
    }

    /// Grab one frame at (`x`, `y`) and send it to the encoder, starting one
    /// if needed.
    ///
    /// Never fails: if no encoder could be started the frame is dropped, and
    /// an automatic start is not retried until `start` is called explicitly.
    pub fn capture(&mut self, width: u32, height: u32, x: i32, y: i32) {
        self.config.resolution.update(width, height);
        let restart = self
            .active
            .as_ref()
            .is_some_and(|active| active.resolution != self.config.resolution);
        if restart {
            info!(
                "resolution changed to {}x{}, starting a new file",
                self.config.resolution.width, self.config.resolution.height
            );
            self.finish();
        }

        if self.active.is_none() && !self.start_failed {
            // already logged by start
            let _ = self.start();
        }

        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(sink) = active.sink.as_mut() else {
            return;
        };

        self.source.read_rgba(x, y, active.resolution, &mut active.frame);
        if let Err(e) = sink.write_all(&active.frame) {
            error!("writing frame to encoder failed, dropping the stream: {e}");
            if let Some(sink) = active.sink.take() {
                let _ = sink.close();
            }
            return;
        }
        self.frames_written += 1;
    }

    /// Close the encoder's input so it finalizes the file, and release the
    /// frame buffer. Returns the finished file's path, or `None` if the
    /// session was already Idle.
    pub fn finish(&mut self) -> Option<PathBuf> {
        let active = self.active.take()?;
        if let Some(sink) = active.sink {
            if let Err(e) = sink.close() {
                warn!("encoder did not finish cleanly: {e}");
            }
        }
        info!(
            "finished, {} frames written, check video at {}",
            self.frames_written,
            active.output.display()
        );
        Some(active.output)
    }

    /// Finish and drop the session.
    pub fn teardown(mut self) -> Option<PathBuf> {
        self.finish()
    }

    fn next_output_path(&self) -> Result<PathBuf, RecordError> {
        loop {
            let number = self.counter.advance().ok_or(RecordError::CounterExhausted)?;
            let path = self.path_for(number);
            if self.config.overwrite_existing || !path.exists() {
                return Ok(path);
            }
            debug!("{} already exists, trying the next number", path.display());
        }
    }

    fn path_for(&self, number: u32) -> PathBuf {
        self.config.output_directory().join(self.config.file_name(number))
    }
}

impl<F: FrameSource> Drop for CaptureSession<F> {
    fn drop(&mut self) {
        self.finish();
    }
}
