use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::config::{Bitrate, Preset, Resolution, SessionConfig};

pub const ENCODER_NAME: &str = "ffmpeg";
pub const CAPTURE_FRAMERATE: u32 = 25;

/// How the encoder decides how many bits each frame gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// `-crf <quality>`, optionally capped by max rate / buffer size.
    Quality { crf: u32, cap: Option<Bitrate> },
    /// `-qp 0`, optionally capped.
    Lossless { cap: Option<Bitrate> },
    /// Explicit bitrate; no quality flags at all.
    Bitrate(Bitrate),
}

impl RateControl {
    pub fn from_config(config: &SessionConfig) -> Self {
        let bitrate = config.bitrate;
        if bitrate.controls_rate() {
            if config.lossless {
                warn!("lossless is ignored while a target bitrate is set");
            }
            return RateControl::Bitrate(bitrate);
        }

        let cap = bitrate.use_bitrate.then_some(bitrate);
        if config.lossless {
            RateControl::Lossless { cap }
        } else {
            RateControl::Quality {
                crf: config.quality(),
                cap,
            }
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            RateControl::Quality { crf, cap } => {
                args.extend(["-crf".to_string(), crf.to_string()]);
                if let Some(cap) = cap {
                    push_bitrate_args(cap, args);
                }
            }
            RateControl::Lossless { cap } => {
                args.extend(["-qp".to_string(), "0".to_string()]);
                if let Some(cap) = cap {
                    push_bitrate_args(cap, args);
                }
            }
            RateControl::Bitrate(bitrate) => push_bitrate_args(bitrate, args),
        }
    }
}

fn push_bitrate_args(bitrate: &Bitrate, args: &mut Vec<String>) {
    let flags = [
        ("-b:v", bitrate.target_kbps),
        ("-maxrate", bitrate.max_kbps),
        ("-minrate", bitrate.min_kbps),
        ("-bufsize", bitrate.buffer_kbps),
    ];
    for (flag, kbps) in flags {
        if kbps != 0 {
            args.push(flag.to_string());
            args.push(format!("{kbps}k"));
        }
    }
}

/// Encoder invocation: raw RGBA frames on stdin in, H.264 file out.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderCommand {
    program: String,
    resolution: Resolution,
    framerate: u32,
    overwrite: bool,
    preset: Preset,
    rate_control: RateControl,
    output_path: PathBuf,
}

impl EncoderCommand {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            program: ENCODER_NAME.to_string(),
            resolution: Resolution::default(),
            framerate: CAPTURE_FRAMERATE,
            overwrite: true,
            preset: Preset::default(),
            rate_control: RateControl::Quality {
                crf: super::config::DEFAULT_QUALITY,
                cap: None,
            },
            output_path: output_path.into(),
        }
    }

    /// Command for `config`, writing to `output_path`.
    pub fn from_config(config: &SessionConfig, output_path: impl Into<PathBuf>) -> Self {
        Self::new(output_path)
            .with_resolution(config.resolution)
            .with_overwrite(config.overwrite_existing)
            .with_preset(config.preset)
            .with_rate_control(RateControl::from_config(config))
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_rate_control(mut self, rate_control: RateControl) -> Self {
        self.rate_control = rate_control;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn build(&self) -> Vec<String> {
        let mut args = vec![
            // input: raw RGBA frames on stdin
            "-s".to_string(),
            format!("{}x{}", self.resolution.width, self.resolution.height),
            "-framerate".to_string(),
            self.framerate.to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-vcodec".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "-i".to_string(),
            "-".to_string(),
            // output
            "-c:v".to_string(),
            "libx264".to_string(),
            "-threads".to_string(),
            "0".to_string(),
            // glReadPixels rows are bottom-up
            "-vf".to_string(),
            "vflip".to_string(),
            if self.overwrite { "-y" } else { "-n" }.to_string(),
            "-preset".to_string(),
            self.preset.keyword().to_string(),
        ];

        self.rate_control.push_args(&mut args);

        args.extend([
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            self.output_path.to_string_lossy().into_owned(),
        ]);
        args
    }
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.build() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
