use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::RecordError;

pub const MAX_QUALITY: i32 = 51;
pub const DEFAULT_QUALITY: u32 = 23;
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Encoder speed / compression trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Fastest,
    Faster,
    Fast,
    #[default]
    Balanced,
    BetterCompression,
    BestCompression,
}

impl Preset {
    /// The x264 `-preset` keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Preset::Fastest => "ultrafast",
            Preset::Faster => "superfast",
            Preset::Fast => "faster",
            Preset::Balanced => "medium",
            Preset::BetterCompression => "slow",
            Preset::BestCompression => "veryslow",
        }
    }
}

/// Bitrate limits in kbit/s. A zero field is left out of the command line.
///
/// With a non-zero `target_kbps` this replaces quality-based control. With
/// only `max_kbps`/`buffer_kbps` set it caps a quality-based encode instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bitrate {
    pub use_bitrate: bool,
    pub target_kbps: u32,
    pub min_kbps: u32,
    pub max_kbps: u32,
    pub buffer_kbps: u32,
}

impl Bitrate {
    /// Constant bitrate: target = min = max.
    pub fn constant(kbps: u32, buffer_kbps: u32) -> Self {
        Self {
            use_bitrate: true,
            target_kbps: kbps,
            min_kbps: kbps,
            max_kbps: kbps,
            buffer_kbps,
        }
    }

    /// Quality-based encode that may not exceed `max_kbps`.
    pub fn capped(max_kbps: u32, buffer_kbps: u32) -> Self {
        Self {
            use_bitrate: true,
            max_kbps,
            buffer_kbps,
            ..Self::default()
        }
    }

    pub fn controls_rate(&self) -> bool {
        self.use_bitrate && self.target_kbps != 0
    }
}

/// Capture resolution. Both dimensions are kept even, as `yuv420p` requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawResolution")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: even(width),
            height: even(height),
        }
    }

    pub fn rgba_frame_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }

    /// Adopt `width`x`height` (rounded down to even) and report whether
    /// anything changed. Each dimension is compared on its own, so a call
    /// that changes both picks up both.
    pub fn update(&mut self, width: u32, height: u32) -> bool {
        let next = Self::new(width, height);
        let changed = next != *self;
        *self = next;
        changed
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Resolution as written in a config file, before rounding.
#[derive(Deserialize)]
struct RawResolution {
    width: u32,
    height: u32,
}

impl From<RawResolution> for Resolution {
    fn from(raw: RawResolution) -> Self {
        Self::new(raw.width, raw.height)
    }
}

fn even(n: u32) -> u32 {
    n - n % 2
}

fn clamped_quality<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let crf = i64::deserialize(deserializer)?;
    Ok(crf.clamp(0, i64::from(MAX_QUALITY)) as u32)
}

/// Everything a [`CaptureSession`](super::CaptureSession) needs to know before
/// it starts an encoder. Loadable from JSON; missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    output_directory: PathBuf,
    pub base_name: String,
    pub resolution: Resolution,
    pub overwrite_existing: bool,
    #[serde(deserialize_with = "clamped_quality")]
    quality: u32,
    pub lossless: bool,
    pub bitrate: Bitrate,
    pub preset: Preset,
    /// Log every search path entry during encoder discovery, not only when
    /// discovery is inconclusive.
    pub verbose_discovery: bool,
    /// Also try launching the encoder with no arguments before starting.
    pub probe_encoder: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("./"),
            base_name: "ibr_video_".to_string(),
            resolution: Resolution::default(),
            overwrite_existing: true,
            quality: DEFAULT_QUALITY,
            lossless: false,
            bitrate: Bitrate::default(),
            preset: Preset::default(),
            verbose_discovery: false,
            probe_encoder: false,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let text = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        let dir = std::mem::take(&mut config.output_directory);
        config.set_output_directory(dir);
        Ok(config)
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Set where videos are written, creating the directory if needed.
    /// An empty path falls back to the current directory. A directory that
    /// cannot be created is only logged; spawning the encoder will report it.
    pub fn set_output_directory(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            warn!("empty output directory given, using ./");
            self.output_directory = PathBuf::from("./");
            return;
        }
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("failed to create output directory {}: {e}", dir.display());
        }
        self.output_directory = dir;
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }

    /// Constant rate factor, clamped to [0, 51]. Lower is better.
    pub fn set_quality(&mut self, crf: i32) {
        self.quality = crf.clamp(0, MAX_QUALITY) as u32;
    }

    /// `<base_name><NN>.mp4` for the given counter value.
    pub fn file_name(&self, number: u32) -> String {
        format!("{}{:02}{}", self.base_name, number, VIDEO_EXTENSION)
    }
}
