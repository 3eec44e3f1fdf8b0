mod app;
mod engine;
mod renderer;

use std::error::Error;
use std::path::PathBuf;

use app::DemoApp;
use clap::{Parser, ValueEnum};
use engine::window::DemoWindow;
use gl_recorder::recording::{
    append_search_paths, Bitrate, CaptureSession, FfmpegLauncher, GlFrameSource, OutputCounter,
    Preset, SessionConfig,
};
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Fastest,
    Faster,
    Fast,
    Balanced,
    Better,
    Best,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Fastest => Preset::Fastest,
            PresetArg::Faster => Preset::Faster,
            PresetArg::Fast => Preset::Fast,
            PresetArg::Balanced => Preset::Balanced,
            PresetArg::Better => Preset::BetterCompression,
            PresetArg::Best => Preset::BestCompression,
        }
    }
}

#[derive(Parser)]
#[command(name = "gl-recorder", about = "Render a test scene and record it to H.264 with ffmpeg")]
struct Args {
    /// JSON session config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the recorded videos
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name prefix, followed by a two-digit number
    #[arg(long)]
    base_name: Option<String>,

    /// Constant rate factor, 0 (best) to 51 (worst)
    #[arg(long, allow_negative_numbers = true)]
    quality: Option<i32>,

    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Encode with -qp 0 instead of a quality factor
    #[arg(long)]
    lossless: bool,

    /// Constant bitrate in kbit/s; replaces quality control
    #[arg(long)]
    bitrate: Option<u32>,

    /// Rate control buffer in kbit/s, used with --bitrate
    #[arg(long, default_value_t = 1835)]
    bufsize: u32,

    /// Never overwrite: skip file numbers that already exist
    #[arg(long)]
    no_overwrite: bool,

    /// Extra directories to search for ffmpeg (repeatable)
    #[arg(long = "ffmpeg-dir")]
    ffmpeg_dirs: Vec<PathBuf>,

    /// Log every PATH entry checked while looking for ffmpeg
    #[arg(long)]
    verbose_discovery: bool,

    /// Stop after capturing this many frames (25 per second)
    #[arg(long)]
    frames: Option<u64>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)?,
            None => SessionConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.set_output_directory(dir);
        }
        if let Some(base) = &self.base_name {
            config.base_name = base.clone();
        }
        if let Some(quality) = self.quality {
            config.set_quality(quality);
        }
        if let Some(preset) = self.preset {
            config.preset = preset.into();
        }
        if let Some(kbps) = self.bitrate {
            config.bitrate = Bitrate::constant(kbps, self.bufsize);
        }
        config.lossless |= self.lossless;
        config.overwrite_existing &= !self.no_overwrite;
        config.verbose_discovery |= self.verbose_discovery;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    append_search_paths(&args.ffmpeg_dirs)?;
    let config = args.session_config()?;

    let sdl = sdl2::init()?;
    let window = DemoWindow::new(&sdl, "gl-recorder", args.width, args.height)?;

    let session = CaptureSession::new(
        config,
        OutputCounter::new(),
        FfmpegLauncher::new(),
        GlFrameSource,
    );
    info!(
        "recording to {} (P pauses, N starts a new file, Esc quits)",
        session.config().output_directory().display()
    );

    let mut app = DemoApp::new(session, args.frames);
    app.run(&sdl, &window)?;
    Ok(())
}
