pub mod command;
pub mod config;
pub mod counter;
pub mod frame_source;
pub mod launcher;
pub mod search_path;
pub mod session;

pub use command::{EncoderCommand, RateControl};
pub use config::{Bitrate, Preset, Resolution, SessionConfig};
pub use counter::OutputCounter;
pub use frame_source::{FrameSource, GlFrameSource};
pub use launcher::{EncoderLauncher, EncoderSink, FfmpegLauncher};
pub use search_path::{append_search_path, append_search_paths, Discovery};
pub use session::CaptureSession;
