//! Capture frames from an OpenGL render target and stream them into an
//! H.264 video file through an external `ffmpeg` process.
//!
//! The entry point is [`recording::CaptureSession`]: configure it, call
//! [`capture`](recording::CaptureSession::capture) once per rendered frame,
//! and [`finish`](recording::CaptureSession::finish) when done.

pub mod error;
pub mod recording;

pub use error::RecordError;
