use std::ffi::OsStr;
use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use super::command::{EncoderCommand, ENCODER_NAME};
use super::search_path::{self, Discovery};

/// Write end of a running encoder. Frames go in through [`Write`];
/// [`close`](EncoderSink::close) signals end of input and waits for the
/// encoder to finalize the file.
pub trait EncoderSink: Write + Send {
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Finds and starts encoder processes.
pub trait EncoderLauncher: Send {
    /// Name of the executable, without platform suffix.
    fn encoder_name(&self) -> &str;

    fn discover(&self) -> Discovery;

    /// Whether the encoder can be launched at all.
    fn probe(&self) -> bool;

    fn spawn(&mut self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderSink>>;
}

/// Launches `ffmpeg` from `PATH` with `std::process`.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    program: String,
}

impl FfmpegLauncher {
    pub fn new() -> Self {
        Self::with_program(ENCODER_NAME)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderLauncher for FfmpegLauncher {
    fn encoder_name(&self) -> &str {
        &self.program
    }

    fn discover(&self) -> Discovery {
        search_path::discover_in_env(&self.program)
    }

    fn probe(&self) -> bool {
        search_path::probe_invocation(OsStr::new(&self.program))
    }

    fn spawn(&mut self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderSink>> {
        let mut child = Command::new(command.program())
            .args(command.build())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("ffmpeg stdin was not piped"))?;

        Ok(Box::new(ProcessSink { child, stdin }))
    }
}

struct ProcessSink {
    child: Child,
    stdin: ChildStdin,
}

impl Write for ProcessSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdin.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stdin.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }
}

impl EncoderSink for ProcessSink {
    fn close(self: Box<Self>) -> io::Result<()> {
        let ProcessSink { mut child, stdin } = *self;
        // EOF on stdin tells ffmpeg to finalize the container
        drop(stdin);
        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!("ffmpeg exited with status {status}")));
        }
        Ok(())
    }
}
