use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gl_recorder::recording::{
    Bitrate, CaptureSession, Discovery, EncoderCommand, EncoderLauncher, EncoderSink,
    FrameSource, OutputCounter, Resolution, SessionConfig,
};
use gl_recorder::RecordError;

/// Everything the fake encoder saw, shared with the test.
#[derive(Default)]
struct Log {
    spawned: Vec<EncoderCommand>,
    args: Vec<Vec<String>>,
    /// Bytes received by each spawned process, indexed like `spawned`.
    received: Vec<Vec<u8>>,
    closed: usize,
}

#[derive(Clone)]
struct FakeLauncher {
    log: Arc<Mutex<Log>>,
    found: usize,
    fail_spawn: bool,
    /// Result of the direct launch check.
    launches: bool,
    /// Each sink accepts this many writes, then fails.
    writes_before_failure: Option<usize>,
}

impl FakeLauncher {
    fn new() -> Self {
        Self {
            log: Arc::default(),
            found: 1,
            fail_spawn: false,
            launches: true,
            writes_before_failure: None,
        }
    }

    fn missing() -> Self {
        Self {
            found: 0,
            ..Self::new()
        }
    }
}

impl EncoderLauncher for FakeLauncher {
    fn encoder_name(&self) -> &str {
        "fake-ffmpeg"
    }

    fn discover(&self) -> Discovery {
        let checked: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("/bin{i}"))).collect();
        let found = checked
            .iter()
            .take(self.found)
            .map(|dir| dir.join("fake-ffmpeg"))
            .collect();
        Discovery { checked, found }
    }

    fn probe(&self) -> bool {
        self.launches
    }

    fn spawn(&mut self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderSink>> {
        if self.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }
        let mut log = self.log.lock().unwrap();
        log.spawned.push(command.clone());
        log.args.push(command.build());
        log.received.push(Vec::new());
        let index = log.received.len() - 1;
        Ok(Box::new(FakeSink {
            log: Arc::clone(&self.log),
            index,
            writes_left: self.writes_before_failure,
        }))
    }
}

struct FakeSink {
    log: Arc<Mutex<Log>>,
    index: usize,
    writes_left: Option<usize>,
}

impl Write for FakeSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(left) = self.writes_left.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "encoder went away"));
            }
            *left -= 1;
        }
        self.log.lock().unwrap().received[self.index].extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EncoderSink for FakeSink {
    fn close(self: Box<Self>) -> io::Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Fills each frame with a counter byte and remembers the requests.
#[derive(Default)]
struct FakeSource {
    reads: Vec<(i32, i32, Resolution)>,
}

impl FrameSource for FakeSource {
    fn read_rgba(&mut self, x: i32, y: i32, resolution: Resolution, buf: &mut [u8]) {
        assert_eq!(buf.len(), resolution.rgba_frame_len());
        buf.fill(self.reads.len() as u8);
        self.reads.push((x, y, resolution));
    }
}

fn session_in(dir: &std::path::Path, launcher: FakeLauncher) -> CaptureSession<FakeSource> {
    let mut config = SessionConfig::default();
    config.set_output_directory(dir);
    config.base_name = "clip_".to_string();
    CaptureSession::new(config, OutputCounter::new(), launcher, FakeSource::default())
}

#[test]
fn constant_resolution_starts_one_encoder_and_writes_every_frame() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    for _ in 0..10 {
        session.capture(64, 32, 0, 0);
    }

    assert!(session.is_active());
    assert_eq!(session.frames_written(), 10);
    {
        let log = log.lock().unwrap();
        assert_eq!(log.spawned.len(), 1);
        assert_eq!(log.received[0].len(), 10 * 64 * 32 * 4);
        assert_eq!(log.spawned[0].resolution(), Resolution::new(64, 32));
    }

    let output = session.finish().unwrap();
    assert_eq!(output, tmp.path().join("clip_01.mp4"));
    assert!(!session.is_active());
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[test]
fn frames_are_written_verbatim_from_the_source() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(4, 2, 7, 9);
    session.capture(4, 2, 7, 9);

    let log = log.lock().unwrap();
    let frame_len = 4 * 2 * 4;
    assert!(log.received[0][..frame_len].iter().all(|&b| b == 0));
    assert!(log.received[0][frame_len..].iter().all(|&b| b == 1));
    drop(log);
    assert_eq!(session.source_mut().reads[0], (7, 9, Resolution::new(4, 2)));
}

#[test]
fn sequential_sessions_get_increasing_file_names() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = session_in(tmp.path(), FakeLauncher::new());

    assert_eq!(session.start().unwrap(), tmp.path().join("clip_01.mp4"));
    session.finish();
    assert_eq!(session.start().unwrap(), tmp.path().join("clip_02.mp4"));
    session.finish();
}

#[test]
fn querying_the_file_name_does_not_advance_the_counter() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = session_in(tmp.path(), FakeLauncher::new());

    assert_eq!(session.output_file_name(), "clip_00.mp4");
    assert_eq!(session.output_file_name(), "clip_00.mp4");
    session.start().unwrap();
    assert_eq!(session.output_file_name(), "clip_01.mp4");
    assert_eq!(session.output_file_name(), "clip_01.mp4");
    assert_eq!(session.output_video_file_path(), tmp.path().join("clip_01.mp4"));
}

#[test]
fn existing_files_are_skipped_when_not_overwriting() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("clip_01.mp4"), b"taken").unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);
    session.config_mut().overwrite_existing = false;

    let output = session.start().unwrap();

    assert_eq!(output, tmp.path().join("clip_02.mp4"));
    let log = log.lock().unwrap();
    assert!(log.args[0].contains(&"-n".to_string()));
}

#[test]
fn existing_files_are_reused_when_overwriting() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("clip_01.mp4"), b"old").unwrap();
    let mut session = session_in(tmp.path(), FakeLauncher::new());

    assert_eq!(session.start().unwrap(), tmp.path().join("clip_01.mp4"));
}

#[test]
fn shared_counter_keeps_names_distinct_across_sessions() {
    let tmp = tempfile::tempdir().unwrap();
    let counter = OutputCounter::new();
    let mut config = SessionConfig::default();
    config.set_output_directory(tmp.path());
    config.base_name = "clip_".to_string();

    let mut a = CaptureSession::new(
        config.clone(),
        counter.clone(),
        FakeLauncher::new(),
        FakeSource::default(),
    );
    let mut b = CaptureSession::new(config, counter, FakeLauncher::new(), FakeSource::default());

    let first = a.start().unwrap();
    let second = b.start().unwrap();
    assert_ne!(first, second);
    assert_eq!(second, tmp.path().join("clip_02.mp4"));
}

#[test]
fn odd_resolution_is_rounded_and_does_not_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(801, 600, 0, 0);
    assert_eq!(session.config().resolution, Resolution::new(800, 600));
    session.capture(800, 600, 0, 0);
    session.capture(801, 601, 0, 0);

    let log = log.lock().unwrap();
    assert_eq!(log.spawned.len(), 1);
    assert!(log.args[0].contains(&"800x600".to_string()));
}

#[test]
fn resolution_change_closes_the_file_and_starts_another() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(64, 64, 0, 0);
    session.capture(64, 64, 0, 0);
    session.capture(128, 96, 0, 0);

    let log = log.lock().unwrap();
    assert_eq!(log.spawned.len(), 2);
    assert_eq!(log.closed, 1);
    assert_eq!(log.spawned[0].output_path(), tmp.path().join("clip_01.mp4"));
    assert_eq!(log.spawned[1].output_path(), tmp.path().join("clip_02.mp4"));
    // both dimensions are picked up by the same call
    assert_eq!(log.spawned[1].resolution(), Resolution::new(128, 96));
    assert_eq!(log.received[0].len(), 2 * 64 * 64 * 4);
    assert_eq!(log.received[1].len(), 128 * 96 * 4);
}

#[test]
fn capture_dimensions_take_precedence_over_config_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(64, 64, 0, 0);
    session.config_mut().resolution = Resolution::new(32, 32);
    session.capture(64, 64, 0, 0);

    let log = log.lock().unwrap();
    assert_eq!(log.spawned.len(), 1);
    assert_eq!(log.received[0].len(), 2 * 64 * 64 * 4);
}

#[test]
fn missing_encoder_fails_start_and_capture_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::missing();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    match session.start() {
        Err(RecordError::EncoderNotFound { name, checked }) => {
            assert_eq!(name, "fake-ffmpeg");
            assert_eq!(checked.len(), 3);
        }
        other => panic!("expected EncoderNotFound, got {other:?}"),
    }
    assert!(!session.is_active());

    for _ in 0..5 {
        session.capture(64, 64, 0, 0);
    }

    assert!(!session.is_active());
    assert_eq!(session.frames_written(), 0);
    assert!(log.lock().unwrap().spawned.is_empty());
    assert!(session.source_mut().reads.is_empty());
    assert_eq!(session.finish(), None);
}

#[test]
fn failed_automatic_start_is_not_retried() {
    let tmp = tempfile::tempdir().unwrap();
    let mut launcher = FakeLauncher::new();
    launcher.fail_spawn = true;
    let mut session = session_in(tmp.path(), launcher);

    session.capture(64, 64, 0, 0);
    session.capture(64, 64, 0, 0);

    assert!(!session.is_active());
    // only the first automatic start consumed a number
    assert_eq!(session.counter().current(), 1);
    assert!(matches!(session.start(), Err(RecordError::Spawn(_))));
    assert_eq!(session.counter().current(), 2);
}

#[test]
fn failed_write_drops_the_stream_but_keeps_the_session_active() {
    let tmp = tempfile::tempdir().unwrap();
    let mut launcher = FakeLauncher::new();
    launcher.writes_before_failure = Some(2);
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    for _ in 0..5 {
        session.capture(16, 16, 0, 0);
    }

    assert!(session.is_active());
    assert_eq!(session.frames_written(), 2);
    // the failing frame was read, later ones were not
    assert_eq!(session.source_mut().reads.len(), 3);
    {
        let log = log.lock().unwrap();
        assert_eq!(log.spawned.len(), 1);
        assert_eq!(log.received[0].len(), 2 * 16 * 16 * 4);
        assert_eq!(log.closed, 1);
    }

    assert_eq!(session.finish(), Some(tmp.path().join("clip_01.mp4")));
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[test]
fn failed_launch_check_does_not_block_start() {
    let tmp = tempfile::tempdir().unwrap();
    let mut launcher = FakeLauncher::new();
    launcher.launches = false;
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);
    session.config_mut().probe_encoder = true;

    assert_eq!(session.start().unwrap(), tmp.path().join("clip_01.mp4"));
    assert!(session.is_active());
    assert_eq!(log.lock().unwrap().spawned.len(), 1);
}

#[test]
fn exhausted_counter_fails_start_without_spawning() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut config = SessionConfig::default();
    config.set_output_directory(tmp.path());
    let mut session = CaptureSession::new(
        config,
        OutputCounter::starting_at(u32::MAX),
        launcher,
        FakeSource::default(),
    );

    assert!(matches!(session.start(), Err(RecordError::CounterExhausted)));
    assert!(!session.is_active());
    assert_eq!(session.counter().current(), u32::MAX);
    assert!(log.lock().unwrap().spawned.is_empty());
}

#[test]
fn ambiguous_discovery_still_starts() {
    let tmp = tempfile::tempdir().unwrap();
    let mut launcher = FakeLauncher::new();
    launcher.found = 2;
    let mut session = session_in(tmp.path(), launcher);

    assert!(session.start().is_ok());
}

#[test]
fn start_while_active_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = session_in(tmp.path(), FakeLauncher::new());

    session.start().unwrap();
    assert!(matches!(session.start(), Err(RecordError::AlreadyActive)));
    assert_eq!(session.counter().current(), 1);
}

#[test]
fn finish_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(16, 16, 0, 0);
    assert!(session.finish().is_some());
    assert!(session.finish().is_none());
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[test]
fn dropping_an_active_session_closes_the_encoder() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);

    session.capture(16, 16, 0, 0);
    drop(session);

    assert_eq!(log.lock().unwrap().closed, 1);
}

#[test]
fn teardown_reports_the_output_path() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = session_in(tmp.path(), FakeLauncher::new());

    session.capture(16, 16, 0, 0);
    assert_eq!(session.teardown(), Some(tmp.path().join("clip_01.mp4")));
}

#[test]
fn bitrate_spec_replaces_quality_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = session_in(tmp.path(), launcher);
    session.config_mut().set_quality(12);
    session.config_mut().bitrate = Bitrate::constant(4000, 1835);

    session.start().unwrap();

    let log = log.lock().unwrap();
    let args = &log.args[0];
    assert!(args.windows(2).any(|w| w == ["-b:v", "4000k"]));
    assert!(args.windows(2).any(|w| w == ["-bufsize", "1835k"]));
    assert!(!args.contains(&"-crf".to_string()));
    assert!(!args.contains(&"-qp".to_string()));
}

#[test]
fn init_applies_options_then_starts() {
    let tmp = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new();
    let log = Arc::clone(&launcher.log);
    let mut session = CaptureSession::new(
        SessionConfig::default(),
        OutputCounter::starting_at(9),
        launcher,
        FakeSource::default(),
    );

    let output = session
        .init(
            1281,
            720,
            tmp.path().join("videos"),
            "run_",
            false,
            gl_recorder::recording::Preset::Fastest,
            99,
        )
        .unwrap();

    assert_eq!(output, tmp.path().join("videos").join("run_10.mp4"));
    assert!(tmp.path().join("videos").is_dir());
    assert_eq!(session.config().quality(), 51);
    let log = log.lock().unwrap();
    let args = &log.args[0];
    assert!(args.contains(&"1280x720".to_string()));
    assert!(args.windows(2).any(|w| w == ["-preset", "ultrafast"]));
    assert!(args.windows(2).any(|w| w == ["-crf", "51"]));
}
