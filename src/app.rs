use gl_recorder::recording::command::CAPTURE_FRAMERATE;
use gl_recorder::recording::CaptureSession;
use sdl2::keyboard::Scancode;
use sdl2::Sdl;
use tracing::info;

use crate::engine::input::InputState;
use crate::engine::time::FrameTimer;
use crate::engine::window::DemoWindow;
use crate::renderer::Renderer;

const RECORD_FRAME_INTERVAL: f32 = 1.0 / CAPTURE_FRAMERATE as f32;

pub struct DemoApp {
    renderer: Renderer,
    session: CaptureSession,
    recording: bool,
    record_frame_debt: f32,
    frames_captured: u64,
    /// Stop after this many captured frames; `None` runs until quit.
    max_frames: Option<u64>,
}

impl DemoApp {
    pub fn new(session: CaptureSession, max_frames: Option<u64>) -> Self {
        Self {
            renderer: Renderer::init(),
            session,
            recording: true,
            record_frame_debt: 0.0,
            frames_captured: 0,
            max_frames,
        }
    }

    pub fn run(&mut self, sdl: &Sdl, window: &DemoWindow) -> Result<(), String> {
        let mut event_pump = sdl.event_pump()?;
        let mut input = InputState::new();
        let mut timer = FrameTimer::new();

        loop {
            timer.tick();
            input.update(&mut event_pump);

            if input.quit {
                break;
            }
            self.handle_input(&input);

            let (w, h) = window.drawable_size();
            self.renderer.draw(w, h, timer.elapsed());

            if self.tick_recorder(timer.dt, w, h) {
                break;
            }

            window.swap();
        }

        self.session.finish();
        Ok(())
    }

    fn handle_input(&mut self, input: &InputState) {
        // P pauses and resumes capture within the same file
        if input.pressed(Scancode::P) {
            self.recording = !self.recording;
            info!(recording = self.recording, "capture toggled");
        }
        // N closes the current file; the next capture starts a new one
        if input.pressed(Scancode::N) {
            self.session.finish();
        }
    }

    /// Capture at the encoder's frame rate regardless of render rate.
    /// Returns true once the frame limit is reached.
    fn tick_recorder(&mut self, dt: f32, width: u32, height: u32) -> bool {
        if !self.recording {
            return false;
        }
        self.record_frame_debt += dt;
        while self.record_frame_debt >= RECORD_FRAME_INTERVAL {
            self.session.capture(width, height, 0, 0);
            self.frames_captured += 1;
            self.record_frame_debt -= RECORD_FRAME_INTERVAL;
        }
        self.max_frames
            .is_some_and(|max| self.frames_captured >= max)
    }
}
