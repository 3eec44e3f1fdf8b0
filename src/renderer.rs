use glam::{Vec2, Vec3};

const BACKGROUND_A: Vec3 = Vec3::new(0.1, 0.1, 0.15);
const BACKGROUND_B: Vec3 = Vec3::new(0.15, 0.2, 0.35);
const SQUARE_COLOR: Vec3 = Vec3::new(0.95, 0.6, 0.1);
/// Square edge as a fraction of the shorter framebuffer side.
const SQUARE_SCALE: f32 = 0.2;
const SQUARE_SPEED: Vec2 = Vec2::new(0.37, 0.23);

/// Test pattern: a pulsing background with a square bouncing off the edges.
/// Drawn with clears only, so there is nothing to compile or upload.
pub struct Renderer;

impl Renderer {
    pub fn init() -> Self {
        unsafe {
            gl::Disable(gl::DEPTH_TEST);
        }
        Self
    }

    pub fn draw(&self, width: u32, height: u32, time: f32) {
        let pulse = 0.5 + 0.5 * (time * 0.8).sin();
        let bg = BACKGROUND_A.lerp(BACKGROUND_B, pulse);

        let size = (width.min(height) as f32 * SQUARE_SCALE).max(1.0);
        let travel = Vec2::new(width as f32 - size, height as f32 - size).max(Vec2::ZERO);
        let pos = Vec2::new(bounce(time * SQUARE_SPEED.x), bounce(time * SQUARE_SPEED.y)) * travel;

        unsafe {
            gl::Viewport(0, 0, width as i32, height as i32);
            gl::Disable(gl::SCISSOR_TEST);
            gl::ClearColor(bg.x, bg.y, bg.z, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);

            gl::Enable(gl::SCISSOR_TEST);
            gl::Scissor(pos.x as i32, pos.y as i32, size as i32, size as i32);
            gl::ClearColor(SQUARE_COLOR.x, SQUARE_COLOR.y, SQUARE_COLOR.z, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::Disable(gl::SCISSOR_TEST);
        }
    }
}

/// Triangle wave in [0, 1].
fn bounce(t: f32) -> f32 {
    let f = t.rem_euclid(2.0);
    if f > 1.0 {
        2.0 - f
    } else {
        f
    }
}
