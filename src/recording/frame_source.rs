use super::config::Resolution;

/// Where captured pixels come from.
pub trait FrameSource {
    /// Fill `buf` with `resolution` RGBA pixels whose lower-left corner is at
    /// (`x`, `y`). Rows are bottom-up. `buf` is exactly
    /// `resolution.rgba_frame_len()` bytes.
    fn read_rgba(&mut self, x: i32, y: i32, resolution: Resolution, buf: &mut [u8]);
}

/// Reads the currently bound OpenGL read framebuffer.
///
/// The GL context must be current on the calling thread and `gl::load_with`
/// must have run.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlFrameSource;

impl FrameSource for GlFrameSource {
    fn read_rgba(&mut self, x: i32, y: i32, resolution: Resolution, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), resolution.rgba_frame_len());
        unsafe {
            gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
            gl::ReadPixels(
                x,
                y,
                resolution.width as i32,
                resolution.height as i32,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                buf.as_mut_ptr() as *mut _,
            );
        }
    }
}
