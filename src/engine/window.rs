use sdl2::video::{GLContext, GLProfile, Window};
use sdl2::Sdl;

pub struct DemoWindow {
    _gl_context: GLContext,
    window: Window,
}

impl DemoWindow {
    pub fn new(sdl: &Sdl, title: &str, width: u32, height: u32) -> Result<Self, String> {
        let video = sdl.video()?;

        let gl_attr = video.gl_attr();
        gl_attr.set_context_profile(GLProfile::Core);
        gl_attr.set_context_version(3, 3);

        let window = video
            .window(title, width, height)
            .opengl()
            .resizable()
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let gl_context = window.gl_create_context()?;

        gl::load_with(|s| video.gl_get_proc_address(s) as *const _);

        Ok(Self {
            _gl_context: gl_context,
            window,
        })
    }

    pub fn swap(&self) {
        self.window.gl_swap_window();
    }

    /// Framebuffer size in pixels. Differs from the window size on HiDPI.
    pub fn drawable_size(&self) -> (u32, u32) {
        self.window.drawable_size()
    }
}
