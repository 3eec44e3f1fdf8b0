use sdl2::event::Event;
use sdl2::keyboard::Scancode;
use sdl2::EventPump;

pub enum InputEvent {
    KeyPressed(Scancode),
}

pub struct InputState {
    pub events: Vec<InputEvent>,
    pub quit: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            quit: false,
        }
    }

    pub fn update(&mut self, event_pump: &mut EventPump) {
        self.events.clear();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => self.quit = true,
                Event::KeyDown {
                    scancode: Some(Scancode::Escape),
                    ..
                } => self.quit = true,
                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => self.events.push(InputEvent::KeyPressed(sc)),
                _ => {}
            }
        }
    }

    pub fn pressed(&self, sc: Scancode) -> bool {
        self.events
            .iter()
            .any(|InputEvent::KeyPressed(key)| *key == sc)
    }
}
