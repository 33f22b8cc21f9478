//! Platform queries available to application callbacks

use winit::event::WindowEvent;

use super::input::{InputCollector, KeyCode};

/// Window size and keyboard state as seen by the current frame
#[derive(Debug)]
pub struct Platform {
    input: InputCollector,
    window_size: (u32, u32),
}

impl Platform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            input: InputCollector::new(),
            window_size: (width, height),
        }
    }

    /// Current window size in physical pixels
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// True on the frame the key went down, even if it was released again
    /// before the frame ran
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.input.state().keyboard.was_pressed(key)
    }

    /// True while the key is held
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.input.state().keyboard.key(key).is_down()
    }

    pub fn key_released(&self, key: KeyCode) -> bool {
        self.input.state().keyboard.key(key).is_just_released()
    }

    /// Feeds a window event into the input state
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::Resized(size) = event {
            self.set_window_size(size.width, size.height);
        }
        self.input.handle_window_event(event);
    }

    /// Injects a key press without a window (headless runs, tests)
    pub fn press_key(&mut self, key: KeyCode) {
        self.input.state_mut().keyboard.press(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.input.state_mut().keyboard.release(key);
    }

    /// Ends the frame: input edges become steady states
    pub fn advance_frame(&mut self) {
        self.input.advance_frame();
    }
}
