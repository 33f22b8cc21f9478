//! Raw input state

use std::collections::{HashMap, HashSet};

use super::keys::KeyCode;

/// Raw input state snapshot for a single frame
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keyboard: KeyboardState,
}

/// Button press state with edge detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Released,
    /// Pressed this frame (edge)
    JustPressed,
    /// Held down (multiple frames)
    Pressed,
    /// Released this frame (edge)
    JustReleased,
}

impl ButtonState {
    /// Advance state for next frame (transitions edges to steady states)
    pub fn advance(self) -> Self {
        match self {
            Self::JustPressed => Self::Pressed,
            Self::JustReleased => Self::Released,
            state => state,
        }
    }

    /// Returns true if button is currently down (just pressed or held)
    pub fn is_down(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    /// Returns true if button was just pressed this frame
    pub fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    /// Returns true if button was just released this frame
    pub fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }
}

/// Keyboard input state
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    /// Keys that are not `Released`
    keys: HashMap<KeyCode, ButtonState>,
    /// Keys that went down since the last advance, even if already released
    pressed_this_frame: HashSet<KeyCode>,
    pub modifiers: Modifiers,
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyboardState {
    pub fn key(&self, key: KeyCode) -> ButtonState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    /// Records a press; OS key repeat of a held key is not a new press
    pub fn press(&mut self, key: KeyCode) {
        let state = self.keys.entry(key).or_default();
        if !state.is_down() {
            *state = ButtonState::JustPressed;
            self.pressed_this_frame.insert(key);
        }
    }

    /// True if the key went down this frame, including a press and release
    /// that both landed between two frames
    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.pressed_this_frame.contains(&key)
    }

    pub fn release(&mut self, key: KeyCode) {
        if let Some(state) = self.keys.get_mut(&key)
            && state.is_down()
        {
            *state = ButtonState::JustReleased;
        }
    }

    /// Releases everything (focus lost)
    pub fn release_all(&mut self) {
        for state in self.keys.values_mut() {
            if state.is_down() {
                *state = ButtonState::JustReleased;
            }
        }
    }

    fn advance(&mut self) {
        for state in self.keys.values_mut() {
            *state = state.advance();
        }
        self.keys.retain(|_, state| *state != ButtonState::Released);
        self.pressed_this_frame.clear();
    }
}

impl InputState {
    /// Creates a new empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance all key states for next frame
    pub fn advance_frame(&mut self) {
        self.keyboard.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_edge_lasts_one_frame() {
        let mut input = InputState::new();
        input.keyboard.press(KeyCode::Escape);
        assert!(input.keyboard.key(KeyCode::Escape).is_just_pressed());

        input.advance_frame();
        assert_eq!(input.keyboard.key(KeyCode::Escape), ButtonState::Pressed);

        // Key repeat while held is not a new edge
        input.keyboard.press(KeyCode::Escape);
        assert_eq!(input.keyboard.key(KeyCode::Escape), ButtonState::Pressed);
    }

    #[test]
    fn test_release_returns_to_default() {
        let mut input = InputState::new();
        input.keyboard.press(KeyCode::Space);
        input.advance_frame();
        input.keyboard.release(KeyCode::Space);
        assert!(input.keyboard.key(KeyCode::Space).is_just_released());

        input.advance_frame();
        assert_eq!(input.keyboard.key(KeyCode::Space), ButtonState::Released);
    }

    #[test]
    fn test_tap_between_frames_is_still_a_press() {
        let mut input = InputState::new();
        input.keyboard.press(KeyCode::Escape);
        input.keyboard.release(KeyCode::Escape);

        assert!(input.keyboard.key(KeyCode::Escape).is_just_released());
        assert!(input.keyboard.was_pressed(KeyCode::Escape));

        input.advance_frame();
        assert!(!input.keyboard.was_pressed(KeyCode::Escape));
    }

    #[test]
    fn test_held_key_is_pressed_once() {
        let mut input = InputState::new();
        input.keyboard.press(KeyCode::Escape);
        input.advance_frame();
        input.keyboard.press(KeyCode::Escape);

        assert!(!input.keyboard.was_pressed(KeyCode::Escape));
    }

    #[test]
    fn test_release_all() {
        let mut input = InputState::new();
        input.keyboard.press(KeyCode::A);
        input.keyboard.press(KeyCode::Escape);
        input.keyboard.release_all();

        assert!(input.keyboard.key(KeyCode::A).is_just_released());
        assert!(input.keyboard.key(KeyCode::Escape).is_just_released());
    }
}
