//! Key codes understood by the platform layer

use winit::keyboard::KeyCode as WinitKey;

/// Key code (subset of physical keys applications query)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    // Common keys
    Space,
    Enter,
    Escape,
    Backspace,
    Tab,

    // Letters
    A,
    D,
    Q,
    S,
    W,

    // Arrows
    Up,
    Down,
    Left,
    Right,
}

impl KeyCode {
    /// Maps a winit physical key, if it is one we track
    pub fn from_winit(key: WinitKey) -> Option<Self> {
        let key = match key {
            WinitKey::Space => Self::Space,
            WinitKey::Enter => Self::Enter,
            WinitKey::Escape => Self::Escape,
            WinitKey::Backspace => Self::Backspace,
            WinitKey::Tab => Self::Tab,
            WinitKey::KeyA => Self::A,
            WinitKey::KeyD => Self::D,
            WinitKey::KeyQ => Self::Q,
            WinitKey::KeyS => Self::S,
            WinitKey::KeyW => Self::W,
            WinitKey::ArrowUp => Self::Up,
            WinitKey::ArrowDown => Self::Down,
            WinitKey::ArrowLeft => Self::Left,
            WinitKey::ArrowRight => Self::Right,
            _ => return None,
        };
        Some(key)
    }
}
