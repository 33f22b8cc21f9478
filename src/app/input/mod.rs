//! Keyboard input tracking
//!
//! ```text
//! Raw Input (winit) → InputCollector → InputState → Platform queries
//! ```
//!
//! Edges (`JustPressed`, `JustReleased`) last exactly one frame: the engine
//! calls [`InputCollector::advance_frame`] after every update.

mod collector;
mod keys;
mod state;

pub use collector::InputCollector;
pub use keys::KeyCode;
pub use state::{ButtonState, InputState, KeyboardState, Modifiers};
