// Synremap Output Layer
// Virtual sinks, their capability sets and held-key tracking

mod sink;
mod state;

#[cfg(feature = "evdev-backend")]
mod uinput;

pub use sink::{keyboard_capabilities, pointer_capabilities, OutputSink, SinkRole, SinkSpec};
pub use state::PressedKeyState;

#[cfg(feature = "evdev-backend")]
pub use uinput::{UInputError, UInputSink};
