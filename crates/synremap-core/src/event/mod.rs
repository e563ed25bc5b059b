// Synremap Event Handling
// Source reading and per-event translation

#[cfg(feature = "evdev-backend")]
pub mod r#loop;
mod translate;

#[cfg(feature = "evdev-backend")]
pub use r#loop::EvdevSource;
pub use translate::{Emission, Emissions, EventTranslator};
