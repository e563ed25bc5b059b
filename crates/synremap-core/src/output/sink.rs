// Synremap Output Layer - Virtual Sinks
// Sink abstraction and the capability sets virtual devices advertise

use std::io;

use crate::action::Action;
use crate::codes::{
    self, BTN_EXTRA, BTN_LEFT, BTN_MIDDLE, BTN_RIGHT, BTN_SIDE, REL_WHEEL, REL_X, REL_Y,
};
use crate::input::{DeviceCapabilities, RawEvent};
use crate::mapping::MappingTable;

/// Virtual output device the rest of the system reads remapped events from.
pub trait OutputSink: Send {
    /// Write one event. Events are delivered in call order; a `SYN_REPORT`
    /// closes the current report.
    fn write(&mut self, event: RawEvent) -> io::Result<()>;
}

/// Which of a mapper's two sinks an event goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkRole {
    /// General device mirroring the source plus keystroke targets
    Keyboard,
    /// Mouse-shaped device for scroll and auxiliary button actions
    Pointer,
}

/// Everything needed to create one virtual device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub role: SinkRole,
    pub name: String,
    pub bus_type: u16,
    pub capabilities: DeviceCapabilities,
}

impl SinkSpec {
    pub fn keyboard(
        source_name: &str,
        bus_type: u16,
        source_capabilities: &DeviceCapabilities,
        mappings: &MappingTable,
        suffix: &str,
    ) -> Self {
        Self {
            role: SinkRole::Keyboard,
            name: format!("{} ({})", source_name, suffix),
            bus_type,
            capabilities: keyboard_capabilities(source_capabilities, mappings),
        }
    }

    pub fn pointer(source_name: &str, bus_type: u16, suffix: &str) -> Self {
        Self {
            role: SinkRole::Pointer,
            name: format!("{} ({} pointer)", source_name, suffix),
            bus_type,
            capabilities: pointer_capabilities(),
        }
    }
}

/// Capabilities of the keyboard sink: the source's keys and relative axes,
/// plus whatever the configured actions may emit on it.
pub fn keyboard_capabilities(
    source: &DeviceCapabilities,
    mappings: &MappingTable,
) -> DeviceCapabilities {
    let mut capabilities = source.clone();

    for action in mappings.values() {
        match action {
            Action::Keystroke { target } => {
                if let Some(code) = codes::code_from_name(target) {
                    capabilities.keys.insert(code);
                }
            }
            // Pointer actions fall back to this sink when no pointer sink exists.
            Action::AuxButton1 => {
                capabilities.keys.insert(BTN_SIDE);
            }
            Action::AuxButton2 => {
                capabilities.keys.insert(BTN_EXTRA);
            }
            Action::ScrollUp | Action::ScrollDown => {
                capabilities.relative_axes.insert(REL_WHEEL);
            }
            Action::None => {}
        }
    }

    capabilities
}

/// Standard five-button mouse with wheel and X/Y motion.
pub fn pointer_capabilities() -> DeviceCapabilities {
    DeviceCapabilities::new(
        [BTN_LEFT, BTN_RIGHT, BTN_MIDDLE, BTN_SIDE, BTN_EXTRA],
        [REL_WHEEL, REL_X, REL_Y],
    )
}
