// Synremap Input Layer - Device Description
// Capability sets and interface classification

use std::collections::BTreeSet;
use std::io;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::backend::DeviceBackend;

/// Codes a kernel input device reports it can produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Supported key/button codes (EV_KEY capability codes)
    pub keys: BTreeSet<u16>,
    /// Supported relative axes (EV_REL capability codes)
    pub relative_axes: BTreeSet<u16>,
}

impl DeviceCapabilities {
    pub fn new(
        keys: impl IntoIterator<Item = u16>,
        relative_axes: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            relative_axes: relative_axes.into_iter().collect(),
        }
    }

    /// Check if a specific key code is supported
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.keys.contains(&key_code)
    }

    pub fn supports_relative_axis(&self, axis: u16) -> bool {
        self.relative_axes.contains(&axis)
    }

    /// Whether the device can produce any of the given key codes
    pub fn intersects_keys(&self, codes: &BTreeSet<u16>) -> bool {
        !self.keys.is_disjoint(codes)
    }
}

/// Interface kind derived from the interface path naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Unknown,
}

const KEYBOARD_MARKER: &str = "-kbd";
const MOUSE_MARKER: &str = "-mouse";

/// Classify an interface path without opening it.
pub fn classify(path: &str) -> DeviceKind {
    if path.contains(KEYBOARD_MARKER) {
        DeviceKind::Keyboard
    } else if path.contains(MOUSE_MARKER) {
        DeviceKind::Mouse
    } else {
        DeviceKind::Unknown
    }
}

/// A discovered interface with what it can do.
///
/// Built on demand and never cached: interfaces come and go as the OS
/// re-enumerates the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub path: String,
    pub kind: DeviceKind,
    pub capabilities: DeviceCapabilities,
}

impl DeviceDescriptor {
    /// Open the interface through the backend and read its capabilities.
    pub fn probe<B: DeviceBackend>(backend: &B, path: &str) -> io::Result<Self> {
        Ok(Self {
            path: path.to_string(),
            kind: classify(path),
            capabilities: backend.probe(path)?,
        })
    }
}
