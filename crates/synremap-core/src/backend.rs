// Synremap Device Backend
// OS seam: opening source interfaces and creating virtual sinks

use std::io;

use crate::input::{DeviceCapabilities, InputSource};
use crate::output::{OutputSink, SinkSpec};

/// Access to physical input interfaces and virtual output devices.
///
/// Mappers and sessions are generic over the backend so they can run
/// against real kernel devices or an in-memory stand-in.
pub trait DeviceBackend {
    type Source: InputSource + 'static;
    type Sink: OutputSink + 'static;

    fn open_source(&self, path: &str) -> io::Result<Self::Source>;

    fn create_sink(&self, spec: &SinkSpec) -> io::Result<Self::Sink>;

    /// Read an interface's capabilities without keeping it open
    fn probe(&self, path: &str) -> io::Result<DeviceCapabilities> {
        Ok(self.open_source(path)?.capabilities())
    }
}

/// Linux evdev sources with uinput sinks
#[cfg(feature = "evdev-backend")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevBackend;

#[cfg(feature = "evdev-backend")]
impl DeviceBackend for EvdevBackend {
    type Source = crate::event::EvdevSource;
    type Sink = crate::output::UInputSink;

    fn open_source(&self, path: &str) -> io::Result<Self::Source> {
        crate::event::EvdevSource::open(path)
    }

    fn create_sink(&self, spec: &SinkSpec) -> io::Result<Self::Sink> {
        Ok(crate::output::UInputSink::create(spec)?)
    }

    fn probe(&self, path: &str) -> io::Result<DeviceCapabilities> {
        crate::event::EvdevSource::probe(path)
    }
}
