// Synremap uinput Output Layer
// Virtual device creation and report-batched event emission

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key, RelativeAxisType};

use super::sink::{OutputSink, SinkSpec};
use crate::codes::EV_SYN;
use crate::input::RawEvent;

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device '{name}': {source}")]
    DeviceCreation {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write event: {0}")]
    WriteError(#[source] io::Error),
}

impl UInputError {
    fn kind(&self) -> io::ErrorKind {
        match self {
            UInputError::DeviceCreation { source, .. } => source.kind(),
            UInputError::WriteError(source) => source.kind(),
        }
    }
}

impl From<UInputError> for io::Error {
    fn from(err: UInputError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Virtual uinput device fed with [`RawEvent`]s.
///
/// The kernel API appends its own `SYN_REPORT` to every emitted batch, so
/// events are held until the caller's `SYN_REPORT` arrives and then sent as
/// one report. Other `EV_SYN` codes are not forwarded.
pub struct UInputSink {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UInputSink {
    pub fn create(spec: &SinkSpec) -> Result<Self, UInputError> {
        let creation = |source: io::Error| UInputError::DeviceCreation {
            name: spec.name.clone(),
            source,
        };

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(creation)?
            .name(&spec.name)
            .input_id(InputId::new(BusType(spec.bus_type), 0, 0, 0));

        if !spec.capabilities.keys.is_empty() {
            let mut keys = AttributeSet::<Key>::new();
            for code in &spec.capabilities.keys {
                keys.insert(Key::new(*code));
            }
            builder = builder.with_keys(&keys).map_err(creation)?;
        }

        if !spec.capabilities.relative_axes.is_empty() {
            let mut axes = AttributeSet::<RelativeAxisType>::new();
            for axis in &spec.capabilities.relative_axes {
                axes.insert(RelativeAxisType(*axis));
            }
            builder = builder.with_relative_axes(&axes).map_err(creation)?;
        }

        let device = builder.build().map_err(creation)?;
        log::debug!("Created virtual device '{}'", spec.name);

        Ok(Self {
            device,
            pending: Vec::with_capacity(8),
        })
    }

    fn flush(&mut self) -> Result<(), UInputError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result.map_err(UInputError::WriteError)
    }
}

impl OutputSink for UInputSink {
    fn write(&mut self, event: RawEvent) -> io::Result<()> {
        if event.is_sync_report() {
            return Ok(self.flush()?);
        }
        if event.kind == EV_SYN {
            return Ok(());
        }
        self.pending
            .push(InputEvent::new(EventType(event.kind), event.code, event.value));
        Ok(())
    }
}
