// Synremap evdev Event Source
// Poll-driven reading of one kernel input interface

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;

use evdev::Device;

use crate::input::{DeviceCapabilities, InputSource, RawEvent};

/// One opened evdev interface.
///
/// Reads wait in `poll(2)` with a timeout so the owning thread can notice a
/// stop request between batches. Dropping the source releases any grab.
pub struct EvdevSource {
    device: Device,
    name: String,
    grabbed: bool,
}

impl EvdevSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let device = Device::open(path.as_ref())?;
        let name = device.name().unwrap_or("Unknown").to_string();
        Ok(Self {
            device,
            name,
            grabbed: false,
        })
    }

    /// Capabilities of an interface without keeping it open.
    pub fn probe(path: impl AsRef<Path>) -> io::Result<DeviceCapabilities> {
        Ok(Self::open(path)?.capabilities())
    }

    /// Wait for the fd to become readable.
    ///
    /// `Ok(false)` on timeout or EINTR. Hangup and error conditions mean the
    /// interface went away.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut poll_fd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        let poll_result = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };

        if poll_result < 0 {
            let err = io::Error::last_os_error();
            // A signal landed; the caller re-checks its running flag.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        if poll_result == 0 {
            return Ok(false);
        }
        if poll_fd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("input device '{}' disconnected", self.name),
            ));
        }
        Ok(poll_fd.revents & libc::POLLIN != 0)
    }
}

impl InputSource for EvdevSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn bus_type(&self) -> u16 {
        self.device.input_id().bus_type().0
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let keys = self
            .device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| key.code()).collect::<Vec<_>>())
            .unwrap_or_default();
        let axes = self
            .device
            .supported_relative_axes()
            .map(|axes| axes.iter().map(|axis| axis.0).collect::<Vec<_>>())
            .unwrap_or_default();
        DeviceCapabilities::new(keys, axes)
    }

    fn grab(&mut self) -> io::Result<()> {
        if !self.grabbed {
            self.device.grab()?;
            self.grabbed = true;
        }
        Ok(())
    }

    fn ungrab(&mut self) -> io::Result<()> {
        if self.grabbed {
            self.grabbed = false;
            self.device.ungrab()?;
        }
        Ok(())
    }

    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>> {
        if !self.wait_readable(timeout)? {
            return Ok(Vec::new());
        }

        match self.device.fetch_events() {
            Ok(events) => Ok(events
                .map(|event| RawEvent::new(event.event_type().0, event.code(), event.value()))
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Ungrab on every exit path, unwinding included. A device left grabbed
/// stays unusable to the rest of the system.
impl Drop for EvdevSource {
    fn drop(&mut self) {
        if let Err(e) = self.ungrab() {
            log::warn!("Failed to release grab on '{}': {}", self.name, e);
        }
    }
}
