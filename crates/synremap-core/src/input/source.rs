// Synremap Input Layer - Event Source
// The read side of one physical input interface

use std::io;
use std::time::Duration;

use super::device::DeviceCapabilities;
use super::event::RawEvent;

/// One opened input interface.
///
/// A source is moved onto its mapper's read thread after setup, so it must
/// be `Send`. Dropping a source closes it.
pub trait InputSource: Send {
    /// Name the device reports
    fn name(&self) -> &str;

    /// Bus type the device reports (USB, Bluetooth, ...)
    fn bus_type(&self) -> u16;

    fn capabilities(&self) -> DeviceCapabilities;

    /// Take exclusive access so no other reader sees the raw events
    fn grab(&mut self) -> io::Result<()>;

    fn ungrab(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` for events.
    ///
    /// Returns the events in kernel delivery order; an empty batch means the
    /// timeout elapsed. Any error is fatal for the reading loop.
    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>>;
}
