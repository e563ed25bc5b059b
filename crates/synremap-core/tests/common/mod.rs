// Shared test support: an in-memory device backend with scripted sources
// and recording sinks.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use synremap_core::{
    DeviceBackend, DeviceCapabilities, InputSource, OutputSink, RawEvent, SinkRole, SinkSpec,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One scripted read result
#[derive(Debug, Clone)]
pub enum Step {
    Events(Vec<RawEvent>),
    Fail(io::ErrorKind),
    /// Block inside the read for this long, ignoring the poll timeout
    Stall(Duration),
}

/// A fake physical interface. Clones share the script and grab state.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub name: String,
    pub bus_type: u16,
    pub capabilities: DeviceCapabilities,
    pub fail_grab: bool,
    pub fail_ungrab: bool,
    script: Arc<Mutex<VecDeque<Step>>>,
    grabbed: Arc<AtomicBool>,
    grab_count: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub fn new(name: &str, keys: impl IntoIterator<Item = u16>) -> Self {
        Self {
            name: name.to_string(),
            bus_type: 0x03,
            capabilities: DeviceCapabilities::new(keys, []),
            fail_grab: false,
            fail_ungrab: false,
            script: Arc::new(Mutex::new(VecDeque::new())),
            grabbed: Arc::new(AtomicBool::new(false)),
            grab_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_fail_grab(mut self) -> Self {
        self.fail_grab = true;
        self
    }

    pub fn with_fail_ungrab(mut self) -> Self {
        self.fail_ungrab = true;
        self
    }

    pub fn push_events(&self, events: Vec<RawEvent>) {
        self.script.lock().push_back(Step::Events(events));
    }

    pub fn push(&self, step: Step) {
        self.script.lock().push_back(step);
    }

    pub fn is_drained(&self) -> bool {
        self.script.lock().is_empty()
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed.load(Ordering::SeqCst)
    }

    pub fn grab_count(&self) -> usize {
        self.grab_count.load(Ordering::SeqCst)
    }
}

pub struct FakeSource {
    device: FakeDevice,
}

impl InputSource for FakeSource {
    fn name(&self) -> &str {
        &self.device.name
    }

    fn bus_type(&self) -> u16 {
        self.device.bus_type
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.device.capabilities.clone()
    }

    fn grab(&mut self) -> io::Result<()> {
        if self.device.fail_grab {
            return Err(io::Error::new(io::ErrorKind::ResourceBusy, "device busy"));
        }
        self.device.grabbed.store(true, Ordering::SeqCst);
        self.device.grab_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn ungrab(&mut self) -> io::Result<()> {
        if self.device.fail_ungrab {
            return Err(io::Error::new(io::ErrorKind::NotFound, "device gone"));
        }
        self.device.grabbed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_events(&mut self, timeout: Duration) -> io::Result<Vec<RawEvent>> {
        let step = self.device.script.lock().pop_front();
        match step {
            Some(Step::Events(events)) => Ok(events),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            Some(Step::Stall(duration)) => {
                thread::sleep(duration);
                Ok(Vec::new())
            }
            None => {
                thread::sleep(timeout.min(Duration::from_millis(2)));
                Ok(Vec::new())
            }
        }
    }
}

/// Events written to one created sink
#[derive(Debug, Clone)]
pub struct CreatedSink {
    pub spec: SinkSpec,
    pub events: Arc<Mutex<Vec<RawEvent>>>,
}

impl CreatedSink {
    pub fn events(&self) -> Vec<RawEvent> {
        self.events.lock().clone()
    }

    pub fn key_events(&self) -> Vec<RawEvent> {
        self.events().into_iter().filter(RawEvent::is_key).collect()
    }
}

pub struct RecordingSink {
    events: Arc<Mutex<Vec<RawEvent>>>,
}

impl OutputSink for RecordingSink {
    fn write(&mut self, event: RawEvent) -> io::Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    devices: Mutex<HashMap<String, FakeDevice>>,
    sinks: Mutex<Vec<CreatedSink>>,
    fail_sinks: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, path: &str, device: FakeDevice) -> FakeDevice {
        self.devices.lock().insert(path.to_string(), device.clone());
        device
    }

    pub fn fail_sink_creation(&self) {
        self.fail_sinks.store(true, Ordering::SeqCst);
    }

    pub fn sinks(&self) -> Vec<CreatedSink> {
        self.sinks.lock().clone()
    }

    /// Most recently created sink with this role
    pub fn sink(&self, role: SinkRole) -> Option<CreatedSink> {
        self.sinks
            .lock()
            .iter()
            .rev()
            .find(|sink| sink.spec.role == role)
            .cloned()
    }
}

impl DeviceBackend for FakeBackend {
    type Source = FakeSource;
    type Sink = RecordingSink;

    fn open_source(&self, path: &str) -> io::Result<FakeSource> {
        self.devices
            .lock()
            .get(path)
            .cloned()
            .map(|device| FakeSource { device })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path)))
    }

    fn create_sink(&self, spec: &SinkSpec) -> io::Result<RecordingSink> {
        if self.fail_sinks.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "uinput not writable",
            ));
        }
        let events = Arc::new(Mutex::new(Vec::new()));
        self.sinks.lock().push(CreatedSink {
            spec: spec.clone(),
            events: Arc::clone(&events),
        });
        Ok(RecordingSink { events })
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
