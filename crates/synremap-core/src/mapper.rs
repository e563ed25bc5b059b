// Synremap Input Mapper
// Lifecycle of one source interface: setup, read thread, cooperative stop

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use strum_macros::{AsRefStr, Display};

use crate::backend::DeviceBackend;
use crate::event::EventTranslator;
use crate::input::{display_name, InputSource, RawEvent};
use crate::mapping::{MappingConfig, MappingTable};
use crate::output::{OutputSink, PressedKeyState, SinkRole, SinkSpec};
use crate::settings::{Settings, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SINK_SUFFIX, DEFAULT_STOP_TIMEOUT_MS};

/// Lifecycle state of an [`InputMapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MapperState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Errors starting an [`InputMapper`]
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Device path is empty")]
    EmptyDevicePath,

    #[error("Mapper for {0} is already started")]
    AlreadyStarted(String),

    #[error("Mapper for {0} was stopped; create a new mapper to start again")]
    Spent(String),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to grab {path}: {source}")]
    Grab {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create virtual device '{name}': {source}")]
    Sink {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn read thread for {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Thread and naming tunables for a mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    /// Longest single wait for source events before re-checking the stop flag
    pub poll_timeout: Duration,
    /// Bound on how long `stop()` waits for the read thread
    pub stop_timeout: Duration,
    /// Tag appended to virtual device names
    pub sink_suffix: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
            sink_suffix: DEFAULT_SINK_SUFFIX.to_string(),
        }
    }
}

impl From<&Settings> for MapperOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_timeout: settings.poll_timeout(),
            stop_timeout: settings.stop_timeout(),
            sink_suffix: settings.sink_suffix().to_string(),
        }
    }
}

/// State the read thread reports back
#[derive(Debug, Default)]
struct LoopStatus {
    alive: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// Remaps one physical input interface onto virtual sinks.
///
/// `start()` does all fallible setup on the caller's thread and then hands
/// the source and sinks to a dedicated read thread. A mapper runs once:
/// after `stop()` it cannot be started again.
pub struct InputMapper {
    config: MappingConfig,
    mappings: Arc<MappingTable>,
    options: MapperOptions,
    state: MapperState,
    spent: bool,
    running: Arc<AtomicBool>,
    status: Arc<LoopStatus>,
    thread: Option<JoinHandle<()>>,
    finished: Option<mpsc::Receiver<()>>,
}

impl InputMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self::with_options(config, MapperOptions::default())
    }

    pub fn with_options(config: MappingConfig, options: MapperOptions) -> Self {
        let mappings = Arc::new(config.mappings.clone());
        Self {
            config,
            mappings,
            options,
            state: MapperState::Idle,
            spent: false,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(LoopStatus::default()),
            thread: None,
            finished: None,
        }
    }

    pub fn device_path(&self) -> &str {
        &self.config.device_path
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn state(&self) -> MapperState {
        self.state
    }

    /// True while the read thread is processing events
    pub fn is_running(&self) -> bool {
        self.state == MapperState::Running && self.status.alive.load(Ordering::Acquire)
    }

    /// Read error that ended the loop while it was meant to be running
    pub fn last_error(&self) -> Option<String> {
        self.status.last_error.lock().clone()
    }

    /// Open the source, create the sinks and start the read thread.
    ///
    /// Returns only after setup has succeeded; any failure is reported here
    /// and leaves the mapper idle with nothing held open.
    pub fn start<B: DeviceBackend>(&mut self, backend: &B) -> Result<(), MapperError> {
        if self.spent {
            return Err(MapperError::Spent(self.config.device_path.clone()));
        }
        if self.state != MapperState::Idle {
            return Err(MapperError::AlreadyStarted(self.config.device_path.clone()));
        }
        if self.config.device_path.is_empty() {
            return Err(MapperError::EmptyDevicePath);
        }

        self.state = MapperState::Starting;
        match self.launch(backend) {
            Ok(()) => {
                self.state = MapperState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = MapperState::Idle;
                Err(e)
            }
        }
    }

    fn launch<B: DeviceBackend>(&mut self, backend: &B) -> Result<(), MapperError> {
        let path = self.config.device_path.clone();

        let mut source = backend.open_source(&path).map_err(|source| MapperError::Open {
            path: path.clone(),
            source,
        })?;

        if self.config.grab {
            source.grab().map_err(|source| MapperError::Grab {
                path: path.clone(),
                source,
            })?;
        }

        let (keyboard, pointer) = match self.create_sinks(backend, &source) {
            Ok(sinks) => sinks,
            Err(e) => {
                if self.config.grab {
                    if let Err(ungrab_err) = source.ungrab() {
                        log::warn!("[{}] Failed to release grab: {}", path, ungrab_err);
                    }
                }
                return Err(e);
            }
        };

        let translator = EventTranslator::new(
            path.clone(),
            Arc::clone(&self.mappings),
            self.config.passthrough,
            keyboard.is_some(),
            pointer.is_some(),
        );

        log::info!(
            "[{}] Starting '{}' (grab={}, passthrough={}, keyboard sink={}, pointer sink={}, {} mappings)",
            path,
            source.name(),
            self.config.grab,
            self.config.passthrough,
            keyboard.is_some(),
            pointer.is_some(),
            self.mappings.len()
        );

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let read_loop = ReadLoop {
            path: path.clone(),
            source,
            keyboard: keyboard.map(HeldSink::new),
            pointer: pointer.map(HeldSink::new),
            translator,
            grabbed: self.config.grab,
            poll_timeout: self.options.poll_timeout,
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
        };

        self.running.store(true, Ordering::Release);
        self.status.alive.store(true, Ordering::Release);
        *self.status.last_error.lock() = None;

        let spawned = thread::Builder::new()
            .name(format!("synremap {}", display_name(&path)))
            .spawn(move || {
                // Dropped when the loop returns, which wakes `stop()`.
                let _done = done_tx;
                read_loop.run();
            });

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                self.finished = Some(done_rx);
                Ok(())
            }
            Err(source) => {
                self.running.store(false, Ordering::Release);
                self.status.alive.store(false, Ordering::Release);
                Err(MapperError::Spawn { path, source })
            }
        }
    }

    fn create_sinks<B: DeviceBackend>(
        &self,
        backend: &B,
        source: &B::Source,
    ) -> Result<(Option<B::Sink>, Option<B::Sink>), MapperError> {
        let create = |spec: SinkSpec| {
            backend.create_sink(&spec).map_err(|source| MapperError::Sink {
                name: spec.name.clone(),
                source,
            })
        };

        let keyboard = if self.config.passthrough || self.config.needs_keystroke_output() {
            Some(create(SinkSpec::keyboard(
                source.name(),
                source.bus_type(),
                &source.capabilities(),
                &self.mappings,
                &self.options.sink_suffix,
            ))?)
        } else {
            None
        };

        let pointer = if self.config.needs_pointer_output() {
            Some(create(SinkSpec::pointer(
                source.name(),
                source.bus_type(),
                &self.options.sink_suffix,
            ))?)
        } else {
            None
        };

        Ok((keyboard, pointer))
    }

    /// Stop the read thread and wait for it to release the devices.
    ///
    /// No-op unless running. Waits at most the configured stop timeout; a
    /// thread still busy after that is left to finish on its own.
    pub fn stop(&mut self) {
        if self.state != MapperState::Running {
            return;
        }
        let path = self.config.device_path.clone();
        self.state = MapperState::Stopping;
        self.running.store(false, Ordering::Release);

        let finished = match self.finished.take() {
            Some(rx) => !matches!(
                rx.recv_timeout(self.options.stop_timeout),
                Err(RecvTimeoutError::Timeout)
            ),
            None => true,
        };

        if let Some(handle) = self.thread.take() {
            if finished {
                if handle.join().is_err() {
                    log::warn!("[{}] Read thread panicked", path);
                    *self.status.last_error.lock() = Some("read thread panicked".to_string());
                }
            } else {
                log::warn!(
                    "[{}] Read thread did not stop within {:?}; detaching it",
                    path,
                    self.options.stop_timeout
                );
            }
        }

        self.state = MapperState::Idle;
        self.spent = true;
        log::info!("[{}] Stopped", path);
    }
}

impl Drop for InputMapper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InputMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputMapper")
            .field("device_path", &self.config.device_path)
            .field("state", &self.state)
            .field("spent", &self.spent)
            .finish()
    }
}

/// Sink plus the keys currently held down on it
struct HeldSink<K> {
    sink: K,
    pressed: PressedKeyState,
}

impl<K: OutputSink> HeldSink<K> {
    fn new(sink: K) -> Self {
        Self {
            sink,
            pressed: PressedKeyState::new(),
        }
    }

    fn write(&mut self, event: RawEvent) -> io::Result<()> {
        self.sink.write(event)?;
        self.pressed.observe(&event);
        Ok(())
    }

    /// Release whatever is still held so nothing stays stuck once the
    /// virtual device disappears.
    fn release_all(&mut self) -> io::Result<()> {
        for event in self.pressed.drain_releases() {
            self.sink.write(event)?;
        }
        Ok(())
    }
}

/// Everything the read thread owns
struct ReadLoop<S, K> {
    path: String,
    source: S,
    keyboard: Option<HeldSink<K>>,
    pointer: Option<HeldSink<K>>,
    translator: EventTranslator,
    grabbed: bool,
    poll_timeout: Duration,
    running: Arc<AtomicBool>,
    status: Arc<LoopStatus>,
}

impl<S: InputSource, K: OutputSink> ReadLoop<S, K> {
    fn run(mut self) {
        while self.running.load(Ordering::Acquire) {
            let events = match self.source.read_events(self.poll_timeout) {
                Ok(events) => events,
                Err(e) => {
                    if self.running.load(Ordering::Acquire) {
                        log::warn!("[{}] Read failed, stopping: {}", self.path, e);
                        *self.status.last_error.lock() = Some(e.to_string());
                    } else {
                        log::debug!("[{}] Read error after stop: {}", self.path, e);
                    }
                    break;
                }
            };

            for event in events {
                self.dispatch(event);
            }
        }

        self.shutdown();
    }

    fn dispatch(&mut self, event: RawEvent) {
        for emission in self.translator.translate(event) {
            let sink = match emission.role {
                SinkRole::Keyboard => self.keyboard.as_mut(),
                SinkRole::Pointer => self.pointer.as_mut(),
            };
            if let Some(sink) = sink {
                if let Err(e) = sink.write(emission.event) {
                    log::warn!("[{}] Failed to write {:?}: {}", self.path, emission.event, e);
                }
            }
        }
    }

    fn shutdown(mut self) {
        for sink in [self.keyboard.as_mut(), self.pointer.as_mut()].into_iter().flatten() {
            if let Err(e) = sink.release_all() {
                log::warn!("[{}] Failed to release held keys: {}", self.path, e);
            }
        }
        if self.grabbed {
            if let Err(e) = self.source.ungrab() {
                log::warn!("[{}] Failed to release grab: {}", self.path, e);
            }
        }
        self.status.alive.store(false, Ordering::Release);
        log::debug!("[{}] Read loop finished", self.path);
        // Source and sinks close as `self` drops here.
    }
}
