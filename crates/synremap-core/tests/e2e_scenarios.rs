// Synremap End-to-End Test Scenarios
//
// Each scenario runs a real InputMapper read thread against the in-memory
// backend: scripted source reports in, recorded sink writes out.
//
// Run with: cargo test --test e2e_scenarios

mod common;

use std::io;
use std::time::{Duration, Instant};

use common::{init_logging, wait_until, FakeBackend, FakeDevice, Step};
use synremap_core::codes::{BTN_EXTRA, BTN_SIDE, KEY_F13, REL_WHEEL};
use synremap_core::{
    Action, InputMapper, MapperError, MapperOptions, MapperState, MappingConfig, MappingTable,
    RawEvent, SinkRole,
};

const PATH: &str = "/dev/input/by-id/usb-Razer_Razer_Naga-event-kbd";
const KEY_A: u16 = 30;
const KEY_B: u16 = 48;
const KEY_S: u16 = 31;

fn table(entries: &[(&str, Action)]) -> MappingTable {
    entries
        .iter()
        .map(|(code, action)| (code.to_string(), action.clone()))
        .collect()
}

fn fast_options() -> MapperOptions {
    MapperOptions {
        poll_timeout: Duration::from_millis(5),
        stop_timeout: Duration::from_millis(500),
        sink_suffix: "synremap".to_string(),
    }
}

fn mapper(config: MappingConfig) -> InputMapper {
    InputMapper::with_options(config, fast_options())
}

fn naga(backend: &FakeBackend) -> FakeDevice {
    backend.add_device(PATH, FakeDevice::new("Razer Naga", [KEY_A, KEY_S, KEY_F13]))
}

/// Wait for the script to be consumed, then stop the mapper.
fn drain_and_stop(device: &FakeDevice, mapper: &mut InputMapper) {
    assert!(wait_until(Duration::from_secs(2), || device.is_drained()));
    mapper.stop();
}

// =========================================================================
// Remapping
// =========================================================================

#[test]
fn test_f13_scrolls_and_other_keys_pass_through() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![RawEvent::key(KEY_F13, 1), RawEvent::sync()]);
    device.push_events(vec![RawEvent::key(KEY_F13, 0), RawEvent::sync()]);
    device.push_events(vec![
        RawEvent::key(KEY_A, 1),
        RawEvent::sync(),
        RawEvent::key(KEY_A, 0),
        RawEvent::sync(),
    ]);

    let config = MappingConfig::new(PATH, table(&[("KEY_F13", Action::ScrollUp)]))
        .with_grab(false)
        .with_passthrough(true);
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    assert!(!device.is_grabbed());
    drain_and_stop(&device, &mut mapper);

    let pointer = backend.sink(SinkRole::Pointer).unwrap();
    assert_eq!(
        pointer.events(),
        vec![RawEvent::relative(REL_WHEEL, 1), RawEvent::sync()]
    );

    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert!(keyboard.events().iter().all(|e| e.code != KEY_F13 || !e.is_key()));
    assert_eq!(
        keyboard.key_events(),
        vec![RawEvent::key(KEY_A, 1), RawEvent::key(KEY_A, 0)]
    );
    assert_eq!(device.grab_count(), 0);
}

#[test]
fn test_scan_code_mapping_only_within_its_report() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![
        RawEvent::scan(70068),
        RawEvent::key(KEY_F13, 1),
        RawEvent::sync(),
    ]);
    // Same key, next report, no scan code: not mapped.
    device.push_events(vec![RawEvent::key(KEY_F13, 1), RawEvent::sync()]);

    let config = MappingConfig::new(PATH, table(&[("MSC_SCAN:0x111b4", Action::AuxButton1)]))
        .with_grab(false);
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    drain_and_stop(&device, &mut mapper);

    let pointer = backend.sink(SinkRole::Pointer).unwrap();
    assert_eq!(
        pointer.events(),
        vec![
            RawEvent::key(BTN_SIDE, 1),
            RawEvent::key(BTN_SIDE, 0),
            RawEvent::sync()
        ]
    );

    // The passed-through press is still held at stop and gets released.
    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert_eq!(
        keyboard.key_events(),
        vec![RawEvent::key(KEY_F13, 1), RawEvent::key(KEY_F13, 0)]
    );
    assert!(keyboard.events().iter().all(|e| !e.is_scan()));
}

#[test]
fn test_keystroke_remap_without_passthrough() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![RawEvent::key(KEY_A, 1), RawEvent::sync()]);
    device.push_events(vec![RawEvent::key(KEY_S, 1), RawEvent::sync()]);
    device.push_events(vec![RawEvent::key(KEY_A, 0), RawEvent::sync()]);

    let config = MappingConfig::new(PATH, table(&[("KEY_A", Action::keystroke("KEY_B"))]))
        .with_passthrough(false);
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    assert!(device.is_grabbed());
    drain_and_stop(&device, &mut mapper);
    assert!(!device.is_grabbed());

    assert!(backend.sink(SinkRole::Pointer).is_none());
    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert!(keyboard.spec.capabilities.supports_key(KEY_B));
    assert_eq!(
        keyboard.events(),
        vec![
            RawEvent::key(KEY_B, 1),
            RawEvent::sync(),
            RawEvent::key(KEY_B, 0),
            RawEvent::sync()
        ]
    );
}

#[test]
fn test_aux_button_repeats_and_releases_ignored() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![
        RawEvent::key(KEY_F13, 1),
        RawEvent::sync(),
        RawEvent::key(KEY_F13, 2),
        RawEvent::sync(),
        RawEvent::key(KEY_F13, 0),
        RawEvent::sync(),
    ]);

    let config = MappingConfig::new(PATH, table(&[("183", Action::AuxButton2)]))
        .with_grab(false)
        .with_passthrough(false);
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    drain_and_stop(&device, &mut mapper);

    assert!(backend.sink(SinkRole::Keyboard).is_none());
    let pointer = backend.sink(SinkRole::Pointer).unwrap();
    assert_eq!(
        pointer.events(),
        vec![
            RawEvent::key(BTN_EXTRA, 1),
            RawEvent::key(BTN_EXTRA, 0),
            RawEvent::sync()
        ]
    );
}

#[test]
fn test_none_action_swallows_key() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![
        RawEvent::key(KEY_A, 1),
        RawEvent::sync(),
        RawEvent::key(KEY_A, 0),
        RawEvent::sync(),
    ]);

    let config = MappingConfig::new(PATH, table(&[("KEY_A", Action::None)])).with_grab(false);
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    drain_and_stop(&device, &mut mapper);

    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert!(keyboard.key_events().is_empty());
    assert_eq!(keyboard.events(), vec![RawEvent::sync(), RawEvent::sync()]);
}

#[test]
fn test_sink_specs() {
    init_logging();
    let backend = FakeBackend::new();
    naga(&backend);

    let config = MappingConfig::new(
        PATH,
        table(&[
            ("KEY_F13", Action::ScrollDown),
            ("KEY_A", Action::keystroke("KEY_VOLUMEUP")),
        ]),
    );
    let mut mapper = mapper(config);
    mapper.start(&backend).unwrap();
    mapper.stop();

    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert_eq!(keyboard.spec.name, "Razer Naga (synremap)");
    assert_eq!(keyboard.spec.bus_type, 0x03);
    assert!(keyboard.spec.capabilities.supports_key(KEY_A));
    assert!(keyboard.spec.capabilities.supports_key(115));

    let pointer = backend.sink(SinkRole::Pointer).unwrap();
    assert_eq!(pointer.spec.name, "Razer Naga (synremap pointer)");
    assert!(pointer.spec.capabilities.supports_relative_axis(REL_WHEEL));
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_start_fails_synchronously_for_missing_device() {
    init_logging();
    let backend = FakeBackend::new();
    let mut mapper = mapper(MappingConfig::new("/dev/input/event99", MappingTable::new()));

    let err = mapper.start(&backend).unwrap_err();
    assert!(matches!(err, MapperError::Open { ref path, .. } if path == "/dev/input/event99"));
    assert_eq!(mapper.state(), MapperState::Idle);
    assert!(!mapper.is_running());
    assert!(backend.sinks().is_empty());
}

#[test]
fn test_empty_device_path_rejected() {
    let backend = FakeBackend::new();
    let mut mapper = mapper(MappingConfig::new("", MappingTable::new()));
    assert!(matches!(
        mapper.start(&backend),
        Err(MapperError::EmptyDevicePath)
    ));
}

#[test]
fn test_grab_failure_reported() {
    init_logging();
    let backend = FakeBackend::new();
    backend.add_device(PATH, FakeDevice::new("Razer Naga", [KEY_A]).with_fail_grab());

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    let err = mapper.start(&backend).unwrap_err();
    assert!(matches!(err, MapperError::Grab { .. }));
    assert!(err.to_string().contains(PATH));
    assert_eq!(mapper.state(), MapperState::Idle);
}

#[test]
fn test_sink_failure_releases_grab() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    backend.fail_sink_creation();

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    let err = mapper.start(&backend).unwrap_err();
    match err {
        MapperError::Sink { name, source } => {
            assert_eq!(name, "Razer Naga (synremap)");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(device.grab_count(), 1);
    assert!(!device.is_grabbed());
}

#[test]
fn test_sink_failure_reported_when_release_also_fails() {
    init_logging();
    let backend = FakeBackend::new();
    let device = FakeDevice::new("Razer Naga", [KEY_A]).with_fail_ungrab();
    let device = backend.add_device(PATH, device);
    backend.fail_sink_creation();

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    let err = mapper.start(&backend).unwrap_err();
    assert!(matches!(err, MapperError::Sink { .. }), "unexpected error: {}", err);
    assert_eq!(mapper.state(), MapperState::Idle);
    assert_eq!(device.grab_count(), 1);
}

#[test]
fn test_double_start_and_restart_rejected() {
    init_logging();
    let backend = FakeBackend::new();
    naga(&backend);

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    mapper.start(&backend).unwrap();
    assert_eq!(mapper.state(), MapperState::Running);
    assert!(mapper.is_running());
    assert!(matches!(
        mapper.start(&backend),
        Err(MapperError::AlreadyStarted(_))
    ));

    mapper.stop();
    assert_eq!(mapper.state(), MapperState::Idle);
    assert!(!mapper.is_running());
    assert!(matches!(mapper.start(&backend), Err(MapperError::Spent(_))));
}

#[test]
fn test_stop_is_idempotent() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    mapper.stop();
    mapper.start(&backend).unwrap();
    mapper.stop();
    mapper.stop();
    assert!(!device.is_grabbed());
    assert_eq!(mapper.last_error(), None);
}

#[test]
fn test_read_error_while_running_ends_loop() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push_events(vec![RawEvent::key(KEY_A, 1), RawEvent::sync()]);
    device.push(Step::Fail(io::ErrorKind::Other));
    device.push_events(vec![RawEvent::key(KEY_S, 1), RawEvent::sync()]);

    let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
    mapper.start(&backend).unwrap();

    assert!(wait_until(Duration::from_secs(2), || !mapper.is_running()));
    assert_eq!(mapper.state(), MapperState::Running);
    let error = mapper.last_error().unwrap();
    assert!(error.contains("scripted read failure"));
    assert!(!device.is_grabbed());

    // The report after the failure was never read.
    assert!(!device.is_drained());
    // A held key is released when the loop ends.
    let keyboard = backend.sink(SinkRole::Keyboard).unwrap();
    assert_eq!(
        keyboard.key_events(),
        vec![RawEvent::key(KEY_A, 1), RawEvent::key(KEY_A, 0)]
    );

    mapper.stop();
    assert_eq!(mapper.state(), MapperState::Idle);
}

#[test]
fn test_stop_wait_is_bounded() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);
    device.push(Step::Stall(Duration::from_millis(400)));

    let options = MapperOptions {
        stop_timeout: Duration::from_millis(20),
        ..fast_options()
    };
    let mut mapper = InputMapper::with_options(MappingConfig::new(PATH, MappingTable::new()), options);
    mapper.start(&backend).unwrap();
    assert!(wait_until(Duration::from_secs(2), || device.is_drained()));

    let started = Instant::now();
    mapper.stop();
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(mapper.state(), MapperState::Idle);

    // The detached thread still cleans up once its read returns.
    assert!(wait_until(Duration::from_secs(2), || !device.is_grabbed()));
}

#[test]
fn test_drop_stops_mapper() {
    init_logging();
    let backend = FakeBackend::new();
    let device = naga(&backend);

    {
        let mut mapper = mapper(MappingConfig::new(PATH, MappingTable::new()));
        mapper.start(&backend).unwrap();
        assert!(device.is_grabbed());
    }
    assert!(!device.is_grabbed());
}
