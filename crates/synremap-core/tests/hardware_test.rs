// Synremap Hardware Tests
//
// Need real /dev/input access and a writable /dev/uinput, so they are
// ignored by default.
//
// Run with: cargo test --features evdev-backend --test hardware_test -- --ignored

#[cfg(feature = "evdev-backend")]
mod hardware {
    use synremap_core::{
        DeviceBackend, EvdevBackend, InputMapper, MappingConfig, MappingTable, OutputSink,
        PathResolver, RawEvent, SinkSpec,
    };

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    #[ignore = "requires a Razer device under /dev/input/by-id"]
    fn test_discover_and_probe_real_interfaces() {
        init_logging();
        let backend = EvdevBackend;
        let paths = PathResolver::default().discover();
        assert!(!paths.is_empty(), "no vendor interfaces present");
        for path in &paths {
            let caps = backend.probe(path).unwrap();
            println!("{}: {} keys", path, caps.keys.len());
        }
    }

    #[test]
    #[ignore = "requires write access to /dev/uinput"]
    fn test_virtual_pointer_accepts_wheel_report() {
        init_logging();
        let spec = SinkSpec::pointer("synremap hardware test", 0x03, "synremap");
        let mut sink = EvdevBackend.create_sink(&spec).unwrap();
        sink.write(RawEvent::relative(synremap_core::codes::REL_WHEEL, 1))
            .unwrap();
        sink.write(RawEvent::sync()).unwrap();
    }

    #[test]
    #[ignore = "requires read access to the first discovered interface and /dev/uinput"]
    fn test_mapper_starts_and_stops_on_real_device() {
        init_logging();
        let path = PathResolver::default()
            .discover()
            .into_iter()
            .next()
            .expect("no vendor interfaces present");
        let config = MappingConfig::new(path, MappingTable::new()).with_grab(false);
        let mut mapper = InputMapper::new(config);
        mapper.start(&EvdevBackend).unwrap();
        assert!(mapper.is_running());
        mapper.stop();
        assert!(!mapper.is_running());
    }
}
