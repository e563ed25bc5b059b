// Synremap CLI
// Runs a mapping configuration against a vendor device until interrupted

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use synremap_core::input::{classify, display_name};
use synremap_core::{EvdevBackend, InputMapper, MapperOptions, MappingConfig, RemapSession, Settings};

/// Remap vendor macro keys and buttons through virtual input devices
#[derive(Parser, Debug)]
#[command(name = "synremap")]
#[command(version)]
#[command(about = "Input remapper for composite vendor keyboards and mice", long_about = None)]
struct Args {
    /// Mapping configuration (.json or .toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Input interface to remap, overriding the configuration's device_path
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<String>,

    /// Settings file (default: ~/.config/synremap/settings.toml)
    #[arg(short, long, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Only remap the given interface, using the configuration's grab and
    /// passthrough flags, instead of expanding to sibling interfaces
    #[arg(long)]
    no_expand: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List the vendor's input interfaces
    #[arg(long)]
    list_devices: bool,
}

/// Whatever is currently remapping
enum Active {
    Session(RemapSession),
    Single(InputMapper),
}

impl Active {
    fn running_count(&self) -> usize {
        match self {
            Active::Session(session) => session.running_count(),
            Active::Single(mapper) => usize::from(mapper.is_running()),
        }
    }

    fn stop(&mut self) {
        match self {
            Active::Session(session) => session.stop(),
            Active::Single(mapper) => mapper.stop(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load_default().context("Failed to load default settings"),
    }
}

fn load_config(path: &Path) -> Result<MappingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config = if is_toml {
        MappingConfig::from_toml_str(&content)
    } else {
        MappingConfig::from_json_str(&content)
    };
    config.with_context(|| format!("Invalid mapping configuration in {}", path.display()))
}

fn list_devices(settings: &Settings) {
    let paths = settings.path_resolver().discover();
    if paths.is_empty() {
        println!("No {} input interfaces found", settings.vendor());
        return;
    }
    for path in paths {
        println!("{:<40} {:<9} {}", display_name(&path), classify(&path), path);
    }
}

fn install_signal_handler(running: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::info!("Received signal {}, shutting down", signal);
            running.store(false, Ordering::SeqCst);
        }
    });
    Ok(())
}

fn run(args: &Args, settings: &Settings, config: MappingConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    install_signal_handler(Arc::clone(&running))?;

    let backend = EvdevBackend;
    let mut active = if args.no_expand {
        let mut mapper = InputMapper::with_options(config, MapperOptions::from(settings));
        mapper
            .start(&backend)
            .with_context(|| format!("Failed to start remapper on {}", mapper.device_path()))?;
        Active::Single(mapper)
    } else {
        let session =
            RemapSession::apply(&backend, &config.device_path, &config.mappings, settings)?;
        for failure in session.failures() {
            eprintln!("Warning: {}", failure);
        }
        Active::Session(session)
    };

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
        if active.running_count() == 0 {
            log::warn!("Every remapped interface has stopped");
            break;
        }
    }

    active.stop();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = load_settings(args.settings.as_deref())?;

    // Handle list-devices flag (doesn't require config)
    if args.list_devices {
        list_devices(&settings);
        return Ok(());
    }

    let config_path = args
        .config
        .as_deref()
        .context("--config is required when not using --list-devices")?;
    let mut config = load_config(config_path)?;
    if let Some(device) = &args.device {
        config.device_path = device.clone();
    }

    if args.check_config {
        println!(
            "Configuration is valid: {} mapping(s) for {}",
            config.mappings.len(),
            if config.device_path.is_empty() {
                "<no device>"
            } else {
                config.device_path.as_str()
            }
        );
        return Ok(());
    }

    if config.device_path.is_empty() {
        bail!("No device path: set device_path in the configuration or pass --device");
    }

    run(&args, &settings, config)
}
