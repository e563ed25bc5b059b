// Synremap Settings Module
// Runtime tunables for discovery, the auxiliary heuristic and mapper threads

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codes;
use crate::input::paths::{DEFAULT_BY_ID_DIR, DEFAULT_BY_PATH_DIR, DEFAULT_VENDOR};
use crate::input::PathResolver;
use crate::strategy::AuxiliaryPolicy;

pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_SINK_SUFFIX: &str = "synremap";

/// Runtime settings for synremap
///
/// Loaded from a TOML file (default: ~/.config/synremap/settings.toml).
/// Every key is optional; absent keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    vendor: String,
    by_id_dir: PathBuf,
    by_path_dir: PathBuf,

    auxiliary_policy: AuxiliaryPolicy,

    /// How long one source read waits before re-checking the stop flag
    poll_timeout: Duration,
    /// How long `stop()` waits for a read loop to exit
    stop_timeout: Duration,
    /// Tag appended to virtual device names
    sink_suffix: String,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    discovery: Option<DiscoverySettings>,

    #[serde(default)]
    strategy: Option<StrategySettings>,

    #[serde(default)]
    mapper: Option<MapperSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DiscoverySettings {
    vendor: Option<String>,
    by_id_dir: Option<PathBuf>,
    by_path_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StrategySettings {
    macro_threshold: Option<toml::Value>,
    auxiliary_buttons: Option<Vec<toml::Value>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MapperSettings {
    poll_timeout_ms: Option<u64>,
    stop_timeout_ms: Option<u64>,
    sink_suffix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
            by_id_dir: PathBuf::from(DEFAULT_BY_ID_DIR),
            by_path_dir: PathBuf::from(DEFAULT_BY_PATH_DIR),
            auxiliary_policy: AuxiliaryPolicy::default(),
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
            sink_suffix: DEFAULT_SINK_SUFFIX.to_string(),
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(discovery) = toml_settings.discovery {
            if let Some(vendor) = discovery.vendor {
                if vendor.trim().is_empty() {
                    return Err(SettingsError::InvalidValue(
                        "discovery.vendor must not be empty".to_string(),
                    ));
                }
                settings.vendor = vendor;
            }
            if let Some(dir) = discovery.by_id_dir {
                settings.by_id_dir = dir;
            }
            if let Some(dir) = discovery.by_path_dir {
                settings.by_path_dir = dir;
            }
        }

        if let Some(strategy) = toml_settings.strategy {
            if let Some(threshold) = strategy.macro_threshold {
                settings.auxiliary_policy.macro_threshold = parse_code_value(&threshold)?;
            }
            if let Some(buttons) = strategy.auxiliary_buttons {
                settings.auxiliary_policy.auxiliary_buttons = buttons
                    .iter()
                    .map(parse_code_value)
                    .collect::<Result<BTreeSet<u16>, _>>()?;
            }
        }

        if let Some(mapper) = toml_settings.mapper {
            if let Some(ms) = mapper.poll_timeout_ms {
                if ms == 0 {
                    return Err(SettingsError::InvalidValue(
                        "mapper.poll_timeout_ms must be greater than 0".to_string(),
                    ));
                }
                settings.poll_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = mapper.stop_timeout_ms {
                settings.stop_timeout = Duration::from_millis(ms);
            }
            if let Some(suffix) = mapper.sink_suffix {
                settings.sink_suffix = suffix;
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("synremap").join("settings.toml"))
    }

    /// Load from default location (~/.config/synremap/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            *self = Self::from_file(path)?;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Path resolver configured with this vendor and these directories
    pub fn path_resolver(&self) -> PathResolver {
        PathResolver::new(&self.vendor, &self.by_id_dir, &self.by_path_dir)
    }

    pub fn auxiliary_policy(&self) -> &AuxiliaryPolicy {
        &self.auxiliary_policy
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    pub fn sink_suffix(&self) -> &str {
        &self.sink_suffix
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

/// Parse a key/button code given as a TOML integer or a `KEY_*`/`BTN_*` name
fn parse_code_value(value: &toml::Value) -> Result<u16, SettingsError> {
    match value {
        toml::Value::Integer(n) => u16::try_from(*n)
            .ok()
            .filter(|code| *code <= codes::KEY_MAX)
            .ok_or_else(|| SettingsError::InvalidValue(format!("Code {} out of range", n))),
        toml::Value::String(s) => codes::parse_code(s)
            .ok_or_else(|| SettingsError::InvalidValue(format!("Unknown key or button '{}'", s))),
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to a key code",
            value
        ))),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Synremap Settings
# Place this file at: ~/.config/synremap/settings.toml

[discovery]
# Vendor name matched in /dev/input/by-id and /dev/input/by-path entries
vendor = "Razer"
by_id_dir = "/dev/input/by-id"
by_path_dir = "/dev/input/by-path"

[strategy]
# Codes at or above this value count as macro keys
macro_threshold = "KEY_F13"
# Pointer buttons that also count as auxiliary controls
auxiliary_buttons = ["BTN_SIDE", "BTN_EXTRA", "BTN_FORWARD", "BTN_BACK"]

[mapper]
poll_timeout_ms = 100
stop_timeout_ms = 500
sink_suffix = "synremap"
"#
}
