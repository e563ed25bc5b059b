// Synremap Core Library
// Input remapping for composite vendor devices: actions, resolution and mapper lifecycle

pub mod action;
pub mod backend;
pub mod codes;
pub mod event;
pub mod input;
pub mod mapper;
pub mod mapping;
pub mod output;
pub mod session;
pub mod settings;
pub mod strategy;

pub use action::{Action, ActionError, ActionKind, ActionRecord};
pub use backend::DeviceBackend;
pub use event::{Emission, EventTranslator};
pub use input::{
    classify, display_name, filter_paths_for_codes, DeviceCapabilities, DeviceDescriptor,
    DeviceKind, InputSource, PathResolver, RawEvent,
};
pub use mapper::{InputMapper, MapperError, MapperOptions, MapperState};
pub use mapping::{decode_mapping_table, normalize_with_aliases, ConfigError, MappingConfig, MappingTable};
pub use output::{OutputSink, PressedKeyState, SinkRole, SinkSpec};
pub use session::{InterfaceFailure, RemapSession, SessionError};
pub use settings::{Settings, SettingsError};
pub use strategy::{
    candidate_keys, extract_target_codes, is_auxiliary_only, is_auxiliary_only_with, resolve,
    AuxiliaryPolicy,
};

#[cfg(feature = "evdev-backend")]
pub use backend::EvdevBackend;
#[cfg(feature = "evdev-backend")]
pub use event::EvdevSource;
#[cfg(feature = "evdev-backend")]
pub use output::{UInputError, UInputSink};
